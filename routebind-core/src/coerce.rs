//! Coercion table for declared parameter kinds
//!
//! Every value read from a request source goes through [`coerce`] before it
//! reaches a handler. The table is closed: one rule per [`ParamKind`], no
//! user-defined validators.
//!
//! | Kind | Accepts | Produces |
//! |---|---|---|
//! | `String` | JSON strings only | the string |
//! | `Number` | finite numbers, numeric strings | `f64` |
//! | `Boolean` | anything | true iff the value loosely equals `1` |
//! | `ObjectId` | 24 hex character strings | [`ObjectId`] |
//! | `Date` | RFC 3339, `YYYY-MM-DD`, epoch milliseconds | `DateTime<Utc>` |
//! | `JsonArray` | arrays, or strings holding a JSON array | `Vec<Value>` |
//! | `Any` | anything | the raw value |
//!
//! # Examples
//!
//! ```rust
//! use routebind_core::{coerce, ParamKind, ParamValue};
//! use serde_json::json;
//!
//! let value = coerce("param2", ParamKind::Number, &json!("5")).unwrap();
//! assert_eq!(value, ParamValue::Number(5.0));
//!
//! let err = coerce("param2", ParamKind::Number, &json!("x")).unwrap_err();
//! assert_eq!(err.to_string(), "Parameter param2 should be a number");
//! ```

use crate::error::{Error, Result};
use crate::types::ParamKind;
use bson::oid::ObjectId;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

/// A coerced parameter value, typed by the kind it was validated against
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Uncoerced value (`Any` kind, or a value taken from the request context)
    Raw(Value),
    String(String),
    Number(f64),
    Boolean(bool),
    ObjectId(ObjectId),
    Date(DateTime<Utc>),
    Array(Vec<Value>),
}

impl ParamValue {
    /// Convert back to JSON
    ///
    /// Object ids become their hex string and dates their RFC 3339 form.
    /// Non-finite numbers cannot occur because coercion rejects them.
    pub fn into_json(self) -> Value {
        match self {
            Self::Raw(value) => value,
            Self::String(s) => Value::String(s),
            Self::Number(n) => serde_json::Number::from_f64(n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::Boolean(b) => Value::Bool(b),
            Self::ObjectId(oid) => Value::String(oid.to_hex()),
            Self::Date(date) => Value::String(date.to_rfc3339()),
            Self::Array(items) => Value::Array(items),
        }
    }
}

/// Validate and coerce `raw` according to `kind`
///
/// `name` is only used to build the validation error.
pub fn coerce(name: &str, kind: ParamKind, raw: &Value) -> Result<ParamValue> {
    let invalid = || Error::validation(name, kind);
    match kind {
        ParamKind::Any => Ok(ParamValue::Raw(raw.clone())),
        ParamKind::String => match raw {
            Value::String(s) => Ok(ParamValue::String(s.clone())),
            _ => Err(invalid()),
        },
        ParamKind::Number => to_number(raw).map(ParamValue::Number).ok_or_else(invalid),
        ParamKind::Boolean => Ok(ParamValue::Boolean(loosely_one(raw))),
        ParamKind::ObjectId => match raw {
            Value::String(s) => ObjectId::parse_str(s)
                .map(ParamValue::ObjectId)
                .map_err(|_| invalid()),
            _ => Err(invalid()),
        },
        ParamKind::Date => to_date(raw).map(ParamValue::Date).ok_or_else(invalid),
        ParamKind::JsonArray => {
            let parsed = match raw {
                // Unparseable strings become "" and fail the array check below
                Value::String(s) => {
                    serde_json::from_str(s).unwrap_or_else(|_| Value::String(String::new()))
                }
                other => other.clone(),
            };
            match parsed {
                Value::Array(items) => Ok(ParamValue::Array(items)),
                _ => Err(invalid()),
            }
        }
    }
}

fn to_number(raw: &Value) -> Option<f64> {
    let n = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok()?
        }
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn loosely_one(raw: &Value) -> bool {
    match raw {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() == Some(1.0),
        Value::String(s) => s.trim().parse::<f64>().map(|n| n == 1.0).unwrap_or(false),
        _ => false,
    }
}

fn to_date(raw: &Value) -> Option<DateTime<Utc>> {
    match raw {
        Value::Number(n) => from_millis(n.as_f64()?),
        Value::String(s) => parse_date_str(s.trim()),
        _ => None,
    }
}

fn from_millis(millis: f64) -> Option<DateTime<Utc>> {
    if !millis.is_finite() || millis.fract() != 0.0 {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64)
}

fn parse_date_str(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    if let Ok(date) = DateTime::parse_from_rfc3339(s) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(day) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return day.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    s.parse::<f64>().ok().and_then(from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn ok(kind: ParamKind, raw: Value) -> ParamValue {
        coerce("p", kind, &raw).unwrap()
    }

    fn fails(kind: ParamKind, raw: Value) {
        let err = coerce("p", kind, &raw).unwrap_err();
        assert!(matches!(err, Error::Validation { ref param, expected } if param == "p" && expected == kind));
    }

    #[test]
    fn test_string_requires_string() {
        assert_eq!(ok(ParamKind::String, json!("a")), ParamValue::String("a".into()));
        fails(ParamKind::String, json!(5));
        fails(ParamKind::String, json!(null));
    }

    #[test]
    fn test_number_coercion() {
        assert_eq!(ok(ParamKind::Number, json!("42")), ParamValue::Number(42.0));
        assert_eq!(ok(ParamKind::Number, json!(" -1.5 ")), ParamValue::Number(-1.5));
        assert_eq!(ok(ParamKind::Number, json!(7)), ParamValue::Number(7.0));
        fails(ParamKind::Number, json!("x"));
        fails(ParamKind::Number, json!(""));
        fails(ParamKind::Number, json!("NaN"));
        fails(ParamKind::Number, json!("inf"));
        fails(ParamKind::Number, json!(true));
    }

    #[test]
    fn test_boolean_never_fails() {
        assert_eq!(ok(ParamKind::Boolean, json!("1")), ParamValue::Boolean(true));
        assert_eq!(ok(ParamKind::Boolean, json!(1)), ParamValue::Boolean(true));
        assert_eq!(ok(ParamKind::Boolean, json!(true)), ParamValue::Boolean(true));
        assert_eq!(ok(ParamKind::Boolean, json!("0")), ParamValue::Boolean(false));
        assert_eq!(ok(ParamKind::Boolean, json!("true")), ParamValue::Boolean(false));
        assert_eq!(ok(ParamKind::Boolean, json!({"a": 1})), ParamValue::Boolean(false));
    }

    #[test]
    fn test_object_id() {
        let hex = "507f1f77bcf86cd799439011";
        let expected = ObjectId::parse_str(hex).unwrap();
        assert_eq!(ok(ParamKind::ObjectId, json!(hex)), ParamValue::ObjectId(expected));
        fails(ParamKind::ObjectId, json!("507f1f77bcf86cd79943901"));
        fails(ParamKind::ObjectId, json!("zzzzzzzzzzzzzzzzzzzzzzzz"));
        fails(ParamKind::ObjectId, json!(507));
    }

    #[test]
    fn test_dates() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 19, 12, 0, 0).unwrap();
        assert_eq!(ok(ParamKind::Date, json!("2024-01-19T12:00:00Z")), ParamValue::Date(expected));
        assert_eq!(
            ok(ParamKind::Date, json!("2024-01-19T14:00:00+02:00")),
            ParamValue::Date(expected)
        );
        assert_eq!(
            ok(ParamKind::Date, json!(expected.timestamp_millis())),
            ParamValue::Date(expected)
        );
        let midnight = Utc.with_ymd_and_hms(2024, 1, 19, 0, 0, 0).unwrap();
        assert_eq!(ok(ParamKind::Date, json!("2024-01-19")), ParamValue::Date(midnight));
        fails(ParamKind::Date, json!("not a date"));
        fails(ParamKind::Date, json!("2024-13-45"));
        fails(ParamKind::Date, json!(""));
        fails(ParamKind::Date, json!(false));
    }

    #[test]
    fn test_json_array() {
        assert_eq!(
            ok(ParamKind::JsonArray, json!("[1,2]")),
            ParamValue::Array(vec![json!(1), json!(2)])
        );
        assert_eq!(
            ok(ParamKind::JsonArray, json!(["a"])),
            ParamValue::Array(vec![json!("a")])
        );
        fails(ParamKind::JsonArray, json!("[1,"));
        fails(ParamKind::JsonArray, json!("{\"a\":1}"));
        fails(ParamKind::JsonArray, json!(3));
    }

    #[test]
    fn test_any_passes_through() {
        let raw = json!({"nested": [1, "two"]});
        assert_eq!(ok(ParamKind::Any, raw.clone()), ParamValue::Raw(raw));
    }

    #[test]
    fn test_into_json() {
        let oid = ObjectId::parse_str("507f1f77bcf86cd799439011").unwrap();
        assert_eq!(ParamValue::ObjectId(oid).into_json(), json!("507f1f77bcf86cd799439011"));
        assert_eq!(ParamValue::Number(5.0).into_json(), json!(5.0));
        assert_eq!(ParamValue::Boolean(true).into_json(), json!(true));
        let date = Utc.with_ymd_and_hms(2024, 1, 19, 12, 0, 0).unwrap();
        assert_eq!(ParamValue::Date(date).into_json(), json!("2024-01-19T12:00:00+00:00"));
    }
}

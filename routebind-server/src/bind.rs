//! Resolved arguments and their conversion into typed handler parameters
//!
//! The resolver produces one [`Bound`] per declared parameter. Handlers written
//! with [`from_fn`](crate::from_fn) read them through [`BoundArgs`]; handlers
//! generated by `#[route]` call [`BoundArgs::take`], which converts each slot
//! with the parameter type's [`BindParam`] implementation.
//!
//! `BindParam::KIND` is also how `#[route]` learns the coercion kind of each
//! parameter at compile time: `id: ObjectId` declares [`ParamKind::ObjectId`],
//! `page: f64` declares [`ParamKind::Number`], and so on.

use crate::request::Request;
use crate::response::ResponseHandle;
use chrono::{DateTime, Utc};
use routebind_core::{coerce, Error, ObjectId, ParamKind, ParamValue, Result};
use serde_json::{Map, Value};

/// Value bound to one parameter for one request
#[derive(Debug, Clone)]
pub enum Bound {
    /// The reserved `req` parameter
    Request(Request),
    /// The reserved `res` parameter
    Response(ResponseHandle),
    /// A value from the context or a request source
    Value(ParamValue),
    /// Already moved out by [`BoundArgs::take`]
    Taken,
}

/// Resolved arguments of one call, in declaration order
#[derive(Debug, Clone, Default)]
pub struct BoundArgs {
    slots: Vec<(String, Bound)>,
}

impl BoundArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, bound: Bound) {
        self.slots.push((name.into(), bound));
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Borrow the slot bound to `name`
    pub fn get(&self, name: &str) -> Option<&Bound> {
        self.slots
            .iter()
            .find(|(slot_name, _)| slot_name == name)
            .map(|(_, bound)| bound)
    }

    /// JSON form of the value bound to `name`
    ///
    /// `None` for unknown names, for `req`/`res`, and for taken slots.
    pub fn value(&self, name: &str) -> Option<Value> {
        match self.get(name)? {
            Bound::Value(value) => Some(value.clone().into_json()),
            _ => None,
        }
    }

    /// Move the slot at `index` out and convert it to `T`
    pub fn take<T: BindParam>(&mut self, index: usize) -> Result<T> {
        let (name, slot) = self
            .slots
            .get_mut(index)
            .ok_or_else(|| Error::handler(format!("no argument bound at position {index}")))?;
        let bound = std::mem::replace(slot, Bound::Taken);
        T::from_bound(name, bound)
    }

    /// All value slots as a JSON object, skipping `req`/`res`
    pub fn to_json_map(&self) -> Map<String, Value> {
        self.slots
            .iter()
            .filter_map(|(name, bound)| match bound {
                Bound::Value(value) => Some((name.clone(), value.clone().into_json())),
                _ => None,
            })
            .collect()
    }
}

/// A Rust type that can receive a bound parameter
pub trait BindParam: Sized {
    /// Coercion applied by the resolver to parameters of this type
    const KIND: ParamKind;

    fn from_bound(name: &str, bound: Bound) -> Result<Self>;
}

/// Typed value for `name`
///
/// Context values are bound raw; they are converted here with the same table
/// the resolver uses for request sources.
fn typed_value(name: &str, kind: ParamKind, bound: Bound) -> Result<ParamValue> {
    match bound {
        Bound::Value(ParamValue::Raw(raw)) => coerce(name, kind, &raw),
        Bound::Value(value) => Ok(value),
        Bound::Request(_) | Bound::Response(_) | Bound::Taken => {
            Err(Error::validation(name, kind))
        }
    }
}

impl BindParam for String {
    const KIND: ParamKind = ParamKind::String;

    fn from_bound(name: &str, bound: Bound) -> Result<Self> {
        match typed_value(name, Self::KIND, bound)? {
            ParamValue::String(s) => Ok(s),
            _ => Err(Error::validation(name, Self::KIND)),
        }
    }
}

impl BindParam for f64 {
    const KIND: ParamKind = ParamKind::Number;

    fn from_bound(name: &str, bound: Bound) -> Result<Self> {
        match typed_value(name, Self::KIND, bound)? {
            ParamValue::Number(n) => Ok(n),
            _ => Err(Error::validation(name, Self::KIND)),
        }
    }
}

macro_rules! bind_integer {
    ($($ty:ty),*) => {
        $(
            impl BindParam for $ty {
                const KIND: ParamKind = ParamKind::Number;

                fn from_bound(name: &str, bound: Bound) -> Result<Self> {
                    let n = f64::from_bound(name, bound)?;
                    // Exclusive bound: `MAX as f64` rounds up to 2^63 / 2^64 for 64-bit types
                    let upper = <$ty>::MAX as f64 + 1.0;
                    if n.fract() != 0.0 || n < <$ty>::MIN as f64 || n >= upper {
                        return Err(Error::validation(name, Self::KIND));
                    }
                    Ok(n as $ty)
                }
            }
        )*
    };
}

bind_integer!(i32, i64, u32, u64);

impl BindParam for bool {
    const KIND: ParamKind = ParamKind::Boolean;

    fn from_bound(name: &str, bound: Bound) -> Result<Self> {
        match typed_value(name, Self::KIND, bound)? {
            ParamValue::Boolean(b) => Ok(b),
            _ => Err(Error::validation(name, Self::KIND)),
        }
    }
}

impl BindParam for ObjectId {
    const KIND: ParamKind = ParamKind::ObjectId;

    fn from_bound(name: &str, bound: Bound) -> Result<Self> {
        match typed_value(name, Self::KIND, bound)? {
            ParamValue::ObjectId(oid) => Ok(oid),
            _ => Err(Error::validation(name, Self::KIND)),
        }
    }
}

impl BindParam for DateTime<Utc> {
    const KIND: ParamKind = ParamKind::Date;

    fn from_bound(name: &str, bound: Bound) -> Result<Self> {
        match typed_value(name, Self::KIND, bound)? {
            ParamValue::Date(date) => Ok(date),
            _ => Err(Error::validation(name, Self::KIND)),
        }
    }
}

impl BindParam for Vec<Value> {
    const KIND: ParamKind = ParamKind::JsonArray;

    fn from_bound(name: &str, bound: Bound) -> Result<Self> {
        match typed_value(name, Self::KIND, bound)? {
            ParamValue::Array(items) => Ok(items),
            _ => Err(Error::validation(name, Self::KIND)),
        }
    }
}

impl BindParam for Value {
    const KIND: ParamKind = ParamKind::Any;

    fn from_bound(name: &str, bound: Bound) -> Result<Self> {
        match bound {
            Bound::Value(value) => Ok(value.into_json()),
            _ => Err(Error::validation(name, Self::KIND)),
        }
    }
}

impl BindParam for Request {
    const KIND: ParamKind = ParamKind::Any;

    fn from_bound(name: &str, bound: Bound) -> Result<Self> {
        match bound {
            Bound::Request(request) => Ok(request),
            _ => Err(Error::handler(format!(
                "parameter {name} is not bound to the request"
            ))),
        }
    }
}

impl BindParam for ResponseHandle {
    const KIND: ParamKind = ParamKind::Any;

    fn from_bound(name: &str, bound: Bound) -> Result<Self> {
        match bound {
            Bound::Response(response) => Ok(response),
            _ => Err(Error::handler(format!(
                "parameter {name} is not bound to the response"
            ))),
        }
    }
}

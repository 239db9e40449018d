//! Error types for routebind
//!
//! This module defines the error taxonomy shared by every routebind crate and
//! the wire shape used to report errors to HTTP clients.
//!
//! # Error Categories
//!
//! - **Registration**: a route table could not be built. Fatal, it aborts
//!   startup instead of leaving a half-registered route behind.
//! - **Binding**: a parameter was missing from its source or failed its
//!   coercion. Per request, answered with HTTP 400.
//! - **Handler**: the handler body failed. Per request, answered with the
//!   status carried by the error or HTTP 500.
//! - **Response**: the response channel refused a write. Never propagated
//!   past the dispatcher.
//!
//! # Wire Format
//!
//! Every error reaches the client as `{"error": "<message>"}`, see [`ErrorBody`].
//!
//! # Examples
//!
//! ```rust
//! use routebind_core::{Error, ParamKind};
//!
//! let err = Error::validation("param2", ParamKind::Number);
//! assert_eq!(err.to_string(), "Parameter param2 should be a number");
//! assert_eq!(err.http_status(), 400);
//!
//! let err = Error::status(404, "not found");
//! assert_eq!(err.http_status(), 404);
//! assert_eq!(err.to_string(), "not found");
//! ```

use crate::types::ParamKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for routebind operations
pub type Result<T> = std::result::Result<T, Error>;

/// Application-level error type for routebind operations
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// A route could not be registered
    ///
    /// Raised while building a route table. Callers are expected to abort
    /// startup on this error.
    #[error("Registration error: {0}")]
    Registration(String),

    /// A declared parameter was found in none of its sources
    #[error("Missing parameter {param} in {handler}")]
    MissingParameter {
        /// Declared parameter name
        param: String,
        /// Qualified handler name
        handler: String,
    },

    /// A parameter value failed the coercion for its declared kind
    #[error("Parameter {param} should be {}", .expected.expectation())]
    Validation {
        /// Declared parameter name
        param: String,
        /// Kind the value was expected to satisfy
        expected: ParamKind,
    },

    /// Failure raised by a handler body
    ///
    /// The optional status is used as the HTTP status of the error response,
    /// 500 otherwise.
    #[error("{message}")]
    Handler {
        status: Option<u16>,
        message: String,
    },

    /// The response channel refused a write (typically: headers already sent)
    #[error("Response error: {0}")]
    Response(String),

    /// A handler result could not be converted to JSON
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Handler failure without an explicit status (reported as 500)
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler {
            status: None,
            message: message.into(),
        }
    }

    /// Handler failure carrying an explicit HTTP status
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Handler {
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn missing(param: impl Into<String>, handler: impl Into<String>) -> Self {
        Self::MissingParameter {
            param: param.into(),
            handler: handler.into(),
        }
    }

    pub fn validation(param: impl Into<String>, expected: ParamKind) -> Self {
        Self::Validation {
            param: param.into(),
            expected,
        }
    }

    /// HTTP status used when this error is reported to the client
    pub fn http_status(&self) -> u16 {
        match self {
            Self::MissingParameter { .. } | Self::Validation { .. } => 400,
            Self::Handler { status, .. } => status.unwrap_or(500),
            Self::Registration(_) | Self::Response(_) | Self::Serialization(_) => 500,
        }
    }

    /// `missing` or `validation` for per-request binding failures, `None` otherwise
    pub fn binding_kind(&self) -> Option<&'static str> {
        match self {
            Self::MissingParameter { .. } => Some("missing"),
            Self::Validation { .. } => Some("validation"),
            _ => None,
        }
    }

    /// Wire body for this error
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody::new(self.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// JSON body of every error response: `{"error": "<message>"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }

    /// Body as a JSON value
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({ "error": self.error })
    }
}

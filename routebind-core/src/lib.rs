//! Core descriptor types, coercion table and errors for routebind
//!
//! This crate holds the transport-agnostic half of routebind:
//!
//! - **Types**: handler descriptors (verb, parameter source, middleware output)
//!   and the explicitly declared parameter list of a handler
//! - **Coercion**: the closed table that validates and converts raw request
//!   values into typed parameter values
//! - **Error handling**: the error taxonomy and the `{"error": ...}` wire body
//! - **Observability**: `tracing` subscriber and OpenTelemetry bootstrap
//!
//! The `routebind-server` crate builds the request pipeline on top of these.
//!
//! # Example
//!
//! ```rust
//! use routebind_core::{coerce, HandlerDescriptor, ParamKind, ParamSpec, ParamValue, Verb};
//! use serde_json::json;
//!
//! let descriptor = HandlerDescriptor::new("math", "add", Verb::Get);
//! let params = vec![ParamSpec::new("a", ParamKind::Number)];
//!
//! let value = coerce(&params[0].name, params[0].kind, &json!("42")).unwrap();
//! assert_eq!(value, ParamValue::Number(42.0));
//! assert_eq!(descriptor.path(), "/add");
//! ```

pub mod coerce;
pub mod error;
pub mod observability;
pub mod types;

pub use coerce::{coerce, ParamValue};
pub use error::{Error, ErrorBody, Result};
pub use observability::{init_telemetry, shutdown_telemetry, TelemetryConfig};
pub use types::{
    HandlerDescriptor, MiddlewareOutput, ParamKind, ParamSource, ParamSpec, Verb, REQUEST_PARAM,
    RESPONSE_PARAM,
};

pub use bson::oid::ObjectId;

//! Route descriptor types
//!
//! These are the immutable records that describe a handler before any request
//! arrives. They are created once, when handlers are registered, and are never
//! re-derived per request.
//!
//! # Descriptor Pieces
//!
//! - [`Verb`]: which HTTP verb a handler answers (`GET`, `POST`) or whether it
//!   runs as middleware (`USE`) mounted at `/`
//! - [`ParamSource`]: where non-reserved parameters are looked up
//! - [`MiddlewareOutput`]: how a middleware-style handler publishes its result
//!   into the per-request context
//! - [`ParamKind`] / [`ParamSpec`]: the explicitly declared formal parameters
//!   and the coercion applied to each of them
//!
//! # Examples
//!
//! ```rust
//! use routebind_core::{HandlerDescriptor, ParamSource, Verb};
//!
//! let descriptor = HandlerDescriptor::new("users", "find", Verb::Get);
//! assert_eq!(descriptor.path(), "/find");
//! assert_eq!(descriptor.source, ParamSource::Query);
//! assert_eq!(descriptor.qualified_name(), "users.find");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved parameter name that binds the raw request
pub const REQUEST_PARAM: &str = "req";

/// Reserved parameter name that binds the raw response
///
/// Binding it hands control of the response to the handler: the dispatcher
/// writes neither the success body nor the error body for that call.
pub const RESPONSE_PARAM: &str = "res";

/// HTTP verb of a registered handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    /// `GET /{name}`
    Get,
    /// `POST /{name}`
    Post,
    /// Middleware mounted at `/`, runs for every request passing through
    Use,
}

impl Verb {
    /// Upper-case wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Use => "USE",
        }
    }

    /// Source used when a descriptor does not name one explicitly
    pub fn default_source(&self) -> ParamSource {
        match self {
            Self::Get => ParamSource::Query,
            Self::Post => ParamSource::Body,
            Self::Use => ParamSource::Headers,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a handler's non-reserved parameters are read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamSource {
    /// Query-string parameters
    Query,
    /// Fields of the request body
    Body,
    /// Request headers, matched case-insensitively
    Headers,
}

impl ParamSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Body => "body",
            Self::Headers => "headers",
        }
    }
}

impl fmt::Display for ParamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a middleware-style handler publishes its result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MiddlewareOutput {
    /// Store the whole result under one context key
    Key(String),
    /// Copy each field of an object result into the context
    Merge,
}

/// Closed set of coercions applied to a declared parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// Must already be a string
    String,
    /// Finite number, numeric strings are parsed
    Number,
    /// Never fails, true iff the value loosely equals `1`
    Boolean,
    /// 24 hex character object id
    ObjectId,
    /// Timestamp that must not be invalid
    Date,
    /// Array of JSON values, JSON-parsed first when given as a string
    JsonArray,
    /// No coercion, the raw value passes through
    Any,
}

impl ParamKind {
    /// Phrase used in validation messages, e.g. "Parameter x should be a number"
    pub fn expectation(&self) -> &'static str {
        match self {
            Self::String => "a string",
            Self::Number => "a number",
            Self::Boolean => "a boolean",
            Self::ObjectId => "a valid ObjectId",
            Self::Date => "a valid date",
            Self::JsonArray => "an array",
            Self::Any => "a value",
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::ObjectId => "object_id",
            Self::Date => "date",
            Self::JsonArray => "json_array",
            Self::Any => "any",
        };
        f.write_str(name)
    }
}

/// One declared formal parameter, in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Identity and binding mode of one handler
///
/// Built once at registration and consumed into the route table; nothing
/// mutates it afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerDescriptor {
    /// Owning group of handlers, used for naming only
    pub scope: String,
    /// Handler (method) name, also the last path segment for GET/POST
    pub name: String,
    pub verb: Verb,
    pub source: ParamSource,
    /// `Some` when the handler runs as a middleware step
    pub output: Option<MiddlewareOutput>,
}

impl HandlerDescriptor {
    /// Create a descriptor with the verb's default source and output
    ///
    /// `USE` handlers merge their result into the context by default;
    /// `GET`/`POST` handlers answer the client.
    pub fn new(scope: impl Into<String>, name: impl Into<String>, verb: Verb) -> Self {
        Self {
            scope: scope.into(),
            name: name.into(),
            verb,
            source: verb.default_source(),
            output: match verb {
                Verb::Use => Some(MiddlewareOutput::Merge),
                Verb::Get | Verb::Post => None,
            },
        }
    }

    pub fn with_source(mut self, source: ParamSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_output(mut self, output: MiddlewareOutput) -> Self {
        self.output = Some(output);
        self
    }

    /// Mount path: `/{name}` for GET/POST, `/` for middleware
    pub fn path(&self) -> String {
        match self.verb {
            Verb::Use => "/".to_string(),
            Verb::Get | Verb::Post => format!("/{}", self.name),
        }
    }

    /// Name used in error messages and logs
    pub fn qualified_name(&self) -> String {
        if self.scope.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.scope, self.name)
        }
    }

    pub fn is_middleware(&self) -> bool {
        self.output.is_some()
    }
}

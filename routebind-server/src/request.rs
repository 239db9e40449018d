//! Request abstraction consumed by the binding layer
//!
//! routebind does not parse HTTP. An embedding transport builds a [`Request`]
//! from whatever it received and hands it to a route table. The binding layer
//! only needs typed access to four things:
//!
//! - query-string parameters
//! - body fields
//! - headers, looked up case-insensitively
//! - the shared per-request [`Context`] written by middleware handlers
//!
//! `Request` is cheap to clone: the parsed parts sit behind an `Arc`, and all
//! clones share one `Context`, which is what lets a middleware handler's output
//! reach later handlers in the same pipeline.
//!
//! # Examples
//!
//! ```rust
//! use routebind_server::Request;
//! use serde_json::json;
//!
//! let request = Request::builder("GET", "/find")
//!     .query("userId", "42")
//!     .header("X-Token", "secret")
//!     .build();
//!
//! assert_eq!(request.query_field("userId"), Some(&json!("42")));
//! assert_eq!(request.header_field("x-token"), Some(&json!("secret")));
//! assert!(request.context().is_empty());
//! ```

use parking_lot::Mutex;
use routebind_core::ParamSource;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Mutable key/value store scoped to one request
///
/// Every clone points at the same map. It lives as long as the request's
/// processing chain holds a clone of the request.
#[derive(Debug, Clone, Default)]
pub struct Context {
    inner: Arc<Mutex<Map<String, Value>>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.lock().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().contains_key(key)
    }

    pub fn insert(&self, key: impl Into<String>, value: Value) {
        self.inner.lock().insert(key.into(), value);
    }

    /// Copy every field of `fields` into the context, overwriting existing keys
    pub fn merge(&self, fields: Map<String, Value>) {
        let mut inner = self.inner.lock();
        for (key, value) in fields {
            inner.insert(key, value);
        }
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> Map<String, Value> {
        self.inner.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

#[derive(Debug)]
struct RequestParts {
    method: String,
    path: String,
    query: Map<String, Value>,
    body: Map<String, Value>,
    /// Keys are stored lower-cased
    headers: Map<String, Value>,
}

/// One incoming request, as seen by handlers and the resolver
#[derive(Debug, Clone)]
pub struct Request {
    parts: Arc<RequestParts>,
    context: Context,
}

impl Request {
    /// Start building a request for `method` (case-insensitive) and `path`
    pub fn builder(method: impl Into<String>, path: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(method, path)
    }

    /// Upper-cased HTTP method
    pub fn method(&self) -> &str {
        &self.parts.method
    }

    pub fn path(&self) -> &str {
        &self.parts.path
    }

    pub fn query_field(&self, name: &str) -> Option<&Value> {
        self.parts.query.get(name)
    }

    pub fn body_field(&self, name: &str) -> Option<&Value> {
        self.parts.body.get(name)
    }

    /// Header lookup, case-insensitive
    pub fn header_field(&self, name: &str) -> Option<&Value> {
        match self.parts.headers.get(name) {
            Some(value) => Some(value),
            None => self.parts.headers.get(&name.to_ascii_lowercase()),
        }
    }

    /// Look `name` up in the given source
    pub fn field(&self, source: ParamSource, name: &str) -> Option<&Value> {
        match source {
            ParamSource::Query => self.query_field(name),
            ParamSource::Body => self.body_field(name),
            ParamSource::Headers => self.header_field(name),
        }
    }

    /// Body fields as a JSON object
    pub fn body(&self) -> &Map<String, Value> {
        &self.parts.body
    }

    /// Shared per-request context
    pub fn context(&self) -> &Context {
        &self.context
    }
}

/// Builder for [`Request`]
#[derive(Debug)]
pub struct RequestBuilder {
    method: String,
    path: String,
    query: Map<String, Value>,
    body: Map<String, Value>,
    headers: Map<String, Value>,
    context: Context,
}

impl RequestBuilder {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into().to_ascii_uppercase(),
            path: path.into(),
            query: Map::new(),
            body: Map::new(),
            headers: Map::new(),
            context: Context::new(),
        }
    }

    /// Add a query-string parameter (query values are strings on the wire)
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), Value::String(value.into()));
        self
    }

    /// Add one body field
    pub fn body_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.body.insert(name.into(), value);
        self
    }

    /// Replace the body with the fields of a JSON object
    ///
    /// Non-object bodies carry no fields and are ignored.
    pub fn body(mut self, body: Value) -> Self {
        if let Value::Object(fields) = body {
            self.body = fields;
        }
        self
    }

    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(
            name.as_ref().to_ascii_lowercase(),
            Value::String(value.into()),
        );
        self
    }

    /// Seed the per-request context, e.g. with values produced by an outer layer
    pub fn context(self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key, value);
        self
    }

    pub fn build(self) -> Request {
        Request {
            parts: Arc::new(RequestParts {
                method: self.method,
                path: self.path,
                query: self.query,
                body: self.body,
                headers: self.headers,
            }),
            context: self.context,
        }
    }
}

//! Route registration
//!
//! A [`Registrar`] collects the handlers of one scope (a group of related
//! handlers, typically one service type) and turns them into a
//! [`RouteTable`]. Every route is validated when the table is built, so a
//! misdeclared handler stops startup instead of failing per request.
//!
//! # Examples
//!
//! ```rust
//! use routebind_server::{from_fn, ParamKind, ParamSource, Registrar, Route};
//!
//! let table = Registrar::new("users")
//!     .route(
//!         Route::middleware("authenticate")
//!             .param("authorization", ParamKind::String)
//!             .handler(from_fn(|_args| async { Ok(serde_json::json!({"user": "u1"})) })),
//!     )
//!     .route(
//!         Route::get("profile")
//!             .param("user", ParamKind::String)
//!             .handler(from_fn(|args| async move { Ok(args.value("user").unwrap_or_default()) })),
//!     )
//!     .route(
//!         Route::post("rename")
//!             .source(ParamSource::Body)
//!             .param("name", ParamKind::String)
//!             .handler(from_fn(|_args| async { Ok(serde_json::Value::Null) })),
//!     )
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(table.len(), 3);
//! ```

use crate::descriptor;
use crate::handler::Handler;
use crate::metrics::DispatchMetrics;
use crate::router::{BoundRoute, RouteTable};
use routebind_core::{
    Error, HandlerDescriptor, MiddlewareOutput, ParamKind, ParamSource, ParamSpec, Result, Verb,
};
use std::sync::Arc;

/// Registration record for one handler
///
/// Holds the descriptor, the explicitly declared parameter list and the
/// handler body. `#[route]` generates one of these per annotated function.
pub struct Route {
    descriptor: HandlerDescriptor,
    params: Vec<ParamSpec>,
    handler: Option<Box<dyn Handler>>,
}

impl Route {
    /// Route with the verb's default source; the scope is filled in by the
    /// registrar unless set with [`Route::scope`]
    pub fn new(name: impl Into<String>, verb: Verb) -> Self {
        Self {
            descriptor: HandlerDescriptor::new("", name, verb),
            params: Vec::new(),
            handler: None,
        }
    }

    /// `GET /{name}`, parameters read from the query string
    pub fn get(name: impl Into<String>) -> Self {
        Self::new(name, Verb::Get)
    }

    /// `POST /{name}`, parameters read from the body
    pub fn post(name: impl Into<String>) -> Self {
        Self::new(name, Verb::Post)
    }

    /// Middleware mounted at `/`, parameters read from the headers, result
    /// merged into the request context
    pub fn middleware(name: impl Into<String>) -> Self {
        Self::new(name, Verb::Use)
    }

    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.descriptor.scope = scope.into();
        self
    }

    /// Read parameters from `source` instead of the verb's default
    pub fn source(mut self, source: ParamSource) -> Self {
        self.descriptor.source = source;
        self
    }

    /// Run as a middleware step that stores its result under `key`
    pub fn output_key(mut self, key: impl Into<String>) -> Self {
        self.descriptor.output = Some(MiddlewareOutput::Key(key.into()));
        self
    }

    /// Run as a middleware step that merges its object result into the context
    pub fn merge(mut self) -> Self {
        self.descriptor.output = Some(MiddlewareOutput::Merge);
        self
    }

    /// Declare the next formal parameter
    pub fn param(mut self, name: impl Into<String>, kind: ParamKind) -> Self {
        self.params.push(ParamSpec::new(name, kind));
        self
    }

    pub fn handler(mut self, handler: Box<dyn Handler>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn descriptor(&self) -> &HandlerDescriptor {
        &self.descriptor
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("descriptor", &self.descriptor)
            .field("params", &self.params)
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

/// Builder for the route table of one scope
pub struct Registrar {
    scope: String,
    routes: Vec<Route>,
    metrics: Option<Arc<DispatchMetrics>>,
}

impl Registrar {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            routes: Vec::new(),
            metrics: None,
        }
    }

    /// Add a route (builder style)
    pub fn route(mut self, route: Route) -> Self {
        self.push(route);
        self
    }

    /// Add a handler from its parts
    pub fn register(
        &mut self,
        descriptor: HandlerDescriptor,
        params: Vec<ParamSpec>,
        handler: Box<dyn Handler>,
    ) -> &mut Self {
        self.push(Route {
            descriptor,
            params,
            handler: Some(handler),
        });
        self
    }

    /// Record dispatch metrics for every route of this scope
    pub fn with_metrics(mut self, metrics: Arc<DispatchMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn push(&mut self, mut route: Route) {
        if route.descriptor.scope.is_empty() {
            route.descriptor.scope = self.scope.clone();
        }
        self.routes.push(route);
    }

    /// Validate every route and produce the immutable table
    ///
    /// Fails on the first misdeclared route or on two `GET`/`POST` routes
    /// sharing a path.
    pub fn build(self) -> Result<RouteTable> {
        let mut bound = Vec::with_capacity(self.routes.len());

        for route in self.routes {
            let Route {
                descriptor,
                params,
                handler,
            } = route;

            let handler = handler.ok_or_else(|| {
                Error::Registration(format!(
                    "{} has no handler body",
                    descriptor.qualified_name()
                ))
            })?;
            let bindings = descriptor::extract(&descriptor, &params)?;
            let path = descriptor.path();

            tracing::debug!(
                handler = %descriptor.qualified_name(),
                verb = %descriptor.verb,
                path = %path,
                source = %descriptor.source,
                params = bindings.len(),
                "Route registered"
            );

            bound.push(Arc::new(BoundRoute {
                descriptor,
                path,
                bindings,
                handler: Arc::from(handler),
                metrics: self.metrics.clone(),
            }));
        }

        RouteTable::from_routes(bound)
    }
}

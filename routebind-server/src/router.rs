//! Route table and request pipeline
//!
//! A [`RouteTable`] is the immutable result of
//! [`Registrar::build`](crate::Registrar::build). It runs each request
//! through its routes in registration order:
//!
//! - `USE` routes (middleware) match every request
//! - `GET` and `POST` routes match their exact verb and `/{name}` path
//!
//! Each matching route resolves its parameters, then dispatches. Only a
//! middleware step continues the pipeline, through the [`Next`] it was
//! handed. If the pipeline runs out of routes before anything was written,
//! the table answers `404 {"error": "Cannot GET /path"}`.
//!
//! # Thread Safety
//!
//! Tables are cheaply cloneable (`Arc`-based) and can be shared across
//! transport tasks. Every request gets its own [`Context`](crate::Context),
//! so concurrent requests never see each other's middleware output.
//!
//! # Examples
//!
//! ```rust
//! use routebind_server::{from_fn, BufferedResponse, ParamKind, Registrar, Request, Route};
//!
//! # async fn example() -> routebind_server::Result<()> {
//! let table = Registrar::new("math")
//!     .route(
//!         Route::get("double")
//!             .param("n", ParamKind::Number)
//!             .handler(from_fn(|args| async move {
//!                 let n = args.value("n").and_then(|v| v.as_f64()).unwrap_or_default();
//!                 Ok(serde_json::json!(n * 2.0))
//!             })),
//!     )
//!     .build()?;
//!
//! let (response, buffer) = BufferedResponse::handle();
//! table.handle(Request::builder("GET", "/double").query("n", "21").build(), response).await;
//! assert_eq!(buffer.body_json(), Some(serde_json::json!(42.0)));
//! # Ok(())
//! # }
//! ```

use crate::descriptor::ParamBinding;
use crate::dispatcher::{self, Outcome};
use crate::handler::Handler;
use crate::metrics::DispatchMetrics;
use crate::request::Request;
use crate::resolver::resolve_all;
use crate::response::ResponseHandle;
use futures::future::BoxFuture;
use routebind_core::{Error, HandlerDescriptor, Result, Verb};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

/// One registered route with its precomputed binding plan
pub(crate) struct BoundRoute {
    pub(crate) descriptor: HandlerDescriptor,
    pub(crate) path: String,
    pub(crate) bindings: Vec<ParamBinding>,
    pub(crate) handler: Arc<dyn Handler>,
    pub(crate) metrics: Option<Arc<DispatchMetrics>>,
}

impl BoundRoute {
    fn matches(&self, request: &Request) -> bool {
        match self.descriptor.verb {
            Verb::Use => true,
            verb => request.method() == verb.as_str() && request.path() == self.path,
        }
    }

    /// Resolve parameters then dispatch
    #[tracing::instrument(
        name = "route.dispatch",
        skip(self, request, response, next),
        fields(handler = %self.descriptor.qualified_name(), verb = %self.descriptor.verb, path = %request.path())
    )]
    async fn invoke(&self, request: Request, response: ResponseHandle, next: Next) {
        let started = Instant::now();

        let outcome = match resolve_all(&self.bindings, &self.descriptor, &request, &response) {
            Ok(resolved) => {
                dispatcher::dispatch(
                    self.handler.as_ref(),
                    resolved,
                    &self.descriptor,
                    request.context(),
                    &response,
                    next,
                )
                .await
            }
            Err(e) => {
                tracing::debug!(error = %e, "Parameter binding failed");
                if let (Some(metrics), Some(kind)) = (&self.metrics, e.binding_kind()) {
                    metrics.record_binding_failure(&self.descriptor.qualified_name(), kind);
                }
                dispatcher::report_error(&response, &e);
                Outcome::BadRequest
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_dispatch(
                &self.descriptor.qualified_name(),
                outcome.as_str(),
                started.elapsed().as_secs_f64(),
            );
        }
    }
}

/// Pipeline continuation handed to each matching route
///
/// Running it visits the remaining routes of the table for the same request
/// and response.
pub struct Next {
    routes: Arc<Vec<Arc<BoundRoute>>>,
    index: usize,
    request: Request,
    response: ResponseHandle,
}

impl Next {
    pub(crate) fn new(
        routes: Arc<Vec<Arc<BoundRoute>>>,
        request: Request,
        response: ResponseHandle,
    ) -> Self {
        Self {
            routes,
            index: 0,
            request,
            response,
        }
    }

    /// Advance to the next matching route, or answer 404 if none is left
    pub fn run(self) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            let Next {
                routes,
                mut index,
                request,
                response,
            } = self;

            while let Some(route) = routes.get(index) {
                index += 1;
                if !route.matches(&request) {
                    continue;
                }
                let route = Arc::clone(route);
                let next = Next {
                    routes,
                    index,
                    request: request.clone(),
                    response: response.clone(),
                };
                route.invoke(request, response, next).await;
                return;
            }

            if !response.headers_sent() {
                let message = format!("Cannot {} {}", request.method(), request.path());
                tracing::debug!(method = %request.method(), path = %request.path(), "No route matched");
                dispatcher::write_error(&response, 404, &message);
            }
        })
    }
}

/// Immutable, cloneable set of routes
#[derive(Clone, Default)]
pub struct RouteTable {
    routes: Arc<Vec<Arc<BoundRoute>>>,
}

impl RouteTable {
    pub(crate) fn from_routes(routes: Vec<Arc<BoundRoute>>) -> Result<Self> {
        check_unique(&routes)?;
        Ok(Self {
            routes: Arc::new(routes),
        })
    }

    /// Run one request through the pipeline
    pub async fn handle(&self, request: Request, response: ResponseHandle) {
        Next::new(Arc::clone(&self.routes), request, response)
            .run()
            .await
    }

    /// Check whether a route is mounted for `verb` at `path`
    ///
    /// For `Verb::Use` every middleware is mounted at `/`.
    pub fn has_route(&self, verb: Verb, path: &str) -> bool {
        self.routes
            .iter()
            .any(|route| route.descriptor.verb == verb && route.path == path)
    }

    /// Descriptors in pipeline order
    pub fn routes(&self) -> impl Iterator<Item = &HandlerDescriptor> {
        self.routes.iter().map(|route| &route.descriptor)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Append `other`'s routes after this table's
    ///
    /// Fails if both tables mount a `GET` or `POST` route at the same path.
    pub fn merge(self, other: RouteTable) -> Result<RouteTable> {
        let routes = self
            .routes
            .iter()
            .chain(other.routes.iter())
            .cloned()
            .collect();
        Self::from_routes(routes)
    }
}

impl std::fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.routes.iter().map(|route| {
                format!(
                    "{} {} ({})",
                    route.descriptor.verb,
                    route.path,
                    route.descriptor.qualified_name()
                )
            }))
            .finish()
    }
}

fn check_unique(routes: &[Arc<BoundRoute>]) -> Result<()> {
    let mut seen = HashSet::new();
    for route in routes {
        let verb = route.descriptor.verb;
        if verb == Verb::Use {
            continue;
        }
        if !seen.insert((verb, route.path.as_str())) {
            return Err(Error::Registration(format!(
                "{} {} is registered more than once (last by {})",
                verb,
                route.path,
                route.descriptor.qualified_name()
            )));
        }
    }
    Ok(())
}

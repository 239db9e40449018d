//! Declarative request-handler binding for HTTP routes
//!
//! This crate turns handler functions with explicitly declared parameters into
//! routes. For each request it resolves every parameter from the request,
//! validates and coerces it, invokes the handler and writes the result as
//! JSON. HTTP parsing and the listening socket belong to the embedding
//! transport, which only has to build a [`Request`] and provide a
//! [`ResponseSink`].
//!
//! # Core Features
//!
//! - **Explicit parameter lists**: name and [`ParamKind`] per parameter, in order
//! - **Single-source binding**: query for `GET`, body for `POST`, headers for
//!   middleware, or any source configured per route
//! - **Middleware hand-off**: a middleware result is published into the
//!   per-request [`Context`] and binds later parameters of the same name
//! - **Reserved parameters**: `req` binds the request, `res` the response
//! - **Uniform errors**: `{"error": message}` with 400 for binding failures and
//!   the handler's status (or 500) for handler failures
//! - **Observability**: `tracing` spans per dispatch, optional OpenTelemetry metrics
//!
//! # Quick Start
//!
//! ```rust
//! use routebind_server::{from_fn, BufferedResponse, ParamKind, Registrar, Request, Route};
//! use serde_json::json;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let table = Registrar::new("greeter")
//!         .route(
//!             Route::get("hello")
//!                 .param("name", ParamKind::String)
//!                 .handler(from_fn(|mut args| async move {
//!                     let name: String = args.take(0)?;
//!                     Ok(json!({ "greeting": format!("hello {name}") }))
//!                 })),
//!         )
//!         .build()?;
//!
//!     let (response, buffer) = BufferedResponse::handle();
//!     let request = Request::builder("GET", "/hello").query("name", "ada").build();
//!     table.handle(request, response).await;
//!
//!     assert_eq!(buffer.status_code(), 200);
//!     assert_eq!(buffer.body_json(), Some(json!({"greeting": "hello ada"})));
//!     Ok(())
//! }
//! ```
//!
//! # Request Flow
//!
//! 1. The [`RouteTable`] walks its routes in registration order
//! 2. A matching route resolves its parameters; the first failure answers 400
//! 3. The handler runs; its result is written, or published for middleware
//! 4. A middleware step continues with [`Next`]; when nothing is left and no
//!    response was written the table answers 404

mod bind;
mod descriptor;
mod dispatcher;
mod handler;
mod metrics;
mod registrar;
mod request;
mod resolver;
mod response;
mod router;

pub use bind::{BindParam, Bound, BoundArgs};
pub use descriptor::{extract, ParamBinding};
pub use dispatcher::{dispatch, report_error, write_error, Outcome};
pub use handler::{from_fn, from_sync_fn, into_json, Handler, HandlerResult};
pub use metrics::DispatchMetrics;
pub use registrar::{Registrar, Route};
pub use request::{Context, Request, RequestBuilder};
pub use resolver::{resolve, resolve_all, Resolved};
pub use response::{BufferedResponse, ResponseHandle, ResponseSink};
pub use router::{Next, RouteTable};

pub use routebind_core::{
    Error, HandlerDescriptor, MiddlewareOutput, ObjectId, ParamKind, ParamSource, ParamSpec,
    ParamValue, Result, Verb,
};

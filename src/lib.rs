//! routebind - declarative parameter binding for HTTP handlers
//!
//! This is the convenience crate that re-exports the routebind sub-crates.
//!
//! # Architecture
//!
//! - **routebind-core**: descriptor types, coercion table, errors, telemetry bootstrap
//! - **routebind-server**: resolver, dispatcher, registrar and route table
//! - **routebind-macros**: the `#[route]` attribute
//!
//! Code generated by `#[route]` refers to `::routebind_server`, so crates
//! using the attribute depend on `routebind-server` as well.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use routebind::route;
//! use routebind::server::{BufferedResponse, Registrar, Request, Result};
//! use serde_json::{json, Value};
//!
//! #[route(GET)]
//! async fn add(a: f64, b: f64) -> Result<Value> {
//!     Ok(json!({ "sum": a + b }))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let table = Registrar::new("math").route(add()).build()?;
//!
//!     let (response, buffer) = BufferedResponse::handle();
//!     let request = Request::builder("GET", "/add").query("a", "2").query("b", "3").build();
//!     table.handle(request, response).await;
//!
//!     assert_eq!(buffer.body_json(), Some(json!({ "sum": 5.0 })));
//!     Ok(())
//! }
//! ```

pub use routebind_core as core;
pub use routebind_macros as macros;
pub use routebind_server as server;

pub use routebind_core::{init_telemetry, shutdown_telemetry, TelemetryConfig};
pub use routebind_macros::route;
pub use routebind_server::{Registrar, Request, Route, RouteTable};

//! Handler trait and adapters
//!
//! A handler receives the resolved arguments of one call and produces a JSON
//! result, or an error that the dispatcher turns into an error response.
//!
//! # Uniform Completion
//!
//! Every handler returns a [`HandlerResult`], a boxed future. Synchronous
//! handlers created with [`from_sync_fn`] are wrapped in an already-completed
//! future, so the dispatcher always awaits one result type regardless of how
//! the handler computed it.
//!
//! # Creating Handlers
//!
//! 1. **from_fn**: async closure over [`BoundArgs`]
//! 2. **from_sync_fn**: plain closure over [`BoundArgs`]
//! 3. **#[route] macro**: annotate a function with typed parameters (via routebind-macros)
//!
//! # Examples
//!
//! ```rust
//! use routebind_server::{from_fn, from_sync_fn, BoundArgs};
//!
//! let echo = from_fn(|args: BoundArgs| async move {
//!     Ok(serde_json::Value::Object(args.to_json_map()))
//! });
//!
//! let ping = from_sync_fn(|_args| Ok(serde_json::json!({"pong": true})));
//! ```

use crate::bind::BoundArgs;
use futures::future::{self, BoxFuture};
use routebind_core::{Error, Result};
use serde_json::Value;
use std::future::Future;

/// Boxed future resolving to a handler's JSON result
pub type HandlerResult = BoxFuture<'static, Result<Value>>;

/// A route's business logic
///
/// `Send + Sync` because one handler instance serves every request matching
/// its route, from whichever task the transport runs them on.
pub trait Handler: Send + Sync {
    fn call(&self, args: BoundArgs) -> HandlerResult;
}

struct AsyncHandler<F> {
    func: F,
}

impl<F, Fut> Handler for AsyncHandler<F>
where
    F: Fn(BoundArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    fn call(&self, args: BoundArgs) -> HandlerResult {
        Box::pin((self.func)(args))
    }
}

struct SyncHandler<F> {
    func: F,
}

impl<F> Handler for SyncHandler<F>
where
    F: Fn(BoundArgs) -> Result<Value> + Send + Sync + 'static,
{
    fn call(&self, args: BoundArgs) -> HandlerResult {
        Box::pin(future::ready((self.func)(args)))
    }
}

/// Create a handler from an async function over the bound arguments
pub fn from_fn<F, Fut>(func: F) -> Box<dyn Handler>
where
    F: Fn(BoundArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    Box::new(AsyncHandler { func })
}

/// Create a handler from a synchronous function over the bound arguments
pub fn from_sync_fn<F>(func: F) -> Box<dyn Handler>
where
    F: Fn(BoundArgs) -> Result<Value> + Send + Sync + 'static,
{
    Box::new(SyncHandler { func })
}

/// Serialize a typed handler result
///
/// Used by `#[route]`-generated handlers; `()` becomes `null`.
pub fn into_json<R: serde::Serialize>(result: R) -> Result<Value> {
    serde_json::to_value(result).map_err(|e| Error::Serialization(e.to_string()))
}

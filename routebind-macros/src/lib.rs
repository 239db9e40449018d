//! Procedural macros for routebind
//!
//! `#[route]` turns a plain function into a route declaration. The function's
//! arguments become the route's explicitly declared parameter list, in order,
//! and each argument's type picks the coercion applied to it. Nothing is
//! discovered at runtime.
//!
//! # Benefits Over Manual Registration
//!
//! Without the macro:
//!
//! ```ignore
//! fn find() -> Route {
//!     Route::get("find")
//!         .param("id", ParamKind::ObjectId)
//!         .handler(from_fn(|mut args| async move {
//!             let id: ObjectId = args.take(0)?;
//!             into_json(load(id).await?)
//!         }))
//! }
//! ```
//!
//! With the macro:
//!
//! ```ignore
//! #[route(GET)]
//! async fn find(id: ObjectId) -> Result<User> {
//!     load(id).await
//! }
//! ```
//!
//! The parameter list and the argument extraction cannot drift apart.

mod route;

use proc_macro::TokenStream;

/// Attribute macro declaring a route handler
///
/// Replaces the function with a factory of the same name returning a
/// `routebind_server::Route`, ready for `Registrar::route`.
///
/// # Options
///
/// - `GET`, `POST` or `USE` (required): verb. `USE` declares a middleware
///   step mounted at `/` that merges its result into the request context.
/// - `source = "query" | "body" | "headers"`: where parameters are read
///   from. Defaults to query for `GET`, body for `POST`, headers for `USE`.
/// - `output = "key"`: publish the result under `key` instead of answering
/// - `merge`: merge an object result into the request context
/// - `scope = "..."`: handler scope, otherwise the registrar's
/// - `name = "..."`: route name, otherwise the function name
///
/// # Parameters
///
/// Each argument must be a plain identifier whose type implements
/// `routebind_server::BindParam`. The names `req` and `res` bind the request
/// and the response; a handler taking `res` writes its own response.
///
/// # Return Types
///
/// `Result<T>` with `T: Serialize` is unwrapped; any other `Serialize` type is
/// written as is. Both `async fn` and plain `fn` are accepted.
///
/// # Examples
///
/// ```ignore
/// #[route(USE, output = "user")]
/// async fn authenticate(authorization: String) -> Result<User> {
///     sessions::lookup(&authorization).await
/// }
///
/// #[route(POST, scope = "posts")]
/// async fn create(user: Value, title: String, tags: Vec<Value>) -> Result<Post> {
///     posts::insert(user, title, tags).await
/// }
/// ```
#[proc_macro_attribute]
pub fn route(attr: TokenStream, item: TokenStream) -> TokenStream {
    route::route_impl(attr.into(), item.into()).into()
}

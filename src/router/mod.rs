//! # Router Module
//!
//! Path matching for incoming requests: one trie per HTTP method, static
//! segments and `:name` parameter segments, built once at startup and then
//! shared read-only by every worker.
//!
//! ## Registration
//!
//! Templates are validated when they are added. An empty template, one that
//! does not start with `/`, one that ends with `/` (other than `/` itself),
//! one with an empty segment (`/user//code`) or a nameless parameter
//! (`/user/:`) is rejected with [`RouterError::MalformedPath`]. Binding a
//! second handler to the same method and template is a
//! [`RouterError::DuplicateRoute`].
//!
//! ## Matching
//!
//! Lookup walks the request path one segment at a time. At every level a
//! static child that equals the segment wins; otherwise the node's parameter
//! child consumes the segment and records it under the parameter's name.
//! A choice is never undone, so with `/user/home/settings` and `/user/:id/profile`
//! registered, `/user/home/profile` does not match.
//!
//! ## Example
//!
//! ```rust,ignore
//! use http::Method;
//! use lr::{handler, Router};
//!
//! let mut router = Router::new();
//! router.add_route(Method::GET, "/user/:id", handler(|ctx| {
//!     let id = ctx.path_value("id").int64().unwrap_or_default();
//!     ctx.respond_text(200, format!("user {id}"));
//! }))?;
//!
//! let m = router.route(&Method::GET, "/user/7").unwrap();
//! assert_eq!(&*m.matched_path, "/user/:id");
//! assert_eq!(m.get_path_param("id"), Some("7"));
//! ```

mod core;
mod error;
mod node;

pub use core::{ParamVec, RouteMatch, Router, MAX_INLINE_PARAMS};
pub use error::RouterError;
pub use node::MatchMiss;

//! # Middleware Module
//!
//! Ready-made middleware builders. Each `build()` returns a
//! [`MiddlewareRef`](crate::MiddlewareRef) to pass to
//! [`HttpServer::use_middleware`](crate::HttpServer::use_middleware) or
//! [`Dispatcher::new`](crate::Dispatcher::new).
//!
//! Order matters: the first registered middleware is the outermost. A
//! typical stack puts the span and access log outside so they observe the
//! final status, then the error pages, then panic recovery closest to the
//! handlers:
//!
//! ```rust,ignore
//! server.use_middleware(TracingBuilder::new().build());
//! server.use_middleware(AccessLogBuilder::new().build());
//! server.use_middleware(ErrorPageBuilder::new().add_code(404, "not here").build());
//! server.use_middleware(RecoverBuilder::default().build());
//! ```

mod access_log;
mod error_page;
mod recover;
mod span;

pub use access_log::{AccessLog, AccessLogBuilder, LogFn};
pub use error_page::{ErrorPageBuilder, DEFAULT_PAGE_CONTENT_TYPE};
pub use recover::{RecoverBuilder, RecoverLogFn};
pub use span::TracingBuilder;

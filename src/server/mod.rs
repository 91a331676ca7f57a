//! # Server Module
//!
//! The thin shell around the dispatcher: route and middleware registration,
//! a blocking `tiny_http` listener and a fixed pool of worker threads.
//!
//! Each worker takes one request at a time off the listener, builds a
//! [`Context`](crate::Context) over a fresh
//! [`BufferedResponse`](crate::BufferedResponse), dispatches it and sends the
//! buffered status, headers and body back. Malformed requests get a 400 and
//! bodies over `max_form_bytes` a 413 before reaching the chain. Flush
//! failures and panics that escape every middleware get a 500 and leave the
//! worker alive.

mod http_server;
mod request;
mod response;

pub use http_server::{HttpServer, ServerHandle, ShutdownTrigger};
pub use request::RequestError;

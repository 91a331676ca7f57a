//! # lr
//!
//! **lr** is a lightweight request-dispatch core: a per-method routing trie,
//! onion-style middleware and a buffered request/response exchange, with a
//! thin blocking HTTP shell on top.
//!
//! ## Architecture
//!
//! - **[`router`]** - Routing trie with static and `:param` segments, validated at registration
//! - **[`context`]** - The per-request [`Context`]: lazily cached query/form values, typed
//!   [`StringValue`] accessors, buffered status and body
//! - **[`handler`]** - [`Handler`] and [`Middleware`] traits and the onion fold
//! - **[`dispatcher`]** - Routing step, middleware chain and the flush to the response sink
//! - **[`server`]** - [`HttpServer`] registration surface, `tiny_http` listener, worker threads
//! - **[`middleware`]** - Access log, error pages, panic recovery, request spans
//! - **[`session`]** - Session store/propagator contracts, in-memory store, cookie propagation
//! - **[`codec`]**, **[`template`]**, **[`files`]** - Body codecs, HTML rendering, file downloads and uploads
//! - **[`runtime_config`]**, **[`logging`]**, **[`ids`]** - Environment config, `tracing`
//!   setup, request ids
//!
//! ### Request Handling Flow
//!
//! ```text
//! listener ─▶ Context ─▶ mw[0] ─▶ mw[1] ─▶ … ─▶ router ─▶ handler
//!                          │                               │
//!                          ◀──────── after code ◀──────────┘
//!                          │
//!                          └─▶ flush(status, body) ─▶ response sink
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use lr::middleware::{AccessLogBuilder, RecoverBuilder};
//! use lr::HttpServer;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut server = HttpServer::new();
//!     server.use_middleware(AccessLogBuilder::new().build());
//!     server.use_middleware(RecoverBuilder::default().build());
//!
//!     server.get("/user/:id", |ctx| {
//!         let id = ctx.path_value("id").int64();
//!         match id {
//!             Ok(id) => ctx.respond_text(200, format!("user {id}")),
//!             Err(err) => ctx.respond_text(400, err.to_string()),
//!         }
//!     })?;
//!
//!     server.start("0.0.0.0:8080")?.join();
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod context;
pub mod dispatcher;
pub mod files;
pub mod handler;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod router;
pub mod runtime_config;
pub mod server;
pub mod session;
pub mod template;

pub use codec::{Codec, CodecError, JsonCodec};
pub use context::{BufferedResponse, Context, ResponseSink, StringValue, ValueError};
pub use dispatcher::Dispatcher;
pub use handler::{compose, handler, middleware, Handler, HandlerRef, Middleware, MiddlewareRef};
pub use ids::RequestId;
pub use router::{MatchMiss, ParamVec, RouteMatch, Router, RouterError};
pub use server::{HttpServer, ServerHandle, ShutdownTrigger};

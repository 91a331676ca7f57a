//! # Session Module
//!
//! Server-side sessions split into three collaborators:
//!
//! - [`Store`] owns session lifetimes (create, look up, refresh, delete)
//! - [`Session`] holds the per-session key/value data
//! - [`Propagator`] carries the session id between client and server
//!
//! [`Manager`] ties a store and a propagator together for use from handlers.
//! The crate ships an in-memory store ([`memory::MemoryStore`]) and a cookie
//! propagator ([`cookie::CookiePropagator`]).
//!
//! ```rust,ignore
//! let manager = Manager::new(
//!     Arc::new(MemoryStore::new(Duration::from_secs(30 * 60))),
//!     Arc::new(CookiePropagator::default()),
//! );
//!
//! let login = manager.clone();
//! server.post("/login", move |ctx| {
//!     match login.init_session(ctx) {
//!         Ok(sess) => { let _ = sess.set("user", json!("ann")); ctx.respond_text(200, "ok") }
//!         Err(err) => ctx.respond_text(500, err.to_string()),
//!     }
//! })?;
//! ```

pub mod cookie;
mod manager;
pub mod memory;

use std::sync::Arc;

use http::Request;
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::context::ResponseSink;

pub use manager::Manager;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// No live session has this id; expired sessions count as absent
    #[error("session '{0}' not found")]
    NotFound(String),
    /// The session exists but holds no value under this key
    #[error("session key '{0}' not found")]
    KeyNotFound(String),
    /// The request does not carry a session id
    #[error("request carries no '{0}' session cookie")]
    MissingCookie(String),
}

/// Key/value data of one session.
pub trait Session: Send + Sync {
    fn get(&self, key: &str) -> Result<JsonValue, SessionError>;

    fn set(&self, key: &str, value: JsonValue) -> Result<(), SessionError>;

    fn id(&self) -> &str;
}

/// Session lifetime management. Ids are chosen by the caller.
pub trait Store: Send + Sync {
    fn generate(&self, id: &str) -> Result<Arc<dyn Session>, SessionError>;

    /// Push the session's expiry out by a full period.
    fn refresh(&self, id: &str) -> Result<(), SessionError>;

    fn remove(&self, id: &str) -> Result<(), SessionError>;

    fn get(&self, id: &str) -> Result<Arc<dyn Session>, SessionError>;
}

/// Moves session ids between requests and responses.
pub trait Propagator: Send + Sync {
    fn inject(&self, id: &str, resp: &mut dyn ResponseSink) -> Result<(), SessionError>;

    fn extract(&self, req: &Request<Vec<u8>>) -> Result<String, SessionError>;

    /// Tell the client to drop its session id.
    fn remove(&self, resp: &mut dyn ResponseSink) -> Result<(), SessionError>;
}

//! # Context Module
//!
//! The per-request exchange handed to every middleware and handler.
//!
//! A [`Context`] owns the inbound request and borrows a [`ResponseSink`]
//! for the outbound side. Handlers produce their answer by setting the
//! buffered `status` and `resp_data` fields; the dispatcher flushes them to
//! the sink after the whole middleware chain has returned.
//!
//! Query and form values are decoded lazily, once per exchange, and handed
//! out as [`StringValue`]s whose typed accessors carry a lookup failure
//! through to the caller:
//!
//! ```rust,ignore
//! let page = ctx.query_value("page").uint32().unwrap_or(1);
//! match ctx.form_value("email").string() {
//!     Ok("") => ctx.respond_text(400, "email must not be empty"),
//!     Ok(email) => { /* ... */ }
//!     Err(ValueError::KeyNotFound(_)) => ctx.respond_text(400, "email is required"),
//!     Err(err) => ctx.respond_text(400, err.to_string()),
//! }
//! ```

mod core;
mod error;
mod sink;
mod value;

pub use core::{Context, FormValues, DEFAULT_MAX_FORM_BYTES};
pub use error::ValueError;
pub use sink::{BufferedResponse, ResponseSink};
pub use value::StringValue;

use http::Method;
use thiserror::Error;

/// Registration-time routing errors.
///
/// All of these are programmer errors in the route table and are reported
/// before the server starts listening.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    /// The template is empty, lacks the leading `/`, has a trailing `/`,
    /// contains an empty segment, or names a parameter with nothing after `:`
    #[error("malformed route path '{pattern}': {reason}")]
    MalformedPath {
        pattern: String,
        reason: &'static str,
    },
    /// A handler is already bound to the template for this method
    #[error("route {method} {pattern} is already registered")]
    DuplicateRoute { method: Method, pattern: String },
    /// A parameter segment uses a different name than the parameter already
    /// registered at the same position
    #[error("parameter ':{requested}' in '{pattern}' conflicts with ':{existing}' registered at the same position")]
    ParamConflict {
        pattern: String,
        existing: String,
        requested: String,
    },
}

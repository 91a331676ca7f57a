use thiserror::Error;

/// Failure carried by a [`StringValue`](super::StringValue) or returned by
/// one of its typed accessors.
///
/// A missing key and an empty value are different things: only the former
/// produces [`ValueError::KeyNotFound`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// The requested key is absent from the query, form or path parameters
    #[error("key '{0}' not found")]
    KeyNotFound(String),
    /// The raw value could not be converted to the requested type
    #[error("cannot convert '{value}' to {target}: {reason}")]
    Conversion {
        /// The raw string that failed to parse
        value: String,
        /// Name of the target type
        target: &'static str,
        /// Parser message
        reason: String,
    },
    /// An urlencoded body exceeded the configured form limit
    #[error("form body of {size} bytes exceeds the {limit} byte limit")]
    FormTooLarge { size: usize, limit: usize },
}

use std::io::{self, Read};

use http::Request;
use thiserror::Error;

/// Why an inbound request could not be turned into an exchange.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("failed to read request body: {0}")]
    Body(#[from] io::Error),
    #[error("invalid request line or header: {0}")]
    Invalid(#[from] http::Error),
    #[error("request body exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

impl RequestError {
    /// Status code the shell answers with when conversion fails.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::TooLarge { .. } => 413,
            Self::Body(_) | Self::Invalid(_) => 400,
        }
    }
}

/// Convert a listener request into an `http::Request` with its body read.
///
/// At most `max_body_bytes` are buffered. A declared `Content-Length` above
/// the cap is rejected before reading; a body without one is read up to the
/// cap plus one byte so an overrun is detected.
pub(crate) fn into_http_request(
    req: &mut tiny_http::Request,
    max_body_bytes: usize,
) -> Result<Request<Vec<u8>>, RequestError> {
    let too_large = RequestError::TooLarge {
        limit: max_body_bytes,
    };
    if req.body_length().is_some_and(|len| len > max_body_bytes) {
        return Err(too_large);
    }

    let mut builder = Request::builder()
        .method(req.method().to_string().as_str())
        .uri(req.url());
    for header in req.headers() {
        builder = builder.header(header.field.as_str().as_str(), header.value.as_str());
    }

    let mut body = Vec::with_capacity(req.body_length().unwrap_or(0));
    let cap = u64::try_from(max_body_bytes).unwrap_or(u64::MAX);
    req.as_reader()
        .take(cap.saturating_add(1))
        .read_to_end(&mut body)?;
    if body.len() > max_body_bytes {
        return Err(too_large);
    }
    Ok(builder.body(body)?)
}

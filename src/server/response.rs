use std::io::Cursor;

use tracing::warn;

use crate::context::BufferedResponse;

pub(crate) type WireResponse = tiny_http::Response<Cursor<Vec<u8>>>;

/// Turn a flushed exchange into the listener's response type.
///
/// Headers that are not valid on the wire are dropped with a warning.
pub(crate) fn into_wire_response(out: BufferedResponse) -> WireResponse {
    let status = out.status_or_ok();
    let mut response = tiny_http::Response::from_data(out.body).with_status_code(status);
    for (name, value) in &out.headers {
        match tiny_http::Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            Ok(header) => response.add_header(header),
            Err(()) => warn!(header = %name, "dropping invalid response header"),
        }
    }
    response
}

/// Plain-text response for failures outside the dispatch chain.
pub(crate) fn plain(status: u16, body: &str) -> WireResponse {
    let mut out = BufferedResponse::new();
    out.status = Some(status);
    out.headers
        .push(("Content-Type".to_string(), "text/plain; charset=utf-8".to_string()));
    out.body = body.as_bytes().to_vec();
    into_wire_response(out)
}

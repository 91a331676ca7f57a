use std::io;

/// Outbound half of an exchange.
///
/// Headers go straight to the sink when a handler sets them. Status and
/// body are buffered on the [`Context`](super::Context) and reach the sink
/// only when the dispatcher flushes.
pub trait ResponseSink {
    fn write_status(&mut self, status: u16);

    /// Set a header, replacing any previous value with the same name.
    fn set_header(&mut self, name: &str, value: &str);

    /// Add a header line without touching existing ones (`Set-Cookie`).
    fn append_header(&mut self, name: &str, value: &str);

    /// Write body bytes, returning how many were accepted.
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;
}

/// In-memory sink. The server shell converts it into a wire response once
/// dispatch finishes; tests inspect it directly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferedResponse {
    pub status: Option<u16>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl BufferedResponse {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Status to put on the wire; a handler that never set one gets 200.
    #[must_use]
    pub fn status_or_ok(&self) -> u16 {
        self.status.unwrap_or(200)
    }

    /// First value of header `name`, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Every value of header `name`, in insertion order.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl ResponseSink for BufferedResponse {
    fn write_status(&mut self, status: u16) {
        self.status = Some(status);
    }

    fn set_header(&mut self, name: &str, value: &str) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn append_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.body.extend_from_slice(data);
        Ok(data.len())
    }
}

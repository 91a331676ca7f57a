use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use http::header::CONTENT_TYPE;
use http::{Method, Request};
use once_cell::unsync::OnceCell;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;

use super::error::ValueError;
use super::sink::ResponseSink;
use super::value::StringValue;
use crate::codec::{Codec, CodecError, JsonCodec};
use crate::ids::{RequestId, REQUEST_ID_HEADER};
use crate::router::ParamVec;
use crate::template::{TemplateEngine, TemplateError};

/// Decoded `key → values` pairs from a query string or urlencoded body.
pub type FormValues = HashMap<String, Vec<String>>;

/// Default cap on an urlencoded body parsed by [`Context::form_value`].
pub const DEFAULT_MAX_FORM_BYTES: usize = 10 << 20;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// State of one request/response exchange.
///
/// Handlers and middleware see the same context for the whole trip through
/// the chain. The response status and body are buffered in [`status`] and
/// [`resp_data`] and written to the sink once, after the outermost
/// middleware returns, so an outer layer can still rewrite what an inner
/// one produced. Headers are the exception: they go to the sink right away.
///
/// A status of `0` means "not set"; the sink then applies its own default.
///
/// [`status`]: Context::status
/// [`resp_data`]: Context::resp_data
pub struct Context<'a> {
    req: Request<Vec<u8>>,
    resp: &'a mut dyn ResponseSink,
    request_id: RequestId,
    path_params: ParamVec,
    matched_path: Option<Arc<str>>,
    query_cache: OnceCell<FormValues>,
    form_cache: OnceCell<Result<FormValues, ValueError>>,
    max_form_bytes: usize,
    /// Buffered response status; `0` until something sets it
    pub status: u16,
    /// Buffered response body
    pub resp_data: Vec<u8>,
}

impl<'a> Context<'a> {
    /// Start an exchange for `req`, answering through `resp`.
    pub fn new(req: Request<Vec<u8>>, resp: &'a mut dyn ResponseSink) -> Self {
        let request_id = RequestId::from_header_or_new(
            req.headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok()),
        );
        Self {
            req,
            resp,
            request_id,
            path_params: ParamVec::new(),
            matched_path: None,
            query_cache: OnceCell::new(),
            form_cache: OnceCell::new(),
            max_form_bytes: DEFAULT_MAX_FORM_BYTES,
            status: 0,
            resp_data: Vec::new(),
        }
    }

    /// Cap the urlencoded body size that [`form_value`](Self::form_value)
    /// will parse.
    #[must_use]
    pub fn with_max_form_bytes(mut self, limit: usize) -> Self {
        self.max_form_bytes = limit;
        self
    }

    #[must_use]
    pub fn request(&self) -> &Request<Vec<u8>> {
        &self.req
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        self.req.method()
    }

    /// Request path without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        self.req.uri().path()
    }

    /// Value of request header `name`, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.req.headers().get(name).and_then(|v| v.to_str().ok())
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        self.req.body()
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// The response sink, for headers and other direct writes.
    pub fn resp(&mut self) -> &mut dyn ResponseSink {
        &mut *self.resp
    }

    /// Set a response header immediately.
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.resp.set_header(name, value);
    }

    /// The route template that matched, once routing has run.
    #[must_use]
    pub fn matched_path(&self) -> Option<&str> {
        self.matched_path.as_deref()
    }

    #[must_use]
    pub fn path_params(&self) -> &ParamVec {
        &self.path_params
    }

    pub(crate) fn set_route(&mut self, path_params: ParamVec, matched_path: Arc<str>) {
        self.path_params = path_params;
        self.matched_path = Some(matched_path);
    }

    /// Path parameter bound by the matched route.
    #[must_use]
    pub fn path_value(&self, key: &str) -> StringValue {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == key)
            .map_or_else(|| StringValue::missing(key), |(_, v)| StringValue::found(v.as_str()))
    }

    /// First query-string value for `key`.
    ///
    /// The query string is parsed on first use and cached for the rest of
    /// the exchange. A key that is present with an empty value (`?q=`) is
    /// found and empty; only an absent key is an error.
    #[must_use]
    pub fn query_value(&self, key: &str) -> StringValue {
        first_value(self.query_values(), key)
    }

    /// All decoded query pairs.
    pub fn query_values(&self) -> &FormValues {
        self.query_cache.get_or_init(|| {
            let mut values = FormValues::new();
            append_pairs(&mut values, self.req.uri().query().unwrap_or("").as_bytes());
            values
        })
    }

    /// First form value for `key`.
    ///
    /// For POST, PUT and PATCH requests with an urlencoded body, body values
    /// come before query values; other requests see only the query. The
    /// parse runs once; its result, error included, is cached.
    #[must_use]
    pub fn form_value(&self, key: &str) -> StringValue {
        match self.form_values() {
            Ok(values) => first_value(values, key),
            Err(err) => StringValue::failed(err),
        }
    }

    /// All decoded form pairs, or the error that stopped the parse.
    pub fn form_values(&self) -> Result<&FormValues, ValueError> {
        self.form_cache
            .get_or_init(|| self.parse_form())
            .as_ref()
            .map_err(Clone::clone)
    }

    fn parse_form(&self) -> Result<FormValues, ValueError> {
        let mut values = FormValues::new();
        if self.has_form_body() {
            let body = self.req.body();
            if body.len() > self.max_form_bytes {
                return Err(ValueError::FormTooLarge {
                    size: body.len(),
                    limit: self.max_form_bytes,
                });
            }
            append_pairs(&mut values, body);
        }
        append_pairs(&mut values, self.req.uri().query().unwrap_or("").as_bytes());
        Ok(values)
    }

    fn has_form_body(&self) -> bool {
        let method = self.req.method();
        if method != Method::POST && method != Method::PUT && method != Method::PATCH {
            return false;
        }
        self.header(CONTENT_TYPE.as_str())
            .and_then(|ct| ct.split(';').next())
            .is_some_and(|ct| ct.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
    }

    /// Decode the request body with codec `C`.
    pub fn bind<C: Codec, T: DeserializeOwned>(&self) -> Result<T, CodecError> {
        C::decode(self.req.body())
    }

    pub fn bind_json<T: DeserializeOwned>(&self) -> Result<T, CodecError> {
        self.bind::<JsonCodec, T>()
    }

    /// Encode `value` with codec `C` and buffer it as the response.
    ///
    /// On an encoding error nothing is buffered.
    pub fn respond<C: Codec, T: Serialize + ?Sized>(
        &mut self,
        status: u16,
        value: &T,
    ) -> Result<(), CodecError> {
        let data = C::encode(value)?;
        self.resp.set_header(CONTENT_TYPE.as_str(), C::CONTENT_TYPE);
        self.status = status;
        self.resp_data = data;
        Ok(())
    }

    pub fn respond_json_ok<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), CodecError> {
        self.respond::<JsonCodec, T>(200, value)
    }

    /// Buffer a plain-text response.
    pub fn respond_text(&mut self, status: u16, message: impl Into<String>) {
        self.resp
            .set_header(CONTENT_TYPE.as_str(), "text/plain; charset=utf-8");
        self.status = status;
        self.resp_data = message.into().into_bytes();
    }

    /// Render template `name` with `engine` and buffer it as an HTML page.
    ///
    /// A render failure buffers a 500 status and returns the error.
    pub fn render(
        &mut self,
        engine: &dyn TemplateEngine,
        name: &str,
        data: &JsonValue,
    ) -> Result<(), TemplateError> {
        match engine.render(name, data) {
            Ok(page) => {
                self.resp
                    .set_header(CONTENT_TYPE.as_str(), "text/html; charset=utf-8");
                self.status = 200;
                self.resp_data = page;
                Ok(())
            }
            Err(err) => {
                self.status = 500;
                Err(err)
            }
        }
    }

    /// Write the buffered status and body to the sink.
    ///
    /// A status of `0` is not written. When the sink accepts fewer bytes
    /// than were buffered the exchange fails with
    /// [`io::ErrorKind::WriteZero`].
    pub fn flush(&mut self) -> io::Result<()> {
        if self.status != 0 {
            self.resp.write_status(self.status);
        }
        if self.resp_data.is_empty() {
            return Ok(());
        }
        let written = self.resp.write(&self.resp_data)?;
        if written != self.resp_data.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!(
                    "short write: {written} of {} response bytes",
                    self.resp_data.len()
                ),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("method", self.req.method())
            .field("uri", self.req.uri())
            .field("request_id", &self.request_id)
            .field("matched_path", &self.matched_path)
            .field("status", &self.status)
            .field("resp_len", &self.resp_data.len())
            .finish_non_exhaustive()
    }
}

fn append_pairs(values: &mut FormValues, input: &[u8]) {
    for (k, v) in url::form_urlencoded::parse(input) {
        values.entry(k.into_owned()).or_default().push(v.into_owned());
    }
}

fn first_value(values: &FormValues, key: &str) -> StringValue {
    values
        .get(key)
        .and_then(|vals| vals.first())
        .map_or_else(|| StringValue::missing(key), |v| StringValue::found(v.as_str()))
}

//! Cookie-based session id propagation.

use std::time::Duration;

use http::header::{COOKIE, SET_COOKIE};
use http::Request;

use super::{Propagator, SessionError};
use crate::context::ResponseSink;

/// Default cookie name carrying the session id.
pub const DEFAULT_COOKIE_NAME: &str = "sessid";

/// Sends the session id as an `HttpOnly` cookie and reads it back from the
/// request's `Cookie` header.
#[derive(Debug, Clone)]
pub struct CookiePropagator {
    name: String,
    path: String,
    max_age: Option<Duration>,
}

impl Default for CookiePropagator {
    fn default() -> Self {
        Self::new(DEFAULT_COOKIE_NAME)
    }
}

impl CookiePropagator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: "/".to_string(),
            max_age: None,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Persist the cookie for `max_age` instead of the browser session.
    #[must_use]
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Propagator for CookiePropagator {
    fn inject(&self, id: &str, resp: &mut dyn ResponseSink) -> Result<(), SessionError> {
        let mut cookie = format!("{}={}; Path={}; HttpOnly", self.name, id, self.path);
        if let Some(max_age) = self.max_age {
            cookie.push_str(&format!("; Max-Age={}", max_age.as_secs()));
        }
        resp.append_header(SET_COOKIE.as_str(), &cookie);
        Ok(())
    }

    fn extract(&self, req: &Request<Vec<u8>>) -> Result<String, SessionError> {
        req.headers()
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|header| header.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| name.trim() == self.name)
            .map(|(_, value)| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| SessionError::MissingCookie(self.name.clone()))
    }

    fn remove(&self, resp: &mut dyn ResponseSink) -> Result<(), SessionError> {
        let cookie = format!("{}=; Path={}; Max-Age=0; HttpOnly", self.name, self.path);
        resp.append_header(SET_COOKIE.as_str(), &cookie);
        Ok(())
    }
}

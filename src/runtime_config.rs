//! # Runtime Configuration Module
//!
//! Environment-driven settings for the server shell.
//!
//! ## Environment Variables
//!
//! ### `LR_ADDR`
//!
//! Listening address. Default: `0.0.0.0:8080`.
//!
//! ### `LR_WORKERS`
//!
//! Number of request worker threads. Default: the machine's available
//! parallelism. Zero is rejected.
//!
//! ### `LR_MAX_FORM_BYTES`
//!
//! Largest request body the server shell reads; a larger declared or actual
//! body is answered 413 before dispatch. Also the largest urlencoded body
//! that `Context::form_value` will parse. Accepts decimal (`1048576`) or
//! hexadecimal (`0x100000`). Default: 10 MiB.
//!
//! Unparseable values are logged and replaced by the default.
//!
//! ## Usage
//!
//! ```rust
//! use lr::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! assert!(config.workers >= 1);
//! ```

use std::env;
use std::thread;

use tracing::warn;

use crate::context::DEFAULT_MAX_FORM_BYTES;

pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub addr: String,
    pub workers: usize,
    pub max_form_bytes: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            workers: default_workers(),
            max_form_bytes: DEFAULT_MAX_FORM_BYTES,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let addr = lookup("LR_ADDR")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.addr);
        let workers = match lookup("LR_WORKERS") {
            Some(raw) => match parse_size(&raw) {
                Some(n) if n > 0 => n,
                _ => {
                    warn!(value = %raw, default = defaults.workers, "invalid LR_WORKERS");
                    defaults.workers
                }
            },
            None => defaults.workers,
        };
        let max_form_bytes = match lookup("LR_MAX_FORM_BYTES") {
            Some(raw) => parse_size(&raw).unwrap_or_else(|| {
                warn!(value = %raw, default = defaults.max_form_bytes, "invalid LR_MAX_FORM_BYTES");
                defaults.max_form_bytes
            }),
            None => defaults.max_form_bytes,
        };
        RuntimeConfig {
            addr,
            workers,
            max_form_bytes,
        }
    }
}

fn default_workers() -> usize {
    thread::available_parallelism().map_or(1, |n| n.get())
}

fn parse_size(raw: &str) -> Option<usize> {
    let raw = raw.trim();
    match raw.strip_prefix("0x") {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    }
}

//! Server-side page rendering.
//!
//! [`TemplateEngine`] is the seam handlers render through
//! ([`Context::render`](crate::Context::render)); [`MiniJinjaEngine`] is the
//! bundled implementation.

use std::fs;
use std::io;
use std::path::Path;

use minijinja::Environment;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template engine error: {0}")]
    Engine(#[from] minijinja::Error),
    #[error("failed to load templates: {0}")]
    Io(#[from] io::Error),
}

/// Renders a named template with the given data.
pub trait TemplateEngine: Send + Sync {
    fn render(&self, name: &str, data: &JsonValue) -> Result<Vec<u8>, TemplateError>;
}

/// MiniJinja environment holding owned template sources. Templates whose
/// name ends in `.html` are auto-escaped.
#[derive(Debug)]
pub struct MiniJinjaEngine {
    env: Environment<'static>,
}

impl Default for MiniJinjaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MiniJinjaEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            env: Environment::new(),
        }
    }

    /// Register a template from source.
    pub fn add_template(
        &mut self,
        name: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<(), TemplateError> {
        self.env.add_template_owned(name.into(), source.into())?;
        Ok(())
    }

    /// Load every file below `dir`, named by its `/`-separated path relative
    /// to `dir` (`pages/404.html`).
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let dir = dir.as_ref();
        let mut engine = Self::new();
        engine.load_dir(dir, dir)?;
        Ok(engine)
    }

    fn load_dir(&mut self, root: &Path, dir: &Path) -> Result<(), TemplateError> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                self.load_dir(root, &path)?;
                continue;
            }
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let source = fs::read_to_string(&path)?;
            debug!(template = %name, "loaded template");
            self.add_template(name, source)?;
        }
        Ok(())
    }
}

impl TemplateEngine for MiniJinjaEngine {
    fn render(&self, name: &str, data: &JsonValue) -> Result<Vec<u8>, TemplateError> {
        let tmpl = self.env.get_template(name)?;
        Ok(tmpl.render(data)?.into_bytes())
    }
}

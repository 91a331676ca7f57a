//! Router core: registration and lookup across the per-method trees.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use smallvec::SmallVec;
use tracing::{debug, info};

use super::error::RouterError;
use super::node::{MatchMiss, Node, PARAM_SIGIL};
use crate::handler::HandlerRef;

/// Maximum number of path parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Extracted path parameters in template order.
///
/// Names are `Arc<str>` cloned out of the route tree; values are copied from
/// the request path.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Result of matching a request path to a registered route.
#[derive(Clone)]
pub struct RouteMatch {
    /// Handler bound to the matched template
    pub handler: HandlerRef,
    /// Path parameters extracted from the request (e.g. `:id` → `"7"`)
    pub path_params: ParamVec,
    /// The registration template that matched (e.g. `/user/:id`)
    pub matched_path: Arc<str>,
}

impl RouteMatch {
    /// Get a path parameter by name
    ///
    /// # Arguments
    /// * `name` - The parameter name without the sigil (e.g. "id")
    ///
    /// # Returns
    /// The parameter value if found, None otherwise
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

impl std::fmt::Debug for RouteMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteMatch")
            .field("matched_path", &self.matched_path)
            .field("path_params", &self.path_params)
            .finish_non_exhaustive()
    }
}

/// Per-method routing trie.
///
/// Routes are registered during setup with `&mut self`; once the router is
/// frozen behind an `Arc` (see [`Dispatcher`](crate::Dispatcher)) lookups are
/// read-only and safe from any number of worker threads.
///
/// Templates are `/`-separated, start with `/`, and do not end with `/`
/// (except the root template `/` itself). A segment of the form `:name`
/// binds that request segment to `name`.
#[derive(Debug, Default)]
pub struct Router {
    trees: HashMap<Method, Node>,
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `method` and `pattern`.
    ///
    /// # Errors
    ///
    /// - [`RouterError::MalformedPath`] for an empty template, one missing the
    ///   leading `/`, one with a trailing `/` or an empty segment, or a
    ///   parameter segment with no name
    /// - [`RouterError::DuplicateRoute`] when the template already has a handler
    /// - [`RouterError::ParamConflict`] when a parameter segment's name differs
    ///   from the parameter already registered at that position
    pub fn add_route(
        &mut self,
        method: Method,
        pattern: &str,
        handler: HandlerRef,
    ) -> Result<(), RouterError> {
        validate_pattern(pattern)?;

        let root = self.trees.entry(method.clone()).or_insert_with(Node::root);
        let mut node = root;
        if pattern != "/" {
            for segment in pattern[1..].split('/') {
                node = match segment.strip_prefix(PARAM_SIGIL) {
                    Some(name) => node.param_child(name, pattern)?,
                    None => node.static_child(segment),
                };
            }
        }
        node.bind(&method, pattern, handler)?;

        info!(method = %method, path = %pattern, "route registered");
        Ok(())
    }

    /// Find the handler for a request.
    ///
    /// Surrounding slashes in `path` are ignored, so `/user/7/` matches
    /// `/user/:id`. At each segment a static child is preferred over the
    /// parameter child, and the choice is never revisited.
    pub fn lookup(&self, method: &Method, path: &str) -> Result<RouteMatch, MatchMiss> {
        let root = self.trees.get(method).ok_or(MatchMiss::NoMethod)?;
        let result = if path == "/" {
            root.to_match(ParamVec::new())
        } else {
            root.search(path.trim_matches('/').split('/'))
        };
        if let Err(miss) = &result {
            debug!(method = %method, path = %path, reason = ?miss, "no route matched");
        }
        result
    }

    /// [`lookup`](Self::lookup) without the miss reason.
    #[must_use]
    pub fn route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        self.lookup(method, path).ok()
    }

    /// Every registered `(method, template)` pair, ordered by method then
    /// template position in the tree.
    #[must_use]
    pub fn routes(&self) -> Vec<(Method, Arc<str>)> {
        let mut methods: Vec<&Method> = self.trees.keys().collect();
        methods.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        let mut out = Vec::new();
        for method in methods {
            let mut templates = Vec::new();
            if let Some(tree) = self.trees.get(method) {
                tree.collect_templates(&mut templates);
            }
            out.extend(templates.into_iter().map(|t| (method.clone(), t)));
        }
        out
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn tree(&self, method: &Method) -> Option<&Node> {
        self.trees.get(method)
    }
}

fn validate_pattern(pattern: &str) -> Result<(), RouterError> {
    let malformed = |reason: &'static str| RouterError::MalformedPath {
        pattern: pattern.to_string(),
        reason,
    };
    if pattern.is_empty() {
        return Err(malformed("path must not be empty"));
    }
    if !pattern.starts_with('/') {
        return Err(malformed("path must start with '/'"));
    }
    if pattern == "/" {
        return Ok(());
    }
    if pattern.ends_with('/') {
        return Err(malformed("path must not end with '/'"));
    }
    for segment in pattern[1..].split('/') {
        if segment.is_empty() {
            return Err(malformed("path must not contain empty segments"));
        }
        if segment == ":" {
            return Err(malformed("parameter segment needs a name after ':'"));
        }
    }
    Ok(())
}

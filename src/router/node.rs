//! Trie node for one HTTP method's route tree.
//!
//! Each node owns one path segment. Static children are keyed by their
//! literal text; at most one parameter child sits beside them, and the
//! parameter's name is fixed by the first route that creates it.
//!
//! Matching walks one request segment per level and makes a purely local
//! choice: a static child wins over the parameter child, and a static branch
//! that dead-ends further down is not retried through the parameter child.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;

use super::core::{ParamVec, RouteMatch};
use super::error::RouterError;
use crate::handler::HandlerRef;

/// Sigil that marks a parameter segment (`/user/:id`).
pub(crate) const PARAM_SIGIL: char = ':';

/// The single parameter slot of a node, keyed by the bound name.
pub(crate) struct ParamChild {
    pub(crate) name: Arc<str>,
    pub(crate) node: Box<Node>,
}

pub(crate) struct Node {
    /// Literal text, `:name` for parameter nodes, `/` for the root
    pub(crate) segment: String,
    pub(crate) children: HashMap<String, Node>,
    pub(crate) param_child: Option<ParamChild>,
    pub(crate) handler: Option<HandlerRef>,
    /// Full registration template, set together with `handler`
    pub(crate) template: Option<Arc<str>>,
}

/// Why a lookup produced no route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMiss {
    /// No route of any shape is registered for the request method
    NoMethod,
    /// A request segment matched neither a static child nor a parameter child
    NoPath,
    /// The walk consumed the path but stopped on a node without a handler
    NoHandler,
}

impl Node {
    pub(crate) fn root() -> Self {
        Self::with_segment("/".to_string())
    }

    fn with_segment(segment: String) -> Self {
        Self {
            segment,
            children: HashMap::new(),
            param_child: None,
            handler: None,
            template: None,
        }
    }

    /// Static child for `segment`, created on demand.
    pub(crate) fn static_child(&mut self, segment: &str) -> &mut Node {
        self.children
            .entry(segment.to_string())
            .or_insert_with(|| Node::with_segment(segment.to_string()))
    }

    /// The parameter child, created on demand with `name`. Fails when the
    /// slot already exists under another name.
    pub(crate) fn param_child(
        &mut self,
        name: &str,
        pattern: &str,
    ) -> Result<&mut Node, RouterError> {
        let slot = self.param_child.get_or_insert_with(|| ParamChild {
            name: Arc::from(name),
            node: Box::new(Node::with_segment(format!("{PARAM_SIGIL}{name}"))),
        });
        if slot.name.as_ref() != name {
            return Err(RouterError::ParamConflict {
                pattern: pattern.to_string(),
                existing: slot.name.to_string(),
                requested: name.to_string(),
            });
        }
        Ok(slot.node.as_mut())
    }

    /// Attach a handler to this node.
    pub(crate) fn bind(
        &mut self,
        method: &Method,
        pattern: &str,
        handler: HandlerRef,
    ) -> Result<(), RouterError> {
        if self.handler.is_some() {
            return Err(RouterError::DuplicateRoute {
                method: method.clone(),
                pattern: pattern.to_string(),
            });
        }
        self.handler = Some(handler);
        self.template = Some(Arc::from(pattern));
        Ok(())
    }

    /// Walk the request segments below this node.
    pub(crate) fn search<'s, I>(&self, segments: I) -> Result<RouteMatch, MatchMiss>
    where
        I: Iterator<Item = &'s str>,
    {
        let mut node = self;
        let mut params = ParamVec::new();
        for segment in segments {
            if let Some(child) = node.children.get(segment) {
                node = child;
                continue;
            }
            match &node.param_child {
                Some(param) => {
                    params.push((Arc::clone(&param.name), segment.to_string()));
                    node = param.node.as_ref();
                }
                None => return Err(MatchMiss::NoPath),
            }
        }
        node.to_match(params)
    }

    pub(crate) fn to_match(&self, path_params: ParamVec) -> Result<RouteMatch, MatchMiss> {
        match (&self.handler, &self.template) {
            (Some(handler), Some(template)) => Ok(RouteMatch {
                handler: Arc::clone(handler),
                path_params,
                matched_path: Arc::clone(template),
            }),
            _ => Err(MatchMiss::NoHandler),
        }
    }

    /// Depth-first list of bound templates below this node.
    pub(crate) fn collect_templates(&self, out: &mut Vec<Arc<str>>) {
        if let Some(template) = &self.template {
            out.push(Arc::clone(template));
        }
        let mut keys: Vec<&String> = self.children.keys().collect();
        keys.sort();
        for key in keys {
            if let Some(child) = self.children.get(key) {
                child.collect_templates(out);
            }
        }
        if let Some(param) = &self.param_child {
            param.node.collect_templates(out);
        }
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("segment", &self.segment)
            .field("template", &self.template)
            .field("children", &self.children)
            .field("param_child", &self.param_child.as_ref().map(|p| &p.node))
            .finish()
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use crate::handler::{handler, middleware, HandlerRef, MiddlewareRef};

/// Content type sent with pages registered through `add_code`.
pub const DEFAULT_PAGE_CONTENT_TYPE: &str = "text/html; charset=utf-8";

#[derive(Debug, Clone)]
struct Page {
    content_type: String,
    body: Vec<u8>,
}

/// Builds a middleware that swaps the buffered body for a fixed page when
/// the inner chain leaves a matching status. The page's `Content-Type`
/// replaces whatever the inner handler set.
///
/// ```rust,ignore
/// let pages = ErrorPageBuilder::new()
///     .add_code(404, "<h1>Nothing here</h1>")
///     .add_code_with_type(500, "application/json", r#"{"error":"internal"}"#)
///     .build();
/// ```
#[derive(Debug, Clone, Default)]
pub struct ErrorPageBuilder {
    pages: HashMap<u16, Page>,
}

impl ErrorPageBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// HTML replacement body for `status`. A later call for the same status wins.
    #[must_use]
    pub fn add_code(self, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.add_code_with_type(status, DEFAULT_PAGE_CONTENT_TYPE, body)
    }

    #[must_use]
    pub fn add_code_with_type(
        mut self,
        status: u16,
        content_type: &str,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        self.pages.insert(
            status,
            Page {
                content_type: content_type.to_string(),
                body: body.into(),
            },
        );
        self
    }

    #[must_use]
    pub fn build(self) -> MiddlewareRef {
        let pages = Arc::new(self.pages);
        middleware(move |next: HandlerRef| {
            let pages = Arc::clone(&pages);
            handler(move |ctx| {
                next.handle(ctx);
                if let Some(page) = pages.get(&ctx.status) {
                    ctx.set_header("Content-Type", &page.content_type);
                    ctx.resp_data.clone_from(&page.body);
                }
            })
        })
    }
}

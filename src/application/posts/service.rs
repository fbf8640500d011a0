use std::sync::Arc;

use crate::application::categories::CategoryDirectory;
use crate::application::repos::{PostsRepo, PostsWriteRepo};
use crate::application::sanitize::HtmlSanitizer;
use crate::cache::CacheLayer;

/// Author-facing post operations: validation, sanitisation, status transitions
/// and cache invalidation around the post repositories.
#[derive(Clone)]
pub struct PostPublisher {
    pub(crate) reader: Arc<dyn PostsRepo>,
    pub(crate) writer: Arc<dyn PostsWriteRepo>,
    pub(crate) categories: CategoryDirectory,
    pub(crate) sanitizer: Arc<HtmlSanitizer>,
    pub(crate) cache: CacheLayer,
}

impl PostPublisher {
    pub fn new(
        reader: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        categories: CategoryDirectory,
        sanitizer: Arc<HtmlSanitizer>,
        cache: CacheLayer,
    ) -> Self {
        Self {
            reader,
            writer,
            categories,
            sanitizer,
            cache,
        }
    }
}

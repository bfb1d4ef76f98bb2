//! Per-page OCR with cache write-through

use std::sync::Arc;

use crate::cache::PageCache;
use crate::error::{Error, Result};
use crate::providers::OcrModel;

use super::markdown::strip_markdown;
use super::render::PdfPages;

/// Runs the OCR model on single pages and records the results
pub struct PageExtractor {
    model: Arc<dyn OcrModel>,
    cache: PageCache,
    resolution: u32,
}

impl PageExtractor {
    /// Create an extractor
    pub fn new(model: Arc<dyn OcrModel>, cache: PageCache, resolution: u32) -> Self {
        Self {
            model,
            cache,
            resolution,
        }
    }

    /// OCR one page and store it under `(hash, page_number)`.
    ///
    /// Returns the cached value, which is the stored text unless another
    /// writer got there first.
    pub async fn extract_page(&self, hash: &str, pages: Arc<PdfPages>, page_number: u32) -> Result<String> {
        let resolution = self.resolution;
        let rendered = tokio::task::spawn_blocking(move || pages.render(page_number, resolution))
            .await
            .map_err(|e| Error::internal(format!("Page render task failed: {}", e)))??;

        tracing::debug!(
            "OCR page {} ({} bytes) via {}",
            page_number,
            rendered.data.len(),
            self.model.name()
        );
        let markup = self.model.recognize(&rendered).await?;
        let text = strip_markdown(&markup);
        if text.is_empty() {
            tracing::debug!("Page {} came back blank", page_number);
        }

        self.cache.store(hash, page_number, &text).await
    }
}

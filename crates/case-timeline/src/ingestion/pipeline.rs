//! Text extraction pipeline
//!
//! PDFs go through page-level OCR backed by the content-addressed cache.
//! If OCR fails anywhere, or yields only blank pages, the whole document is
//! re-read from its text layer instead. DOCX files are always read locally.

use dashmap::DashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};

use crate::cache::{content_hash, PageCache};
use crate::error::{Error, Result};
use crate::ocr::{PageExtractor, PdfPages};
use crate::types::{DocumentType, ExtractionMethod};

use super::parser::FileParser;

/// 1-based inclusive page window; open ends mean "first" and "last"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageRange {
    /// First page, defaults to 1
    pub start: Option<u32>,
    /// Last page, defaults to the page count
    pub end: Option<u32>,
}

impl PageRange {
    /// Every page of the document
    pub fn full() -> Self {
        Self::default()
    }

    /// Window from optional bounds
    pub fn new(start: Option<u32>, end: Option<u32>) -> Self {
        Self { start, end }
    }

    /// Page numbers to process. `end` past the last page is clamped.
    pub fn resolve(&self, page_count: u32) -> Result<Vec<u32>> {
        let start = self.start.unwrap_or(1);
        let end = self.end.unwrap_or(page_count).min(page_count);

        if start == 0 {
            return Err(Error::InvalidPageRange("pages are numbered from 1".to_string()));
        }
        if start > end {
            return Err(Error::InvalidPageRange(format!(
                "start {} is past end {} ({} pages)",
                start, end, page_count
            )));
        }
        Ok((start..=end).collect())
    }
}

/// Result of extracting one file
#[derive(Debug, Clone)]
pub struct ExtractedText {
    /// Plain text
    pub text: String,
    /// How the text was obtained
    pub method: ExtractionMethod,
    /// SHA-256 of the file bytes
    pub content_hash: String,
    /// Page count for PDFs
    pub page_count: Option<u32>,
    /// Pages covered by `text`
    pub pages_processed: usize,
}

/// OCR outcome for a page window
#[derive(Debug, Clone)]
pub struct OcrOutput {
    /// Page texts joined by blank lines
    pub text: String,
    /// SHA-256 of the file bytes
    pub content_hash: String,
    /// Pages in the document
    pub page_count: u32,
    /// Pages in the window
    pub pages_processed: usize,
    /// Pages served from cache
    pub cache_hits: usize,
    /// Pages sent to the model
    pub ocr_calls: usize,
}

/// Turns uploaded files into text
pub struct ExtractionPipeline {
    cache: PageCache,
    extractor: Option<PageExtractor>,
    page_permits: Arc<Semaphore>,
    hash_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ExtractionPipeline {
    /// Create a pipeline; `extractor` is `None` when OCR is disabled
    pub fn new(cache: PageCache, extractor: Option<PageExtractor>, max_concurrent_pages: usize) -> Self {
        Self {
            cache,
            extractor,
            page_permits: Arc::new(Semaphore::new(max_concurrent_pages.max(1))),
            hash_locks: DashMap::new(),
        }
    }

    /// Page cache in use
    pub fn cache(&self) -> &PageCache {
        &self.cache
    }

    /// Whether PDFs are sent through OCR
    pub fn ocr_enabled(&self) -> bool {
        self.extractor.is_some()
    }

    /// Extract every page of a stored file
    pub async fn extract(&self, path: &Path) -> Result<ExtractedText> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let document_type = DocumentType::from_filename(&filename)
            .ok_or_else(|| Error::UnsupportedFileType(filename.clone()))?;
        let data = tokio::fs::read(path).await?;

        self.extract_bytes(&filename, document_type, &data).await
    }

    /// OCR a page window of a stored PDF. There is no text-layer fallback
    /// for windows; an all-blank window is `EmptyText`.
    pub async fn extract_range(&self, path: &Path, range: PageRange) -> Result<OcrOutput> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if DocumentType::from_filename(&filename) != Some(DocumentType::Pdf) {
            return Err(Error::UnsupportedFileType(format!(
                "{} (page windows apply to PDFs only)",
                filename
            )));
        }
        let data = tokio::fs::read(path).await?;

        let out = self.ocr_pages(&filename, &data, range).await?;
        if out.text.trim().is_empty() {
            return Err(Error::EmptyText(filename));
        }
        Ok(out)
    }

    /// Extract every page of an in-memory file
    pub async fn extract_bytes(
        &self,
        filename: &str,
        document_type: DocumentType,
        data: &[u8],
    ) -> Result<ExtractedText> {
        match document_type {
            DocumentType::Docx => {
                let content_hash = content_hash(data);
                let text = self.parse_locally(filename, document_type, data).await?;
                Ok(ExtractedText {
                    text,
                    method: ExtractionMethod::Docx,
                    content_hash,
                    page_count: None,
                    pages_processed: 1,
                })
            }
            DocumentType::Pdf => self.extract_pdf(filename, data).await,
        }
    }

    async fn extract_pdf(&self, filename: &str, data: &[u8]) -> Result<ExtractedText> {
        if self.extractor.is_some() {
            match self.ocr_pages(filename, data, PageRange::full()).await {
                Ok(out) if !out.text.trim().is_empty() => {
                    tracing::info!(
                        "OCR'd '{}': {} pages, {} from cache",
                        filename,
                        out.pages_processed,
                        out.cache_hits
                    );
                    return Ok(ExtractedText {
                        text: out.text,
                        method: ExtractionMethod::Ocr,
                        content_hash: out.content_hash,
                        page_count: Some(out.page_count),
                        pages_processed: out.pages_processed,
                    });
                }
                Ok(_) => {
                    tracing::warn!("OCR found no text in '{}', using text layer", filename);
                }
                Err(e) => {
                    tracing::warn!("OCR failed for '{}': {}, using text layer", filename, e);
                }
            }
        }

        let text = self.parse_locally(filename, DocumentType::Pdf, data).await?;
        let page_count = FileParser::pdf_page_count(data);
        Ok(ExtractedText {
            text,
            method: ExtractionMethod::TextLayer,
            content_hash: content_hash(data),
            page_count,
            pages_processed: page_count.unwrap_or(1) as usize,
        })
    }

    /// OCR a page window, serving cached pages without calling the model.
    ///
    /// Runs for one content hash at a time. The whole-document entry is
    /// consulted and written only when the window covers every page.
    pub async fn ocr_pages(&self, filename: &str, data: &[u8], range: PageRange) -> Result<OcrOutput> {
        let extractor = self
            .extractor
            .as_ref()
            .ok_or_else(|| Error::ocr("OCR is disabled"))?;

        let hash = content_hash(data);
        let lock = self
            .hash_locks
            .entry(hash.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = {
            let _guard = lock.lock().await;
            self.ocr_pages_locked(extractor, hash.clone(), filename, data, range)
                .await
        };

        // Forget the lock once no other extraction of this hash holds or waits on it
        drop(lock);
        self.hash_locks
            .remove_if(&hash, |_, lock| Arc::strong_count(lock) == 1);

        result
    }

    async fn ocr_pages_locked(
        &self,
        extractor: &PageExtractor,
        hash: String,
        filename: &str,
        data: &[u8],
        range: PageRange,
    ) -> Result<OcrOutput> {
        let pdf = {
            let filename = filename.to_string();
            let data = data.to_vec();
            tokio::task::spawn_blocking(move || PdfPages::load(&filename, &data))
                .await
                .map_err(|e| Error::internal(format!("PDF load task failed: {}", e)))??
        };
        let page_count = pdf.page_count();
        let pages = range.resolve(page_count)?;
        let full = pages.len() as u32 == page_count;

        if full {
            if let Some(text) = self.cache.lookup_document(&hash).await? {
                tracing::debug!("Whole-document cache hit for {}", hash);
                return Ok(OcrOutput {
                    text,
                    content_hash: hash,
                    page_count,
                    pages_processed: pages.len(),
                    cache_hits: pages.len(),
                    ocr_calls: 0,
                });
            }
        }

        let pdf = Arc::new(pdf);
        let mut texts = Vec::with_capacity(pages.len());
        let mut cache_hits = 0;
        let mut ocr_calls = 0;

        for &page in &pages {
            if let Some(text) = self.cache.lookup(&hash, page).await? {
                cache_hits += 1;
                texts.push(text);
                continue;
            }

            let _permit = self
                .page_permits
                .acquire()
                .await
                .map_err(|_| Error::internal("OCR page semaphore closed"))?;
            ocr_calls += 1;
            texts.push(extractor.extract_page(&hash, Arc::clone(&pdf), page).await?);
        }

        let text = texts.join("\n\n");
        if full {
            self.cache.store_document(&hash, &text).await?;
        }

        Ok(OcrOutput {
            text,
            content_hash: hash,
            page_count,
            pages_processed: pages.len(),
            cache_hits,
            ocr_calls,
        })
    }

    async fn parse_locally(&self, filename: &str, document_type: DocumentType, data: &[u8]) -> Result<String> {
        let name = filename.to_string();
        let bytes = data.to_vec();
        let text = tokio::task::spawn_blocking(move || FileParser::extract_text(&name, document_type, &bytes))
            .await
            .map_err(|e| Error::internal(format!("Parse task failed: {}", e)))??;

        if text.trim().is_empty() {
            return Err(Error::EmptyText(filename.to_string()));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::RenderedPage;
    use crate::providers::OcrModel;
    use crate::testing::{sample_docx, sample_pdf};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingModel {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingModel {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl OcrModel for CountingModel {
        async fn recognize(&self, page: &RenderedPage) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::ocr("model offline"));
            }
            Ok(format!("# OCR page {}", page.page_number))
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    async fn pipeline_with(model: Arc<CountingModel>, dir: &Path) -> ExtractionPipeline {
        let cache = PageCache::open(dir).await.unwrap();
        let extractor = PageExtractor::new(model, cache.clone(), 200);
        ExtractionPipeline::new(cache, Some(extractor), 2)
    }

    #[test]
    fn test_page_range_resolve() {
        assert_eq!(PageRange::full().resolve(3).unwrap(), vec![1, 2, 3]);
        assert_eq!(PageRange::new(Some(2), None).resolve(3).unwrap(), vec![2, 3]);
        assert_eq!(PageRange::new(Some(2), Some(9)).resolve(3).unwrap(), vec![2, 3]);
        assert!(PageRange::new(Some(0), Some(2)).resolve(3).is_err());
        assert!(PageRange::new(Some(4), None).resolve(3).is_err());
    }

    #[tokio::test]
    async fn test_ocr_then_cache_hits() {
        let dir = tempfile::tempdir().unwrap();
        let model = CountingModel::new(false);
        let pipeline = pipeline_with(model.clone(), dir.path()).await;
        let pdf = sample_pdf(&["a", "b"]);

        let first = pipeline.extract_bytes("two.pdf", DocumentType::Pdf, &pdf).await.unwrap();
        assert_eq!(first.text, "OCR page 1\n\nOCR page 2");
        assert_eq!(first.method, ExtractionMethod::Ocr);
        assert_eq!(first.page_count, Some(2));
        assert_eq!(model.calls(), 2);

        let second = pipeline.extract_bytes("copy.pdf", DocumentType::Pdf, &pdf).await.unwrap();
        assert_eq!(second.text, first.text);
        assert_eq!(model.calls(), 2);

        let hash = content_hash(&pdf);
        assert!(pipeline.cache().lookup_document(&hash).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_partial_range_uses_page_cache_only() {
        let dir = tempfile::tempdir().unwrap();
        let model = CountingModel::new(false);
        let pipeline = pipeline_with(model.clone(), dir.path()).await;
        let pdf = sample_pdf(&["a", "b", "c"]);
        let hash = content_hash(&pdf);

        pipeline.cache().store(&hash, 2, "cached two").await.unwrap();
        let out = pipeline
            .ocr_pages("three.pdf", &pdf, PageRange::new(Some(2), Some(3)))
            .await
            .unwrap();

        assert_eq!(out.text, "cached two\n\nOCR page 3");
        assert_eq!(out.pages_processed, 2);
        assert_eq!(out.cache_hits, 1);
        assert_eq!(out.ocr_calls, 1);
        assert_eq!(model.calls(), 1);
        assert_eq!(pipeline.cache().lookup_document(&hash).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_ocr_failure_falls_back_to_text_layer() {
        let dir = tempfile::tempdir().unwrap();
        let model = CountingModel::new(true);
        let pipeline = pipeline_with(model.clone(), dir.path()).await;
        let pdf = sample_pdf(&["Hearing set for 2022-05-10"]);

        let out = pipeline.extract_bytes("order.pdf", DocumentType::Pdf, &pdf).await.unwrap();
        assert_eq!(out.method, ExtractionMethod::TextLayer);
        assert!(out.text.contains("Hearing set for 2022-05-10"));
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_no_text_anywhere_is_empty_text() {
        let dir = tempfile::tempdir().unwrap();
        let model = CountingModel::new(true);
        let pipeline = pipeline_with(model, dir.path()).await;
        let pdf = sample_pdf(&[""]);

        let err = pipeline.extract_bytes("scan.pdf", DocumentType::Pdf, &pdf).await.unwrap_err();
        assert!(matches!(err, Error::EmptyText(name) if name == "scan.pdf"));
    }

    #[tokio::test]
    async fn test_docx_skips_ocr() {
        let dir = tempfile::tempdir().unwrap();
        let model = CountingModel::new(false);
        let pipeline = pipeline_with(model.clone(), dir.path()).await;
        let docx = sample_docx(&["Lease executed 2019-07-01."]);

        let out = pipeline.extract_bytes("lease.docx", DocumentType::Docx, &docx).await.unwrap();
        assert_eq!(out.method, ExtractionMethod::Docx);
        assert_eq!(out.text, "Lease executed 2019-07-01.");
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_extract_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = ExtractionPipeline::new(PageCache::open(dir.path().join("cache")).await.unwrap(), None, 1);
        let path = dir.path().join("17-notice.pdf");
        tokio::fs::write(&path, sample_pdf(&["Notice served 2023-01-09"])).await.unwrap();

        let out = pipeline.extract(&path).await.unwrap();
        assert_eq!(out.method, ExtractionMethod::TextLayer);
        assert!(out.text.contains("Notice served"));

        let bad = dir.path().join("notes.txt");
        tokio::fs::write(&bad, "hi").await.unwrap();
        assert!(matches!(pipeline.extract(&bad).await, Err(Error::UnsupportedFileType(_))));
    }

    #[tokio::test]
    async fn test_hash_locks_are_released() {
        let dir = tempfile::tempdir().unwrap();
        let model = CountingModel::new(false);
        let pipeline = pipeline_with(model.clone(), dir.path()).await;

        for i in 0..5 {
            let pdf = sample_pdf(&[&format!("document {}", i)]);
            pipeline.extract_bytes("doc.pdf", DocumentType::Pdf, &pdf).await.unwrap();
        }
        assert_eq!(model.calls(), 5);
        assert!(pipeline.hash_locks.is_empty());

        let failing = pipeline_with(CountingModel::new(true), &dir.path().join("other")).await;
        let pdf = sample_pdf(&["text layer"]);
        failing.extract_bytes("doc.pdf", DocumentType::Pdf, &pdf).await.unwrap();
        assert!(failing.hash_locks.is_empty());
    }

    #[tokio::test]
    async fn test_extract_range_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let model = CountingModel::new(false);
        let pipeline = pipeline_with(model.clone(), &dir.path().join("cache")).await;
        let path = dir.path().join("exhibits.pdf");
        tokio::fs::write(&path, sample_pdf(&["a", "b", "c"])).await.unwrap();

        let out = pipeline
            .extract_range(&path, PageRange::new(Some(3), None))
            .await
            .unwrap();
        assert_eq!(out.text, "OCR page 3");
        assert_eq!(out.page_count, 3);
        assert_eq!(model.calls(), 1);

        let docx = dir.path().join("memo.docx");
        tokio::fs::write(&docx, sample_docx(&["memo"])).await.unwrap();
        assert!(matches!(
            pipeline.extract_range(&docx, PageRange::full()).await,
            Err(Error::UnsupportedFileType(_))
        ));
    }
}

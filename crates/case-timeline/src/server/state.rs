//! Application state for the timeline server

use parking_lot::RwLock;
use std::sync::Arc;

use crate::cache::PageCache;
use crate::config::TimelineConfig;
use crate::error::Result;
use crate::generation::ChatResponder;
use crate::ingestion::ExtractionPipeline;
use crate::ocr::PageExtractor;
use crate::providers::{HttpLlmClient, HttpOcrModel, LlmClient, OcrModel};
use crate::timeline::{EventExtractor, TimelineStore};
use crate::types::{Document, DocumentId, DocumentIdGenerator, TimelineEvent};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: TimelineConfig,
    /// Uploaded documents in upload order
    documents: RwLock<Vec<Document>>,
    /// Ordered events of every document
    timeline: TimelineStore,
    /// Document id source
    ids: DocumentIdGenerator,
    /// OCR / local text extraction
    pipeline: ExtractionPipeline,
    /// LLM event extraction
    events: EventExtractor,
    /// Timeline chat
    chat: ChatResponder,
}

impl AppState {
    /// Create state backed by the configured HTTP model endpoints
    pub async fn new(config: TimelineConfig) -> Result<Self> {
        let llm: Arc<dyn LlmClient> = Arc::new(HttpLlmClient::new(&config.llm)?);
        tracing::info!("LLM endpoint: {}", config.llm.endpoint);

        let ocr: Option<Arc<dyn OcrModel>> = if config.ocr.enabled {
            tracing::info!("OCR model: {}", config.ocr.model_url);
            Some(Arc::new(HttpOcrModel::new(&config.ocr)?))
        } else {
            tracing::info!("OCR disabled, PDFs use their text layer");
            None
        };

        Self::with_providers(config, llm, ocr).await
    }

    /// Create state with explicit model providers
    pub async fn with_providers(
        config: TimelineConfig,
        llm: Arc<dyn LlmClient>,
        ocr: Option<Arc<dyn OcrModel>>,
    ) -> Result<Self> {
        tokio::fs::create_dir_all(&config.upload.upload_dir).await?;

        let cache = PageCache::open(&config.cache.root).await?;
        tracing::info!("Page cache at {}", cache.root().display());

        let extractor = ocr.map(|model| PageExtractor::new(model, cache.clone(), config.ocr.resolution));
        let pipeline = ExtractionPipeline::new(cache, extractor, config.ocr.max_concurrent_pages);

        let events = EventExtractor::new(Arc::clone(&llm), config.llm.n_predict);
        let chat = ChatResponder::new(llm, config.llm.chat_n_predict);
        let timeline = TimelineStore::new(config.timeline.ordering);
        tracing::info!("Timeline ordering: {}", timeline.ordering());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                documents: RwLock::new(Vec::new()),
                timeline,
                ids: DocumentIdGenerator::new(),
                pipeline,
                events,
                chat,
            }),
        })
    }

    /// Get configuration
    pub fn config(&self) -> &TimelineConfig {
        &self.inner.config
    }

    /// Get extraction pipeline
    pub fn pipeline(&self) -> &ExtractionPipeline {
        &self.inner.pipeline
    }

    /// Get event extractor
    pub fn event_extractor(&self) -> &EventExtractor {
        &self.inner.events
    }

    /// Get chat responder
    pub fn chat(&self) -> &ChatResponder {
        &self.inner.chat
    }

    /// Get timeline
    pub fn timeline(&self) -> &TimelineStore {
        &self.inner.timeline
    }

    /// Allocate a document id
    pub fn next_document_id(&self) -> DocumentId {
        self.inner.ids.next_id()
    }

    /// All documents in upload order
    pub fn list_documents(&self) -> Vec<Document> {
        self.inner.documents.read().clone()
    }

    /// Get a document by id
    pub fn get_document(&self, id: DocumentId) -> Option<Document> {
        self.inner.documents.read().iter().find(|d| d.id == id).cloned()
    }

    /// Number of documents
    pub fn document_count(&self) -> usize {
        self.inner.documents.read().len()
    }

    /// Publish a processed batch. Documents and their events become visible
    /// together: the document list stays write-locked until the events are in.
    pub fn commit_batch(&self, documents: Vec<Document>, events: Vec<TimelineEvent>) {
        let mut guard = self.inner.documents.write();
        let added = documents.len();
        guard.extend(documents);
        let total_events = self.inner.timeline.append(events);
        tracing::info!(
            "Committed {} documents ({} total), timeline has {} events",
            added,
            guard.len(),
            total_events
        );
    }
}

//! case-timeline: legal document timeline assistant
//!
//! Uploaded PDF and DOCX case documents are turned into text (page-level OCR
//! backed by a content-addressed cache, with a text-layer fallback), dated
//! events are extracted from that text by an LLM, and the resulting ordered
//! timeline can be queried in natural language.
//!
//! Two services are built from this crate: the timeline backend
//! ([`TimelineServer`]) and the OCR page service ([`OcrServer`]).

pub mod cache;
pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod ocr;
pub mod ocr_server;
pub mod providers;
pub mod server;
pub mod timeline;
pub mod types;

#[cfg(test)]
mod testing;

pub use cache::PageCache;
pub use config::TimelineConfig;
pub use error::{Error, Result};
pub use ingestion::{ExtractionPipeline, PageRange};
pub use ocr_server::OcrServer;
pub use server::{state::AppState, TimelineServer};
pub use timeline::{EventExtraction, TimelineStore};
pub use types::{
    document::{Document, DocumentId, DocumentType},
    event::TimelineEvent,
};

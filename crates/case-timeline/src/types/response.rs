//! Request and response bodies for both HTTP services

use serde::{Deserialize, Serialize};

use crate::cache::PageCacheStats;

use super::document::Document;
use super::event::TimelineEvent;

/// Response for a successful upload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Human-readable outcome
    pub message: String,
    /// Documents committed by this upload
    pub documents: Vec<Document>,
    /// Events extracted from those documents
    pub events: Vec<TimelineEvent>,
    /// Files that were rejected (best-effort batches only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<UploadFailure>,
    /// Documents whose event extraction failed (as opposed to finding no dates)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_extraction_failures: Vec<EventExtractionFailure>,
}

/// A file rejected during upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadFailure {
    /// Filename that failed
    pub filename: String,
    /// Error message
    pub error: String,
}

/// A document whose LLM event extraction failed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventExtractionFailure {
    /// Document name
    pub document_name: String,
    /// Why extraction failed
    pub reason: String,
}

/// Chat request body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's question
    #[serde(default)]
    pub message: Option<String>,
}

/// Chat response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The assistant's answer
    pub response: String,
}

/// OCR service `/parse` response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ParseResponse {
    /// Pages were converted
    Success {
        /// Concatenated page text
        text: String,
        /// Number of pages in the processed range
        pages_processed: usize,
    },
    /// The request was rejected
    Error {
        /// Reason
        message: String,
    },
}

/// OCR service status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatus {
    /// Always "ok" when the service answers
    pub status: String,
    /// Human-readable status
    pub message: String,
    /// Page cache statistics, when the cache directory is readable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<PageCacheStats>,
}

//! Core types for the timeline services

pub mod document;
pub mod event;
pub mod response;

pub use document::{Document, DocumentId, DocumentIdGenerator, DocumentType, ExtractionMethod};
pub use event::TimelineEvent;
pub use response::{ChatRequest, ChatResponse, ParseResponse, UploadFailure, UploadResponse};

//! Error types for the timeline services

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for timeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Timeline service errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// No files were attached to an upload request
    #[error("No files uploaded")]
    NoFiles,

    /// A required request field is missing or empty
    #[error("Missing field: {0}")]
    MissingField(String),

    /// Malformed or over-limit upload request
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    /// Request body exceeds the configured limit
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Unsupported file type
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// File parsing error
    #[error("Failed to parse file '{filename}': {message}")]
    FileParse { filename: String, message: String },

    /// Requested page window does not fit the document
    #[error("Invalid page range: {0}")]
    InvalidPageRange(String),

    /// Neither OCR nor the local parser produced any text
    #[error("There was no text in '{0}'")]
    EmptyText(String),

    /// OCR model error
    #[error("OCR error: {0}")]
    Ocr(String),

    /// LLM endpoint error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Document not found
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a file parse error
    pub fn file_parse(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileParse {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create an OCR error
    pub fn ocr(message: impl Into<String>) -> Self {
        Self::Ocr(message.into())
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Classify a multipart read failure
    pub fn multipart(err: axum::extract::multipart::MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(err.body_text())
        } else {
            Self::InvalidUpload(err.body_text())
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// HTTP status and machine-readable type for this error
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            Error::NoFiles => (StatusCode::BAD_REQUEST, "no_files"),
            Error::MissingField(_) => (StatusCode::BAD_REQUEST, "missing_field"),
            Error::InvalidUpload(_) => (StatusCode::BAD_REQUEST, "invalid_upload"),
            Error::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
            Error::UnsupportedFileType(_) => (StatusCode::BAD_REQUEST, "unsupported_type"),
            Error::FileParse { .. } => (StatusCode::BAD_REQUEST, "parse_error"),
            Error::InvalidPageRange(_) => (StatusCode::BAD_REQUEST, "invalid_page_range"),
            Error::EmptyText(_) => (StatusCode::BAD_REQUEST, "empty_text"),
            Error::Ocr(_) => (StatusCode::BAD_GATEWAY, "ocr_error"),
            Error::Llm(_) => (StatusCode::SERVICE_UNAVAILABLE, "llm_error"),
            Error::DocumentNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            Error::Json(_) => (StatusCode::BAD_REQUEST, "json_error"),
            Error::Http(_) => (StatusCode::BAD_GATEWAY, "http_error"),
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }

    /// User-facing summary used as the top-level `message`
    fn summary(&self) -> String {
        match self {
            Error::NoFiles => "No files uploaded".to_string(),
            Error::MissingField(field) if field == "message" => "No message provided".to_string(),
            Error::EmptyText(_) => {
                "There was no text in one of the files that was uploaded".to_string()
            }
            Error::DocumentNotFound(_) => "Document not found".to_string(),
            Error::Llm(_) | Error::Http(_) => "Error processing request".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status();

        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::warn!("{}", self);
        }

        let body = Json(json!({
            "message": self.summary(),
            "error": {
                "type": error_type,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

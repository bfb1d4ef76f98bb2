//! Uploaded document types

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

/// MIME type of PDF uploads
pub const PDF_MIME: &str = "application/pdf";
/// MIME type of DOCX uploads
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Supported upload types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    /// PDF document
    Pdf,
    /// Microsoft Word document (.docx)
    Docx,
}

impl DocumentType {
    /// Detect document type from the MIME type guessed from a filename
    pub fn from_filename(filename: &str) -> Option<Self> {
        mime_guess::from_path(filename)
            .iter_raw()
            .find_map(Self::from_mime)
    }

    /// Map a MIME type onto a supported document type
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            PDF_MIME => Some(Self::Pdf),
            DOCX_MIME => Some(Self::Docx),
            _ => None,
        }
    }
}

/// How the text of a document was obtained
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Page-level OCR (possibly fully served from the page cache)
    Ocr,
    /// Local PDF text-layer extraction
    TextLayer,
    /// Direct DOCX text extraction
    Docx,
}

/// Time-based document identifier, strictly increasing within a process
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentId(u64);

impl DocumentId {
    /// Wrap a raw value
    pub const fn new(value: u64) -> Self {
        Self(value)
    }
}

impl From<u64> for DocumentId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for DocumentId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

// Ids travel as strings, as the web client expects
impl Serialize for DocumentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DocumentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Generates millisecond-timestamp ids that never repeat or go backwards
#[derive(Debug, Default)]
pub struct DocumentIdGenerator {
    last: AtomicU64,
}

impl DocumentIdGenerator {
    /// Create a new generator
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id: the current time in ms, bumped past the previous id if needed
    pub fn next_id(&self) -> DocumentId {
        let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last + 1);
            match self.last.compare_exchange_weak(
                last,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return DocumentId(candidate),
                Err(actual) => last = actual,
            }
        }
    }
}

/// An uploaded document with its extracted text
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Unique document ID
    pub id: DocumentId,
    /// Original filename as uploaded by the user
    pub name: String,
    /// Where the uploaded file is stored
    pub path: PathBuf,
    /// Document type
    #[serde(rename = "type")]
    pub document_type: DocumentType,
    /// Upload timestamp
    pub upload_date: chrono::DateTime<chrono::Utc>,
    /// Full extracted text
    pub text: String,
    /// SHA-256 of the uploaded bytes
    pub content_hash: String,
    /// Number of pages (PDF only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    /// How the text was extracted
    pub extraction_method: ExtractionMethod,
}

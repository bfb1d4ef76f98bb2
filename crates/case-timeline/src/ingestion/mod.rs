//! Document text extraction: OCR with cache, local parsing as fallback

mod parser;
mod pipeline;

pub use parser::FileParser;
pub use pipeline::{ExtractedText, ExtractionPipeline, OcrOutput, PageRange};

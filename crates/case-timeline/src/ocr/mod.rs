//! Page-level OCR: split a PDF into pages, recognize each, cache the text

mod extractor;
mod markdown;
mod render;

pub use extractor::PageExtractor;
pub use markdown::strip_markdown;
pub use render::{PdfPages, RenderedPage, PAGE_MIME};

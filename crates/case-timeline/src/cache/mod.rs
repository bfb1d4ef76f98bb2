//! Content-addressed OCR page cache

mod page_cache;

pub use page_cache::{content_hash, PageCache, PageCacheStats};

//! Timeline: event extraction, date normalization, ordered storage

mod date;
mod extractor;
mod store;

pub use date::{DateKey, DateOrdering};
pub use extractor::{parse_events, EventExtraction, EventExtractor};
pub use store::TimelineStore;

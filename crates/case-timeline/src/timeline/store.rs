//! In-memory timeline
//!
//! Events are appended in batches and the collection is re-sorted on every
//! write, so readers always get an ordered snapshot. The sort is stable:
//! events with equal dates keep their insertion order.

use parking_lot::RwLock;

use crate::types::TimelineEvent;

use super::date::{DateKey, DateOrdering};

/// Ordered collection of every extracted event
#[derive(Debug, Default)]
pub struct TimelineStore {
    events: RwLock<Vec<TimelineEvent>>,
    ordering: DateOrdering,
}

impl TimelineStore {
    /// Create an empty store
    pub fn new(ordering: DateOrdering) -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            ordering,
        }
    }

    /// Ordering in use
    pub fn ordering(&self) -> DateOrdering {
        self.ordering
    }

    /// Append events and restore order; returns the new total
    pub fn append(&self, events: Vec<TimelineEvent>) -> usize {
        let mut guard = self.events.write();
        if events.is_empty() {
            return guard.len();
        }

        guard.extend(events);
        match self.ordering {
            DateOrdering::Chronological => guard.sort_by_cached_key(|e| DateKey::parse(&e.date)),
            DateOrdering::Lexical => guard.sort_by(|a, b| a.date.cmp(&b.date)),
        }
        guard.len()
    }

    /// Snapshot of all events in timeline order
    pub fn all(&self) -> Vec<TimelineEvent> {
        self.events.read().clone()
    }

    /// Number of events
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Whether the timeline has no events
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DocumentId;

    fn event(date: &str, summary: &str, doc: u64) -> TimelineEvent {
        TimelineEvent::new(date, summary, "", DocumentId::from(doc), format!("doc-{}.pdf", doc))
    }

    fn dates(store: &TimelineStore) -> Vec<String> {
        store.all().into_iter().map(|e| e.date).collect()
    }

    #[test]
    fn test_append_counts() {
        let store = TimelineStore::default();
        assert!(store.is_empty());
        assert_eq!(store.append(vec![event("2021-01-01", "a", 1), event("2020-01-01", "b", 1)]), 2);
        assert_eq!(store.append(Vec::new()), 2);
        assert_eq!(store.append(vec![event("2022-01-01", "c", 2)]), 3);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_chronological_order() {
        let store = TimelineStore::new(DateOrdering::Chronological);
        store.append(vec![
            event("unknown", "u", 1),
            event("03/04/2021", "us format", 1),
            event("2020-12-01", "iso", 1),
            event("06-01", "yearless", 1),
            event("2021", "year", 1),
        ]);
        assert_eq!(
            dates(&store),
            vec!["2020-12-01", "2021", "03/04/2021", "06-01", "unknown"]
        );
    }

    #[test]
    fn test_lexical_order() {
        let store = TimelineStore::new(DateOrdering::Lexical);
        store.append(vec![event("2020-12-01", "iso", 1), event("03/04/2021", "us", 1)]);
        assert_eq!(dates(&store), vec!["03/04/2021", "2020-12-01"]);
    }

    #[test]
    fn test_equal_dates_keep_insertion_order() {
        let store = TimelineStore::default();
        store.append(vec![event("2021-05-05", "first", 1)]);
        store.append(vec![event("2021-05-05", "second", 2), event("2021-05-05", "third", 2)]);
        let summaries: Vec<String> = store.all().into_iter().map(|e| e.summary).collect();
        assert_eq!(summaries, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_provenance_round_trip() {
        let store = TimelineStore::default();
        store.append(vec![event("2021-01-01", "a", 7), event("2019-01-01", "b", 8)]);

        let all = store.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].document_id, DocumentId::from(8));
        assert_eq!(all[0].document_name, "doc-8.pdf");
        assert_eq!(all[1].document_id, DocumentId::from(7));
        assert_eq!(all[1].document_name, "doc-7.pdf");
    }
}

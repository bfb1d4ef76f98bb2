//! Timeline event type

use serde::{Deserialize, Serialize};

use super::document::DocumentId;

/// A dated occurrence extracted from a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    /// Free-form date, ISO (YYYY-MM-DD) preferred
    pub date: String,
    /// End date for events spanning a period
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    /// Short summary of what happened
    pub summary: String,
    /// Optional title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Optional longer description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// People or parties involved
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub participants: Vec<String>,
    /// Where it happened
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Excerpt of the document mentioning the date
    #[serde(default)]
    pub context: String,
    /// Owning document
    pub document_id: DocumentId,
    /// Owning document name
    pub document_name: String,
}

impl TimelineEvent {
    /// Create an event with the required fields
    pub fn new(
        date: impl Into<String>,
        summary: impl Into<String>,
        context: impl Into<String>,
        document_id: DocumentId,
        document_name: impl Into<String>,
    ) -> Self {
        Self {
            date: date.into(),
            end_date: None,
            summary: summary.into(),
            title: None,
            description: None,
            participants: Vec::new(),
            location: None,
            context: context.into(),
            document_id,
            document_name: document_name.into(),
        }
    }
}

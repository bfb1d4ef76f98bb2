//! LLM-driven event extraction
//!
//! The model is asked for a JSON array of events. Its reply is unwrapped in
//! two layers: the endpoint envelope (`{"content": ...}`) and then the array
//! inside `content`. If `content` carries prose around the array, the
//! outermost `[...]` span is tried as well. One malformed element rejects the
//! whole reply; partial lists are never returned.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;

use crate::generation::PromptBuilder;
use crate::providers::LlmClient;
use crate::types::{DocumentId, TimelineEvent};

static JSON_ARRAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[\s\S]*\]").expect("valid regex"));

/// Outcome of extracting events from one document
#[derive(Debug, Clone, PartialEq)]
pub enum EventExtraction {
    /// The model returned at least one well-formed event
    Extracted(Vec<TimelineEvent>),
    /// The model returned a well-formed, empty array
    NoEvents,
    /// The request or the reply was unusable
    Failed(String),
}

impl EventExtraction {
    /// Events to append; empty unless extraction succeeded
    pub fn into_events(self) -> Vec<TimelineEvent> {
        match self {
            EventExtraction::Extracted(events) => events,
            EventExtraction::NoEvents | EventExtraction::Failed(_) => Vec::new(),
        }
    }

    /// Failure reason, if any
    pub fn failure(&self) -> Option<&str> {
        match self {
            EventExtraction::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    date: String,
    #[serde(default, alias = "endDate")]
    end_date: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    participants: Option<Vec<String>>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    context: Option<String>,
}

/// Extracts dated events with the LLM
pub struct EventExtractor {
    llm: Arc<dyn LlmClient>,
    n_predict: u32,
}

impl EventExtractor {
    /// Create an extractor with a token budget per request
    pub fn new(llm: Arc<dyn LlmClient>, n_predict: u32) -> Self {
        Self { llm, n_predict }
    }

    /// Extract events from `text`, tagging each with the owning document.
    ///
    /// Never errors: request and parse failures come back as
    /// [`EventExtraction::Failed`].
    pub async fn extract_events(
        &self,
        text: &str,
        document_id: DocumentId,
        document_name: &str,
    ) -> EventExtraction {
        let prompt = PromptBuilder::build_event_prompt(text);

        let content = match self.llm.complete(&prompt, self.n_predict).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Event extraction request for '{}' failed: {}", document_name, e);
                return EventExtraction::Failed(e.to_string());
            }
        };
        tracing::debug!("LLM event reply for '{}': {}", document_name, content);

        let outcome = parse_events(&content, document_id, document_name);
        match &outcome {
            EventExtraction::Extracted(events) => {
                tracing::info!("Extracted {} events from '{}'", events.len(), document_name)
            }
            EventExtraction::NoEvents => tracing::info!("No dated events in '{}'", document_name),
            EventExtraction::Failed(reason) => {
                tracing::warn!("Unusable event reply for '{}': {}", document_name, reason)
            }
        }
        outcome
    }
}

/// Parse the model's `content` string into tagged events
pub fn parse_events(content: &str, document_id: DocumentId, document_name: &str) -> EventExtraction {
    let raw = match serde_json::from_str::<Vec<RawEvent>>(content.trim()) {
        Ok(raw) => raw,
        Err(direct) => {
            let Some(span) = JSON_ARRAY.find(content) else {
                return EventExtraction::Failed(format!("reply is not a JSON array: {}", direct));
            };
            match serde_json::from_str::<Vec<RawEvent>>(span.as_str()) {
                Ok(raw) => raw,
                Err(e) => return EventExtraction::Failed(format!("malformed event array: {}", e)),
            }
        }
    };

    if raw.is_empty() {
        return EventExtraction::NoEvents;
    }

    let mut events = Vec::with_capacity(raw.len());
    for (i, event) in raw.into_iter().enumerate() {
        if event.date.trim().is_empty() {
            return EventExtraction::Failed(format!("event {} has an empty date", i));
        }
        let Some(summary) = event
            .summary
            .clone()
            .or_else(|| event.title.clone())
            .or_else(|| event.description.clone())
        else {
            return EventExtraction::Failed(format!("event {} has no summary", i));
        };

        events.push(TimelineEvent {
            date: event.date.trim().to_string(),
            end_date: event.end_date.filter(|d| !d.trim().is_empty()),
            summary,
            title: event.title,
            description: event.description,
            participants: event.participants.unwrap_or_default(),
            location: event.location,
            context: event.context.unwrap_or_default(),
            document_id,
            document_name: document_name.to_string(),
        });
    }

    EventExtraction::Extracted(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct ScriptedLlm {
        reply: Result<String>,
        prompts: Mutex<Vec<(String, u32)>>,
    }

    impl ScriptedLlm {
        fn replying(content: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(content.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(&self, prompt: &str, n_predict: u32) -> Result<String> {
            self.prompts.lock().push((prompt.to_string(), n_predict));
            match &self.reply {
                Ok(content) => Ok(content.clone()),
                Err(e) => Err(Error::llm(e.to_string())),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    const DOC: DocumentId = DocumentId::new(42);

    #[test]
    fn test_parse_clean_array() {
        let content = r#"[
            {"date": "2021-03-04", "summary": "Complaint filed", "context": "filed on March 4"},
            {"date": "2021-04-01", "end_date": "2021-04-05", "summary": "Hearing", "participants": ["Judge Roe"]}
        ]"#;
        let EventExtraction::Extracted(events) = parse_events(content, DOC, "complaint.pdf") else {
            panic!("expected events");
        };
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.document_id == DOC && e.document_name == "complaint.pdf"));
        assert_eq!(events[0].context, "filed on March 4");
        assert_eq!(events[1].end_date.as_deref(), Some("2021-04-05"));
        assert_eq!(events[1].participants, vec!["Judge Roe"]);
    }

    #[test]
    fn test_parse_array_wrapped_in_prose() {
        let content = "Here are the events:\n[{\"date\": \"2020-01-02\", \"title\": \"Signed\"}]\nDone.";
        let events = parse_events(content, DOC, "a.pdf").into_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].summary, "Signed");
    }

    #[test]
    fn test_empty_array_is_no_events() {
        assert_eq!(parse_events(" [] ", DOC, "a.pdf"), EventExtraction::NoEvents);
    }

    #[test]
    fn test_malformed_element_rejects_whole_reply() {
        let content = r#"[{"date": "2020-01-02", "summary": "ok"}, {"summary": "no date"}]"#;
        let outcome = parse_events(content, DOC, "a.pdf");
        assert!(outcome.failure().is_some());
        assert!(outcome.into_events().is_empty());

        let content = r#"[{"date": "2020-01-02", "summary": "ok"}, {"date": "2020-02-02"}]"#;
        assert!(parse_events(content, DOC, "a.pdf").failure().is_some());
    }

    #[test]
    fn test_not_json_is_failure() {
        assert!(parse_events("I could not find any dates.", DOC, "a.pdf")
            .failure()
            .is_some());
        assert!(parse_events("[1, 2", DOC, "a.pdf").failure().is_some());
    }

    #[tokio::test]
    async fn test_extract_events_sends_budget() {
        let llm = ScriptedLlm::replying(r#"[{"date": "2019-07-01", "summary": "Lease executed"}]"#);
        let extractor = EventExtractor::new(llm.clone(), 2048);

        let events = extractor
            .extract_events("Lease executed 2019-07-01.", DOC, "lease.docx")
            .await
            .into_events();
        assert_eq!(events.len(), 1);

        let prompts = llm.prompts.lock();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].1, 2048);
        assert!(prompts[0].0.contains("Lease executed 2019-07-01."));
    }

    #[tokio::test]
    async fn test_extract_events_request_failure() {
        let llm = Arc::new(ScriptedLlm {
            reply: Err(Error::llm("connection refused")),
            prompts: Mutex::new(Vec::new()),
        });
        let extractor = EventExtractor::new(llm, 16);
        let outcome = extractor.extract_events("text", DOC, "a.pdf").await;
        assert!(outcome.failure().unwrap().contains("connection refused"));
    }
}

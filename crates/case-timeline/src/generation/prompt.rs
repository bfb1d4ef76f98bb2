//! Prompt templates for event extraction and chat

use crate::types::TimelineEvent;

/// Context line used when the timeline is empty
pub const NO_TIMELINE_CONTEXT: &str = "No timeline events available.";

/// Prompt builder
pub struct PromptBuilder;

impl PromptBuilder {
    /// Prompt asking the model for the dated events of one document
    pub fn build_event_prompt(text: &str) -> String {
        format!(
            r#"Extract all dates mentioned in the following document along with relevant information about what happened on those dates.
Format your response as a JSON array of objects, where each object has:
- date: The date in YYYY-MM-DD format
- end_date: (optional) The end date in YYYY-MM-DD format if the event spans a period
- summary: A concise summary of what happened on that date
- title: (optional) A short title for the event
- description: (optional) A longer description of the event
- participants: (optional) An array of the people or parties involved
- location: (optional) Where the event took place
- context: The relevant text from the document that mentions this date

Respond with the JSON array only. If the document mentions no dates, respond with [].

Document text:
{text}

JSON response:"#,
            text = text
        )
    }

    /// Render events as the flat context block handed to the chat model
    pub fn build_timeline_context(events: &[TimelineEvent]) -> String {
        if events.is_empty() {
            return NO_TIMELINE_CONTEXT.to_string();
        }

        events
            .iter()
            .map(|e| {
                format!(
                    "Date: {}\nSummary: {}\nDocument: {}\nContext: {}\n---",
                    e.date, e.summary, e.document_name, e.context
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Chat prompt with the timeline as the only source of truth
    pub fn build_chat_prompt(question: &str, timeline_context: &str) -> String {
        format!(
            r#"[INST]
You are an assistant for a legal case. You are to answer questions based on just the relevant text extracted from various documents. This is the text:

{context}

If the question falls out of the scope of the text above, just say that you cannot answer that question.
Be concise, accurate, and helpful. Cite the document names when providing information.
This is the question from the user:

{question}
[/INST]"#,
            context = timeline_context,
            question = question
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DocumentId;

    #[test]
    fn test_event_prompt_embeds_text() {
        let prompt = PromptBuilder::build_event_prompt("On 2021-03-04 the complaint was filed.");
        assert!(prompt.contains("JSON array"));
        assert!(prompt.contains("On 2021-03-04 the complaint was filed."));
        assert!(prompt.ends_with("JSON response:"));
    }

    #[test]
    fn test_timeline_context_format() {
        let events = vec![
            TimelineEvent::new("2021-03-04", "Complaint filed", "filed on", DocumentId::from(1), "complaint.pdf"),
            TimelineEvent::new("2021-04-01", "Answer due", "due by", DocumentId::from(1), "complaint.pdf"),
        ];
        let context = PromptBuilder::build_timeline_context(&events);
        assert_eq!(
            context,
            "Date: 2021-03-04\nSummary: Complaint filed\nDocument: complaint.pdf\nContext: filed on\n---\n\
             Date: 2021-04-01\nSummary: Answer due\nDocument: complaint.pdf\nContext: due by\n---"
        );
    }

    #[test]
    fn test_empty_timeline_context() {
        assert_eq!(PromptBuilder::build_timeline_context(&[]), NO_TIMELINE_CONTEXT);
    }

    #[test]
    fn test_chat_prompt() {
        let prompt = PromptBuilder::build_chat_prompt("When was it filed?", "Date: 2021-03-04");
        assert!(prompt.starts_with("[INST]"));
        assert!(prompt.ends_with("[/INST]"));
        assert!(prompt.contains("Date: 2021-03-04"));
        assert!(prompt.contains("When was it filed?"));
    }
}

//! Timeline-grounded chat

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::LlmClient;
use crate::types::TimelineEvent;

use super::prompt::PromptBuilder;

/// Answer given when there is nothing to ground on
pub const NO_TIMELINE_ANSWER: &str =
    "No timeline data is available yet. Upload case documents so their events can be extracted, then ask again.";

/// Answers questions about the current timeline
pub struct ChatResponder {
    llm: Arc<dyn LlmClient>,
    n_predict: u32,
}

impl ChatResponder {
    /// Create a responder with a token budget per answer
    pub fn new(llm: Arc<dyn LlmClient>, n_predict: u32) -> Self {
        Self { llm, n_predict }
    }

    /// Answer `question` using `events` as the only context
    pub async fn answer(&self, question: Option<&str>, events: &[TimelineEvent]) -> Result<String> {
        let question = question
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| Error::MissingField("message".to_string()))?;

        if events.is_empty() {
            tracing::info!("Chat question received with an empty timeline");
            return Ok(NO_TIMELINE_ANSWER.to_string());
        }

        let context = PromptBuilder::build_timeline_context(events);
        tracing::debug!("Timeline context: {} events, {} chars", events.len(), context.len());

        let prompt = PromptBuilder::build_chat_prompt(question, &context);
        let answer = self.llm.complete(&prompt, self.n_predict).await?;
        tracing::debug!("Chat answer: {}", answer);

        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DocumentId;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedLlm {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmClient for FixedLlm {
        async fn complete(&self, prompt: &str, n_predict: u32) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(n_predict, 5000);
            assert!(prompt.contains("Document: complaint.pdf"));
            Ok("The complaint was filed on 2021-03-04 (complaint.pdf).".to_string())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn responder() -> (ChatResponder, Arc<FixedLlm>) {
        let llm = Arc::new(FixedLlm {
            calls: AtomicUsize::new(0),
        });
        (ChatResponder::new(llm.clone(), 5000), llm)
    }

    #[tokio::test]
    async fn test_answer_with_timeline() {
        let (chat, llm) = responder();
        let events = vec![TimelineEvent::new(
            "2021-03-04",
            "Complaint filed",
            "filed on March 4",
            DocumentId::from(1),
            "complaint.pdf",
        )];

        let answer = chat.answer(Some("When was the complaint filed?"), &events).await.unwrap();
        assert!(answer.contains("2021-03-04"));
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_timeline_answers_without_llm() {
        let (chat, llm) = responder();
        let answer = chat.answer(Some("What happened?"), &[]).await.unwrap();
        assert!(answer.contains("No timeline data is available"));
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_question() {
        let (chat, _) = responder();
        assert!(matches!(
            chat.answer(None, &[]).await,
            Err(Error::MissingField(field)) if field == "message"
        ));
        assert!(matches!(chat.answer(Some("   "), &[]).await, Err(Error::MissingField(_))));
    }
}

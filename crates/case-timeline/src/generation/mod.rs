//! Prompt construction and timeline-grounded chat

pub mod chat;
pub mod prompt;

pub use chat::{ChatResponder, NO_TIMELINE_ANSWER};
pub use prompt::PromptBuilder;

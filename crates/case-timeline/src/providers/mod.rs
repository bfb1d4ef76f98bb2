//! Remote model providers
//!
//! Both models sit behind traits so the pipeline and the HTTP handlers can be
//! exercised against in-process fakes.

pub mod llm;
pub mod ocr;

pub use llm::{HttpLlmClient, LlmClient};
pub use ocr::{HttpOcrModel, OcrModel};

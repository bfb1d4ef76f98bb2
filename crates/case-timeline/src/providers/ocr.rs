//! OCR model client
//!
//! A page is sent as a single-page PDF in a multipart `file` field together
//! with the requested `resolution`. The model answers either with JSON
//! carrying a `text` field or with the recognized markup as the raw body.
//! The OCR service's own `/parse` endpoint speaks the same protocol, so the
//! backend can point at either.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::config::OcrConfig;
use crate::error::{Error, Result};
use crate::ocr::RenderedPage;

/// Trait for page recognition
///
/// Implementations:
/// - `HttpOcrModel`: remote model server over HTTP
#[async_trait]
pub trait OcrModel: Send + Sync {
    /// Recognize one rendered page, returning markdown-like markup
    async fn recognize(&self, page: &RenderedPage) -> Result<String>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

#[derive(Debug, Deserialize)]
struct ModelReply {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// OCR model reached over HTTP
pub struct HttpOcrModel {
    client: Client,
    url: String,
}

impl HttpOcrModel {
    /// Create a client from config
    pub fn new(config: &OcrConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: config.model_url.clone(),
        })
    }
}

#[async_trait]
impl OcrModel for HttpOcrModel {
    async fn recognize(&self, page: &RenderedPage) -> Result<String> {
        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(page.data.clone())
                    .file_name(format!("page_{}.pdf", page.page_number))
                    .mime_str(page.mime)
                    .map_err(|e| Error::ocr(format!("Invalid page MIME type: {}", e)))?,
            )
            .text("resolution", page.resolution.to_string());

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::ocr(format!("OCR request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::ocr(format!("Failed to read OCR response: {}", e)))?;

        if !status.is_success() {
            return Err(Error::ocr(format!(
                "OCR model error on page {}: {} - {}",
                page.page_number, status, body
            )));
        }

        parse_model_reply(&body)
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Interpret a model reply body
pub fn parse_model_reply(body: &str) -> Result<String> {
    match serde_json::from_str::<ModelReply>(body) {
        Ok(reply) if reply.status.as_deref() == Some("error") => Err(Error::ocr(
            reply
                .message
                .unwrap_or_else(|| "OCR model reported an error".to_string()),
        )),
        Ok(ModelReply {
            text: Some(text), ..
        }) => Ok(text),
        // A JSON string is the markup itself
        _ => match serde_json::from_str::<String>(body) {
            Ok(text) => Ok(text),
            Err(_) => Ok(body.to_string()),
        },
    }
}

//! OCR page service
//!
//! Wraps the OCR model with the page cache and exposes it as `POST /parse`.
//! Its reply carries a `text` field, so the timeline backend can use this
//! service as its OCR model endpoint. Uploads are processed in memory and
//! only the page cache is written to disk.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::cache::PageCache;
use crate::config::TimelineConfig;
use crate::error::{Error, Result};
use crate::ingestion::{ExtractionPipeline, PageRange};
use crate::ocr::PageExtractor;
use crate::providers::{HttpOcrModel, OcrModel};
use crate::types::{DocumentType, ParseResponse};
use crate::types::response::ServiceStatus;

#[derive(Clone)]
struct OcrState {
    pipeline: Arc<ExtractionPipeline>,
}

/// OCR page service HTTP server
pub struct OcrServer {
    config: TimelineConfig,
    state: OcrState,
}

impl OcrServer {
    /// Create a service in front of the configured OCR model
    pub async fn new(config: TimelineConfig) -> Result<Self> {
        tracing::info!("OCR model: {}", config.ocr.model_url);
        let model: Arc<dyn OcrModel> = Arc::new(HttpOcrModel::new(&config.ocr)?);
        Self::with_model(config, model).await
    }

    /// Create a service around an explicit OCR model
    pub async fn with_model(config: TimelineConfig, model: Arc<dyn OcrModel>) -> Result<Self> {
        let cache = PageCache::open(&config.cache.root).await?;
        tracing::info!("Page cache at {}", cache.root().display());

        let extractor = PageExtractor::new(model, cache.clone(), config.ocr.resolution);
        let pipeline = ExtractionPipeline::new(cache, Some(extractor), config.ocr.max_concurrent_pages);

        let state = OcrState {
            pipeline: Arc::new(pipeline),
        };
        Ok(Self { config, state })
    }

    /// Build the router
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(status))
            .route(
                "/parse",
                post(parse).layer(DefaultBodyLimit::max(self.config.ocr_server.max_upload_size)),
            )
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        let router = self.router();
        tracing::info!("Starting OCR service on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.ocr_server.host, self.config.ocr_server.port)
    }
}

/// GET / - Liveness plus page cache statistics
async fn status(State(state): State<OcrState>) -> Json<ServiceStatus> {
    let cache = match state.pipeline.cache().stats().await {
        Ok(stats) => Some(stats),
        Err(e) => {
            tracing::warn!("Failed to read page cache stats: {}", e);
            None
        }
    };

    Json(ServiceStatus {
        status: "ok".to_string(),
        message: "OCR service is running".to_string(),
        cache,
    })
}

type ParseReply = (StatusCode, Json<ParseResponse>);

fn rejected(status: StatusCode, message: impl Into<String>) -> ParseReply {
    (
        status,
        Json(ParseResponse::Error {
            message: message.into(),
        }),
    )
}

/// POST /parse - OCR a PDF (or a page window of it)
async fn parse(State(state): State<OcrState>, mut multipart: Multipart) -> ParseReply {
    let mut file: Option<(String, Bytes)> = None;
    let mut start_page = None;
    let mut end_page = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                let err = Error::multipart(e);
                return rejected(err.status().0, err.to_string());
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(data) => file = Some((filename, data)),
                    Err(e) => {
                        let err = Error::multipart(e);
                        return rejected(err.status().0, err.to_string());
                    }
                }
            }
            "start_page" | "end_page" => {
                let value = match field.text().await {
                    Ok(value) => value,
                    Err(e) => {
                        let err = Error::multipart(e);
                        return rejected(err.status().0, err.to_string());
                    }
                };
                let value = value.trim();
                if value.is_empty() {
                    continue;
                }
                let Ok(page) = value.parse::<u32>() else {
                    return rejected(
                        StatusCode::BAD_REQUEST,
                        format!("Invalid {}: {}", name, value),
                    );
                };
                if name == "start_page" {
                    start_page = Some(page);
                } else {
                    end_page = Some(page);
                }
            }
            _ => tracing::debug!("Ignoring multipart field {:?}", name),
        }
    }

    let Some((filename, data)) = file else {
        return rejected(StatusCode::BAD_REQUEST, "No file part in the request");
    };
    let filename = upload_name(&filename);
    if filename.is_empty() {
        return rejected(StatusCode::BAD_REQUEST, "No file selected");
    }
    if DocumentType::from_filename(&filename) != Some(DocumentType::Pdf) {
        return rejected(StatusCode::BAD_REQUEST, "File type not allowed");
    }

    let range = PageRange::new(start_page, end_page);
    match state.pipeline.ocr_pages(&filename, &data, range).await {
        Ok(output) => {
            tracing::info!(
                "Parsed {}: {} pages ({} cached, {} OCR calls)",
                filename,
                output.pages_processed,
                output.cache_hits,
                output.ocr_calls
            );
            (
                StatusCode::OK,
                Json(ParseResponse::Success {
                    text: output.text,
                    pages_processed: output.pages_processed,
                }),
            )
        }
        Err(e) => {
            tracing::warn!("Parse failed for {}: {}", filename, e);
            rejected(e.status().0, e.to_string())
        }
    }
}

/// Final path component without characters unsafe in filenames.
/// Uploads are processed in memory; the name is only checked and logged.
fn upload_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    base.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '_' | ' '))
        .collect::<String>()
        .trim()
        .trim_start_matches('.')
        .replace(' ', "_")
}

//! API routes for the timeline server

pub mod chat;
pub mod documents;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Documents - uploads get the configured body limit
        .route(
            "/documents/upload",
            post(documents::upload_documents).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/documents", get(documents::list_documents))
        .route("/documents/timeline/events", get(documents::timeline_events))
        .route("/documents/:id", get(documents::get_document))
        // Chat; `/chat/receive` is the path older clients post to
        .route("/chat", post(chat::chat))
        .route("/chat/receive", post(chat::chat))
        // Info
        .route("/info", get(info))
}

/// API info endpoint
async fn info(state: axum::extract::State<AppState>) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "case-timeline",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Legal document timeline extraction and chat",
        "endpoints": {
            "POST /api/documents/upload": "Upload PDF/DOCX files (field: documents)",
            "GET /api/documents": "List all documents",
            "GET /api/documents/:id": "Get document details",
            "GET /api/documents/timeline/events": "Ordered timeline events",
            "POST /api/chat": "Ask a question about the timeline"
        },
        "ocr_enabled": state.pipeline().ocr_enabled(),
        "timeline_ordering": state.timeline().ordering(),
        "batch_policy": state.config().upload.batch_policy,
    }))
}

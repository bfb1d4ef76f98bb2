//! Chat endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{ChatRequest, ChatResponse};

/// POST /api/chat - Answer a question from the timeline
pub async fn chat(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>> {
    // An unreadable body is treated as a missing question
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!("Unreadable chat body: {}", rejection);
            ChatRequest::default()
        }
    };
    tracing::info!("Chat question: {:?}", request.message);

    let events = state.timeline().all();
    let response = state
        .chat()
        .answer(request.message.as_deref(), &events)
        .await?;

    Ok(Json(ChatResponse { response }))
}

//! Document upload and listing endpoints

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use bytes::Bytes;
use std::path::PathBuf;
use std::time::Instant;

use crate::config::BatchPolicy;
use crate::error::{Error, Result};
use crate::ingestion::ExtractedText;
use crate::server::state::AppState;
use crate::types::{
    response::EventExtractionFailure, Document, DocumentId, DocumentType, TimelineEvent,
    UploadFailure, UploadResponse,
};

/// Multipart field carrying the files
pub const UPLOAD_FIELD: &str = "documents";

/// A received file, stored on disk but not yet committed
struct StagedFile {
    id: DocumentId,
    name: String,
    document_type: DocumentType,
    path: PathBuf,
    data: Bytes,
}

/// POST /api/documents/upload - Upload, extract and index files
pub async fn upload_documents(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let start = Instant::now();
    let policy = state.config().upload.batch_policy;
    let max_files = state.config().upload.max_files;

    let mut staged: Vec<StagedFile> = Vec::new();
    let mut failures: Vec<UploadFailure> = Vec::new();
    let mut first_error: Option<Error> = None;

    // Receive and store every file before doing any extraction work
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                discard(&staged).await;
                return Err(Error::multipart(e));
            }
        };

        if field.name() != Some(UPLOAD_FIELD) {
            tracing::debug!("Ignoring multipart field {:?}", field.name());
            continue;
        }
        let Some(name) = field.file_name().map(sanitize_filename).filter(|n| !n.is_empty()) else {
            continue;
        };

        if staged.len() + failures.len() >= max_files {
            discard(&staged).await;
            return Err(Error::InvalidUpload(format!(
                "Too many files, at most {} per upload",
                max_files
            )));
        }

        let content_type = field.content_type().map(|s| s.to_string());
        let data = match field.bytes().await {
            Ok(data) => data,
            Err(e) => {
                discard(&staged).await;
                return Err(Error::multipart(e));
            }
        };

        let document_type = DocumentType::from_filename(&name)
            .or_else(|| content_type.as_deref().and_then(DocumentType::from_mime));
        let Some(document_type) = document_type else {
            let err = Error::UnsupportedFileType(format!("{} (only pdf and docx are accepted)", name));
            if policy == BatchPolicy::AllOrNothing {
                discard(&staged).await;
                return Err(err);
            }
            failures.push(UploadFailure {
                filename: name,
                error: err.to_string(),
            });
            first_error.get_or_insert(err);
            continue;
        };

        let id = state.next_document_id();
        let path = state
            .config()
            .upload
            .upload_dir
            .join(format!("{}-{}", id, name));
        if let Err(e) = tokio::fs::write(&path, &data).await {
            discard(&staged).await;
            return Err(e.into());
        }

        tracing::info!("Received {} ({} bytes) as {}", name, data.len(), path.display());
        staged.push(StagedFile {
            id,
            name,
            document_type,
            path,
            data,
        });
    }

    if staged.is_empty() {
        return Err(first_error.unwrap_or(Error::NoFiles));
    }

    // Extract every file; under all-or-nothing the first failure aborts the batch
    let mut extracted: Vec<(StagedFile, ExtractedText)> = Vec::with_capacity(staged.len());
    let mut pending = staged.into_iter();
    while let Some(file) = pending.next() {
        match state
            .pipeline()
            .extract_bytes(&file.name, file.document_type, &file.data)
            .await
        {
            Ok(text) => extracted.push((file, text)),
            Err(e) => {
                tracing::warn!("Extraction failed for {}: {}", file.name, e);
                match policy {
                    BatchPolicy::AllOrNothing => {
                        let rest: Vec<StagedFile> = pending.by_ref().collect();
                        discard(&rest).await;
                        discard(&[file]).await;
                        let done: Vec<StagedFile> = extracted.into_iter().map(|(f, _)| f).collect();
                        discard(&done).await;
                        return Err(e);
                    }
                    BatchPolicy::BestEffort => {
                        discard(std::slice::from_ref(&file)).await;
                        failures.push(UploadFailure {
                            filename: file.name,
                            error: e.to_string(),
                        });
                        first_error.get_or_insert(e);
                    }
                }
            }
        }
    }

    if extracted.is_empty() {
        return Err(first_error.unwrap_or(Error::NoFiles));
    }

    // Event extraction never aborts the batch
    let mut documents = Vec::with_capacity(extracted.len());
    let mut events: Vec<TimelineEvent> = Vec::new();
    let mut event_extraction_failures = Vec::new();

    for (file, text) in extracted {
        let outcome = state
            .event_extractor()
            .extract_events(&text.text, file.id, &file.name)
            .await;
        if let Some(reason) = outcome.failure() {
            event_extraction_failures.push(EventExtractionFailure {
                document_name: file.name.clone(),
                reason: reason.to_string(),
            });
        }
        events.extend(outcome.into_events());

        documents.push(Document {
            id: file.id,
            name: file.name,
            path: file.path,
            document_type: file.document_type,
            upload_date: chrono::Utc::now(),
            text: text.text,
            content_hash: text.content_hash,
            page_count: text.page_count,
            extraction_method: text.method,
        });
    }

    state.commit_batch(documents.clone(), events.clone());

    tracing::info!(
        "Upload complete: {} documents, {} events, {} failures in {:.1}s",
        documents.len(),
        events.len(),
        failures.len(),
        start.elapsed().as_secs_f64()
    );

    Ok(Json(UploadResponse {
        message: "Files uploaded and processed successfully".to_string(),
        documents,
        events,
        failures,
        event_extraction_failures,
    }))
}

/// GET /api/documents - List all documents
pub async fn list_documents(State(state): State<AppState>) -> Json<Vec<Document>> {
    Json(state.list_documents())
}

/// GET /api/documents/:id - Get a single document
pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Document>> {
    id.parse::<DocumentId>()
        .ok()
        .and_then(|id| state.get_document(id))
        .map(Json)
        .ok_or(Error::DocumentNotFound(id))
}

/// GET /api/documents/timeline/events - The ordered timeline
pub async fn timeline_events(State(state): State<AppState>) -> Json<Vec<TimelineEvent>> {
    Json(state.timeline().all())
}

/// Keep only the final path component and drop characters unsafe in filenames
fn sanitize_filename(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    base.chars()
        .filter(|c| !c.is_control() && !matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect::<String>()
        .trim()
        .trim_start_matches('.')
        .to_string()
}

/// Remove stored files of a batch that will not be committed
async fn discard(files: &[StagedFile]) {
    for file in files {
        if let Err(e) = tokio::fs::remove_file(&file.path).await {
            tracing::warn!("Failed to remove {}: {}", file.path.display(), e);
        }
    }
}

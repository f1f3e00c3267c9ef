use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use progress_core::store::{Document, DocumentEntry, WriteOutcome};
use progress_core::{Precondition, ProgressError};

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/files: list documents in stable order.
pub async fn list_files(State(app): State<AppState>) -> Result<Json<Vec<DocumentEntry>>, AppError> {
    let store = app.store.clone();
    let entries = tokio::task::spawn_blocking(move || store.list())
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(entries))
}

#[derive(serde::Deserialize)]
pub struct FileQuery {
    pub path: Option<String>,
}

/// GET /api/file?path=<p>: document content with its revision.
pub async fn get_file(
    State(app): State<AppState>,
    Query(query): Query<FileQuery>,
) -> Result<Json<Document>, AppError> {
    let Some(path) = query.path.filter(|p| !p.is_empty()) else {
        return Err(AppError::bad_request("path parameter required"));
    };
    let store = app.store.clone();
    let result = tokio::task::spawn_blocking(move || store.read(&path))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))?;

    match result {
        Ok(doc) => Ok(Json(doc)),
        // Reads never reveal whether something exists outside the root.
        Err(ProgressError::PathOutsideRoot(p)) => {
            tracing::warn!(path = %p, "read outside project root rejected");
            Err(AppError::not_found(format!("document not found: {p}")))
        }
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct PutFileBody {
    pub path: String,
    pub content: String,
    /// Revision the edit was based on; empty when creating a new document.
    pub base_rev: String,
    #[serde(default)]
    pub base_mtime: Option<i64>,
}

/// PUT /api/file: replace a document if `base_rev` is still current.
pub async fn put_file(
    State(app): State<AppState>,
    payload: Result<Json<PutFileBody>, JsonRejection>,
) -> Result<Json<WriteOutcome>, AppError> {
    let Json(body) = payload.map_err(|e| AppError::bad_request(e.body_text()))?;
    let store = app.store.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let expected = Precondition::new(body.base_rev).with_mtime(body.base_mtime);
        store.write_full(&body.path, &body.content, &expected)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(outcome))
}

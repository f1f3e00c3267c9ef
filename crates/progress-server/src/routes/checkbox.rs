use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use progress_core::store::PatchOutcome;
use progress_core::{Marker, Precondition};

use crate::error::AppError;
use crate::state::AppState;

/// Unknown markers and negative indices fail deserialization and come back
/// as 400 before the store is consulted.
#[derive(Debug, serde::Deserialize)]
pub struct PatchCheckboxBody {
    pub path: String,
    pub line_index: usize,
    pub marker: Marker,
    pub base_rev: String,
    #[serde(default)]
    pub base_mtime: Option<i64>,
}

/// PATCH /api/checkbox: set the marker of a single checkbox line.
pub async fn patch_checkbox(
    State(app): State<AppState>,
    payload: Result<Json<PatchCheckboxBody>, JsonRejection>,
) -> Result<Json<PatchOutcome>, AppError> {
    let Json(body) = payload.map_err(|e| AppError::bad_request(e.body_text()))?;
    let store = app.store.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let expected = Precondition::new(body.base_rev).with_mtime(body.base_mtime);
        store.write_line(&body.path, body.line_index, body.marker, &expected)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(outcome))
}

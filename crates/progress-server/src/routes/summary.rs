use axum::extract::{Query, State};
use axum::Json;
use progress_core::detail::{self, Panel, PanelDetail};
use progress_core::plan::{self, PlanReport};
use progress_core::summary::{self, StatusSummary};

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/status-summary: tracker digest for the UI header.
pub async fn status_summary(State(app): State<AppState>) -> Result<Json<StatusSummary>, AppError> {
    let root = app.store.root().to_path_buf();
    let result = tokio::task::spawn_blocking(move || summary::load(&root, chrono::Utc::now()))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))?;
    Ok(Json(result))
}

#[derive(serde::Deserialize)]
pub struct DetailQuery {
    pub panel: Option<String>,
}

/// GET /api/status-detail?panel=<progress|next|plan|risk|snapshot>
pub async fn status_detail(
    State(app): State<AppState>,
    Query(query): Query<DetailQuery>,
) -> Result<Json<PanelDetail>, AppError> {
    let panel: Panel = query
        .panel
        .as_deref()
        .and_then(|p| p.parse().ok())
        .ok_or_else(|| AppError::bad_request("Missing or invalid panel parameter"))?;
    let root = app.store.root().to_path_buf();
    let result =
        tokio::task::spawn_blocking(move || detail::load(&root, panel, chrono::Utc::now()))
            .await
            .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))?;
    Ok(Json(result))
}

#[derive(serde::Deserialize)]
pub struct PlanQuery {
    pub path: Option<String>,
}

/// GET /api/plan-health?path=<docs/plans/...>: compliance of one plan file.
pub async fn plan_health(
    State(app): State<AppState>,
    Query(query): Query<PlanQuery>,
) -> Result<Json<PlanReport>, AppError> {
    let Some(path) = query.path.filter(|p| !p.is_empty()) else {
        return Err(AppError::bad_request("path parameter required"));
    };
    let root = app.store.root().to_path_buf();
    let report = tokio::task::spawn_blocking(move || plan::report(&root, &path))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))?;
    Ok(Json(report))
}

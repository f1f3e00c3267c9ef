use axum::extract::State;
use axum::Json;

use crate::state::AppState;

/// GET /api/session: where the UI is served from. Never includes the token.
pub async fn get_session(State(app): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "origin": app.perimeter.origin(),
        "port": app.perimeter.port(),
    }))
}

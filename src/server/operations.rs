use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::AppState;

/// `OPTIONS /api/operations/reloadConfig`: re-read settings and swap the snapshot.
pub(crate) async fn reload_config(State(state): State<AppState>) -> Response {
    match state.config.reload() {
        Ok(_) => (StatusCode::OK, Json("Configuration reloaded")).into_response(),
        Err(_) => (StatusCode::BAD_REQUEST, Json("Could not reload configuration")).into_response(),
    }
}

use crate::error::Result;
use crate::AppState;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use log::*;

/// GET a JSON object mapping each connected remote identity to its client state.
pub async fn index(State(app_state): State<AppState>) -> Result<impl IntoResponse> {
    let snapshot = app_state.client_registry.snapshot();
    debug!("Reporting status for {} client(s)", snapshot.len());

    let body = serde_json::to_vec(&snapshot)?;

    Ok(([(header::CONTENT_TYPE, "application/json")], body))
}

use axum::http::StatusCode;
use axum::response::IntoResponse;

/// GET liveness probe; never authenticated.
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "healthy")
}

use crate::{
    controller::{health_check_controller, status_controller},
    middleware::{
        access_log::{AccessLogWriter, LogAccessWriter},
        adapt,
        auth::validator_for,
        Middleware,
    },
    stream::handler::stream_handler,
    AppState,
};
use axum::{routing::get, Router};
use std::sync::Arc;

pub fn define_routes(app_state: AppState) -> Router {
    let access_log: Arc<dyn AccessLogWriter> = Arc::new(LogAccessWriter);
    define_routes_with_access_log(app_state, access_log)
}

/// Builds the router with an explicit access log destination.
///
/// Authentication sits innermost and the access log wraps it, so rejected
/// requests still show up in the log with their 401.
pub fn define_routes_with_access_log(
    app_state: AppState,
    access_log: Arc<dyn AccessLogWriter>,
) -> Router {
    let middlewares = vec![
        Middleware::Authenticate(validator_for(app_state.config.auth_token())),
        Middleware::AccessLog(access_log),
    ];

    Router::new()
        .merge(stream_routes(app_state.clone(), middlewares.clone()))
        .merge(status_routes(app_state, middlewares))
        .merge(health_routes())
}

fn stream_routes(app_state: AppState, middlewares: Vec<Middleware>) -> Router {
    Router::new()
        .route("/stream", adapt(get(stream_handler), middlewares))
        .with_state(app_state)
}

fn status_routes(app_state: AppState, middlewares: Vec<Middleware>) -> Router {
    Router::new()
        .route("/status", adapt(get(status_controller::index), middlewares))
        .with_state(app_state)
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

//! Cross-cutting request processing wrapped around route handlers.
//!
//! A `Middleware` is a transformation over a route: it may run logic before the
//! inner handler, refuse to call it, or run logic after it. `adapt` applies a
//! caller-chosen list in order, each entry wrapping the result of the previous
//! one, so the first entry sits closest to the handler.

pub mod access_log;
pub mod auth;

use axum::{
    http::{header, HeaderMap, HeaderValue},
    middleware::from_fn_with_state,
    routing::MethodRouter,
};
use std::sync::Arc;

use access_log::{log_access, AccessLogWriter};
use auth::{require_auth, AuthValidator};

#[derive(Clone)]
pub enum Middleware {
    /// Rejects requests the validator refuses with 401.
    Authenticate(Arc<dyn AuthValidator>),
    /// Records remote, method, URI, status and duration once the response is sent.
    AccessLog(Arc<dyn AccessLogWriter>),
}

impl Middleware {
    fn wrap<S>(self, route: MethodRouter<S>) -> MethodRouter<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        match self {
            Middleware::Authenticate(validator) => {
                route.layer(from_fn_with_state(validator, require_auth))
            }
            Middleware::AccessLog(writer) => route.layer(from_fn_with_state(writer, log_access)),
        }
    }
}

/// Wraps `route` in `middlewares`, innermost first.
pub fn adapt<S>(
    route: MethodRouter<S>,
    middlewares: impl IntoIterator<Item = Middleware>,
) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    middlewares
        .into_iter()
        .fold(route, |wrapped, middleware| middleware.wrap(wrapped))
}

/// Headers letting browser clients on other origins read stream and auth responses.
pub(crate) fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET"),
    );
}

#[cfg(test)]
mod tests {
    use super::access_log::tests::RecordingAccessLog;
    use super::auth::BearerToken;
    use super::*;
    use axum::{
        body::Body,
        extract::connect_info::MockConnectInfo,
        http::{Request, StatusCode},
        routing::get,
        Router,
    };
    use secrecy::SecretString;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    fn validator() -> Arc<dyn AuthValidator> {
        Arc::new(BearerToken::new(SecretString::from("token".to_string())))
    }

    fn app(route: MethodRouter) -> Router {
        Router::new()
            .route("/test", route)
            .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 9000))))
    }

    async fn send(app: Router, authorization: Option<&str>) -> StatusCode {
        let mut builder = Request::builder().uri("/test");
        if let Some(value) = authorization {
            builder = builder.header("authorization", value);
        }
        let response = app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        status
    }

    #[tokio::test]
    async fn test_logging_outside_auth_records_rejections() {
        let log = Arc::new(RecordingAccessLog::default());
        let route = adapt(
            get(|| async { "ok" }),
            [
                Middleware::Authenticate(validator()),
                Middleware::AccessLog(log.clone()),
            ],
        );

        assert_eq!(send(app(route), None).await, StatusCode::UNAUTHORIZED);

        let entries = log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_auth_outside_logging_never_reaches_log() {
        let log = Arc::new(RecordingAccessLog::default());
        let handled = Arc::new(AtomicUsize::new(0));
        let counter = handled.clone();
        let route = adapt(
            get(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { "ok" }
            }),
            [
                Middleware::AccessLog(log.clone()),
                Middleware::Authenticate(validator()),
            ],
        );

        assert_eq!(send(app(route), None).await, StatusCode::UNAUTHORIZED);

        assert!(log.entries().is_empty());
        assert_eq!(handled.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_authorized_request_reaches_handler_and_log() {
        let log = Arc::new(RecordingAccessLog::default());
        let handled = Arc::new(AtomicUsize::new(0));
        let counter = handled.clone();
        let route = adapt(
            get(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { "ok" }
            }),
            [
                Middleware::AccessLog(log.clone()),
                Middleware::Authenticate(validator()),
            ],
        );

        assert_eq!(send(app(route), Some("Bearer token")).await, StatusCode::OK);

        assert_eq!(handled.load(Ordering::SeqCst), 1);
        let entries = log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, StatusCode::OK);
        assert_eq!(entries[0].remote, "127.0.0.1:9000");
    }

    #[test]
    fn test_cors_headers() {
        let mut headers = HeaderMap::new();
        apply_cors_headers(&mut headers);

        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "GET");
    }
}

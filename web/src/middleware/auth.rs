use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use log::*;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

use super::apply_cors_headers;

/// Decides whether a request may proceed past the authentication gate.
///
/// New strategies plug in by implementing this trait; `require_auth` never changes.
pub trait AuthValidator: Send + Sync {
    fn is_authorized(&self, request: &Request) -> bool;
}

/// Accepts every request. Used when no shared token is configured.
pub struct AllowAll;

impl AuthValidator for AllowAll {
    fn is_authorized(&self, _request: &Request) -> bool {
        true
    }
}

/// Accepts requests whose `Authorization` header is exactly `Bearer <token>`.
pub struct BearerToken {
    token: SecretString,
}

impl BearerToken {
    pub fn new(token: SecretString) -> Self {
        Self { token }
    }
}

impl AuthValidator for BearerToken {
    fn is_authorized(&self, request: &Request) -> bool {
        request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .is_some_and(|presented| presented == self.token.expose_secret().as_str())
    }
}

/// Picks the validator for the configured token: bearer matching when a token is
/// set, allow-all otherwise.
pub fn validator_for(token: Option<SecretString>) -> Arc<dyn AuthValidator> {
    match token {
        Some(token) => {
            info!("Bearer token authentication enabled");
            Arc::new(BearerToken::new(token))
        }
        None => {
            warn!("No auth token configured, accepting all requests");
            Arc::new(AllowAll)
        }
    }
}

/// Authentication middleware that returns 401 Unauthorized when the validator
/// rejects the request.
///
/// The rejection carries the same CORS headers as the stream so browser clients
/// can read the status.
pub async fn require_auth(
    State(validator): State<Arc<dyn AuthValidator>>,
    request: Request,
    next: Next,
) -> Response {
    if validator.is_authorized(&request) {
        return next.run(request).await;
    }

    debug!("Rejecting unauthenticated {} {}", request.method(), request.uri());
    let mut response = StatusCode::UNAUTHORIZED.into_response();
    apply_cors_headers(response.headers_mut());
    response
}

use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::*;

pub type Result<T> = core::result::Result<T, Error>;

/// Request-scoped failure surfaced to the client as a bare status code.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: WebErrorKind,
}

#[derive(Debug, PartialEq)]
pub enum WebErrorKind {
    /// A request parameter was present but not acceptable.
    InvalidParameter(String),
    /// A response body could not be produced.
    Serialization,
}

impl Error {
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self {
            source: None,
            error_kind: WebErrorKind::InvalidParameter(message.into()),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

// Bodies stay empty: clients of the stream endpoint only ever act on the status.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self.error_kind {
            WebErrorKind::InvalidParameter(message) => {
                debug!("Rejecting request: {message}");
                StatusCode::BAD_REQUEST.into_response()
            }
            WebErrorKind::Serialization => {
                error!("Failed to serialize response: {:?}", self.source);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self {
            source: Some(Box::new(err)),
            error_kind: WebErrorKind::Serialization,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn test_invalid_parameter_maps_to_400_without_body() {
        let response = Error::invalid_parameter("count must not be negative").into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_serialization_maps_to_500_without_body() {
        let json_error = serde_json::from_str::<u8>("nope").unwrap_err();
        let response = Error::from(json_error).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }
}

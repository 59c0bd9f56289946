use crate::extractors::RejectionType;
use axum::{
    async_trait,
    extract::{
        connect_info::{ConnectInfo, MockConnectInfo},
        FromRequestParts,
    },
    http::{request::Parts, Extensions, StatusCode},
};
use std::net::SocketAddr;

/// The peer's socket address (`ip:port`), used as the client registry key.
pub(crate) struct RemoteIdentity(pub String);

impl RemoteIdentity {
    /// Reads the peer address the server recorded for this connection, falling
    /// back to a `MockConnectInfo` layer the same way axum's `ConnectInfo` does.
    pub(crate) fn from_extensions(extensions: &Extensions) -> Option<Self> {
        extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr)
            .or_else(|| {
                extensions
                    .get::<MockConnectInfo<SocketAddr>>()
                    .map(|MockConnectInfo(addr)| addr)
            })
            .map(|addr| RemoteIdentity(addr.to_string()))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RemoteIdentity
where
    S: Send + Sync,
{
    type Rejection = RejectionType;

    // The server is started with connect info enabled, so a missing address means
    // the router was mounted without it.
    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_extensions(&parts.extensions).ok_or((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Remote address unavailable".to_string(),
        ))
    }
}

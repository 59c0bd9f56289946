use crate::error::Result;
use crate::extractors::remote_identity::RemoteIdentity;
use crate::middleware::apply_cors_headers;
use crate::params::stream::StreamParams;
use crate::AppState;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use log::*;
use sse::{ChannelWriter, Session};

/// Header telling the client how many data events a bounded stream will carry.
pub(crate) static X_EXPECTED_EVENTS: HeaderName = HeaderName::from_static("x-expected-events");

/// SSE handler for `GET /stream`.
///
/// Validates the request, registers the client and hands the session to its own
/// task. The response returns immediately; its body carries events as the task
/// produces them and ends when the session does.
pub(crate) async fn stream_handler(
    State(app_state): State<AppState>,
    RemoteIdentity(remote): RemoteIdentity,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Result<Response> {
    let requested_count = StreamParams::from_query(&query).requested_count()?;
    let resume_cursor = headers
        .get("last-event-id")
        .and_then(|value| value.to_str().ok());

    let session = Session::start(
        &app_state.client_registry,
        remote,
        resume_cursor,
        requested_count,
        app_state.config.event_interval(),
    );

    let (mut writer, sse) = ChannelWriter::channel();
    tokio::spawn(async move {
        let remote = session.client().remote().to_string();
        match session.run(&mut writer).await {
            Ok(()) => debug!("Stream to {remote} finished"),
            Err(e) if e.is_disconnect() => debug!("Stream to {remote} interrupted: {e}"),
            Err(e) => error!("Stream to {remote} failed: {e}"),
        }
    });

    // `Sse` already sets the event-stream content type and `no-cache`.
    let mut response = sse.into_response();
    let response_headers = response.headers_mut();
    response_headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    apply_cors_headers(response_headers);
    if let Some(count) = requested_count {
        response_headers.insert(X_EXPECTED_EVENTS.clone(), HeaderValue::from(count));
    }

    Ok(response)
}

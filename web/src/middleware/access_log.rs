use axum::{
    body::{Body, Bytes, HttpBody},
    extract::{Request, State},
    http::{Method, StatusCode, Uri},
    middleware::Next,
    response::Response,
};
use http_body::{Frame, SizeHint};
use log::*;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::Instant;

use crate::extractors::remote_identity::RemoteIdentity;

/// One completed request as recorded by the access log.
#[derive(Debug, Clone)]
pub struct AccessEntry {
    pub remote: String,
    pub method: Method,
    pub uri: Uri,
    pub status: StatusCode,
    pub elapsed: Duration,
}

impl fmt::Display for AccessEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "<- {}: {} {} {} ({:?})",
            self.remote,
            self.method,
            self.uri,
            self.status.as_u16(),
            self.elapsed
        )
    }
}

/// Destination for access log entries.
pub trait AccessLogWriter: Send + Sync {
    fn record(&self, entry: &AccessEntry);
}

/// Writes each entry through the `log` facade at info level.
pub struct LogAccessWriter;

impl AccessLogWriter for LogAccessWriter {
    fn record(&self, entry: &AccessEntry) {
        info!("{entry}");
    }
}

/// Entry whose status is known but whose body is still being sent.
/// Recorded when dropped, i.e. when the body completes or the peer goes away.
struct PendingEntry {
    writer: Arc<dyn AccessLogWriter>,
    remote: String,
    method: Method,
    uri: Uri,
    status: StatusCode,
    start: Instant,
}

impl Drop for PendingEntry {
    fn drop(&mut self) {
        self.writer.record(&AccessEntry {
            remote: std::mem::take(&mut self.remote),
            method: self.method.clone(),
            uri: self.uri.clone(),
            status: self.status,
            elapsed: self.start.elapsed(),
        });
    }
}

/// Response body that records its access log entry once it is dropped.
///
/// Frames, end-of-stream and size hint all come from the inner body, so a fixed
/// size response keeps its `Content-Length`.
struct LoggedBody {
    inner: Body,
    _pending: PendingEntry,
}

impl HttpBody for LoggedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Pin::new(&mut self.get_mut().inner).poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

/// Access logging middleware.
///
/// The timer starts before the inner handler runs and stops once the response
/// body has been fully sent, so a streaming response is logged with the length
/// of the whole stream and the status it was answered with.
pub async fn log_access(
    State(writer): State<Arc<dyn AccessLogWriter>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let remote = RemoteIdentity::from_extensions(request.extensions())
        .map(|RemoteIdentity(remote)| remote)
        .unwrap_or_else(|| "-".to_string());
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    let pending = PendingEntry {
        writer,
        remote,
        method,
        uri,
        status: response.status(),
        start,
    };
    let (parts, inner) = response.into_parts();
    let body = Body::new(LoggedBody {
        inner,
        _pending: pending,
    });

    Response::from_parts(parts, body)
}

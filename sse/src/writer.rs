use crate::error::Error;
use crate::message::EventFrame;
use async_stream::stream;
use async_trait::async_trait;
use axum::response::sse::{Event, Sse};
use futures::Stream;
use log::*;
use std::convert::Infallible;
use tokio::sync::mpsc;

/// Sink for outgoing events.
///
/// Every call to `emit` must hand one complete frame to the transport before
/// returning; a failure means the peer is gone and is never retried.
#[async_trait]
pub trait FrameWriter: Send {
    async fn emit(&mut self, id: &str, payload: &str) -> Result<(), Error>;
}

/// Writes events into an SSE response through a single-slot channel.
///
/// The response sends each event as its own frame, so the server pushes it to
/// the socket as soon as it is produced. With one slot, a peer that stops reading
/// stalls the writing session at the next `emit`.
pub struct ChannelWriter {
    sender: mpsc::Sender<Event>,
}

impl ChannelWriter {
    /// Creates a writer together with the SSE response that drains it.
    /// Dropping the response (peer disconnect) makes later writes fail.
    pub fn channel() -> (Self, Sse<impl Stream<Item = Result<Event, Infallible>>>) {
        let (sender, mut receiver) = mpsc::channel::<Event>(1);

        let events = stream! {
            while let Some(event) = receiver.recv().await {
                yield Ok::<_, Infallible>(event);
            }
        };

        (Self { sender }, Sse::new(events))
    }
}

#[async_trait]
impl FrameWriter for ChannelWriter {
    async fn emit(&mut self, id: &str, payload: &str) -> Result<(), Error> {
        trace!("Emitting event {id}");
        let event = EventFrame::new(id, payload).to_event();

        self.sender.send(event).await.map_err(Error::disconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::response::IntoResponse;

    #[tokio::test]
    async fn emitted_frames_arrive_in_body_order() {
        let (mut writer, sse) = ChannelWriter::channel();

        let producer = tokio::spawn(async move {
            writer.emit("hello", "Hello!").await.unwrap();
            writer.emit("message-1", "a\nb").await.unwrap();
        });

        let body = sse.into_response().into_body();
        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        producer.await.unwrap();

        assert_eq!(
            bytes,
            Bytes::from_static(b"id: hello\ndata: Hello!\n\nid: message-1\ndata: a\ndata: b\n\n")
        );
    }

    #[tokio::test]
    async fn response_is_an_event_stream() {
        let (_writer, sse) = ChannelWriter::channel();

        let response = sse.into_response();

        assert_eq!(
            response.headers()[axum::http::header::CONTENT_TYPE],
            "text/event-stream"
        );
    }

    #[tokio::test]
    async fn emit_fails_once_body_is_dropped() {
        let (mut writer, sse) = ChannelWriter::channel();
        drop(sse);

        let err = writer.emit("hello", "Hello!").await.unwrap_err();

        assert!(err.is_disconnect());
    }
}

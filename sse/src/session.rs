use crate::connection::{Client, ClientRegistry, Registration};
use crate::error::Error;
use crate::message::{self, Payload, GREETING_ID, MESSAGE_ID_PREFIX};
use crate::random::{generate_random_string, RANDOM_STRING_LENGTH};
use crate::writer::FrameWriter;
use chrono::Utc;
use log::*;
use std::sync::Arc;
use std::time::Duration;

/// Cursor a session starts from when the client sends no usable `Last-Event-Id`.
pub const DEFAULT_START_CURSOR: u64 = 1;

/// Delay between two data events.
pub const DEFAULT_EVENT_INTERVAL: Duration = Duration::from_secs(1);

/// Parses a resumption cursor of the form `message-<n>`.
///
/// Anything else yields `None` and the caller keeps its default.
pub fn parse_cursor(value: &str) -> Option<u64> {
    value
        .trim()
        .strip_prefix(MESSAGE_ID_PREFIX)
        .and_then(|n| n.parse::<u64>().ok())
}

/// Cursor at which a session stops, or `None` for an unbounded session.
///
/// The terminal cursor itself is never emitted. A bounded session whose end would
/// overflow the cursor range saturates to `u64::MAX`, the same limit an unbounded
/// session stops at, so `message-18446744073709551615` is never sent.
pub fn terminal_cursor(start: u64, requested_count: Option<u64>) -> Option<u64> {
    requested_count.map(|count| start.saturating_add(count))
}

/// One client's event stream, from greeting to termination.
pub struct Session {
    registration: Registration,
    terminal_cursor: Option<u64>,
    interval: Duration,
}

impl Session {
    /// Registers the client and fixes the session's cursor range.
    pub fn start(
        registry: &Arc<ClientRegistry>,
        remote: impl Into<String>,
        resume_cursor: Option<&str>,
        requested_count: Option<u64>,
        interval: Duration,
    ) -> Self {
        let start = resume_cursor
            .and_then(parse_cursor)
            .unwrap_or(DEFAULT_START_CURSOR);
        let registration = Registration::register(registry, Client::new(remote.into(), start));

        info!(
            "Handling incoming request from {} @ {}...",
            registration.client().remote(),
            start
        );

        Self {
            registration,
            terminal_cursor: terminal_cursor(start, requested_count),
            interval,
        }
    }

    pub fn client(&self) -> &Arc<Client> {
        self.registration.client()
    }

    pub fn terminal_cursor(&self) -> Option<u64> {
        self.terminal_cursor
    }

    /// Sends the greeting, then one data event per interval until the terminal
    /// cursor (`u64::MAX` when unbounded) is reached or a write fails.
    ///
    /// The client leaves the registry when this returns, whatever the outcome.
    pub async fn run<W>(self, writer: &mut W) -> Result<(), Error>
    where
        W: FrameWriter + ?Sized,
    {
        let client = Arc::clone(self.client());

        writer
            .emit(GREETING_ID, &message::greeting(client.remote()))
            .await?;

        let end = self.terminal_cursor.unwrap_or(u64::MAX);
        let mut cursor = client.last_event_id();
        while cursor < end {
            tokio::time::sleep(self.interval).await;

            let payload = Payload {
                time: Utc::now().timestamp(),
                random: generate_random_string(cursor, RANDOM_STRING_LENGTH),
            }
            .to_json()?;
            writer.emit(&message::message_id(cursor), &payload).await?;

            cursor += 1;
            client.set_last_event_id(cursor);
        }

        debug!("Stream to {} completed at {}", client.remote(), cursor);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use async_trait::async_trait;
    use serde_json::Value;
    use tokio::time::Instant;

    #[derive(Default)]
    struct RecordingWriter {
        events: Vec<(String, String)>,
        emitted_at: Vec<Instant>,
        fail_after: Option<usize>,
    }

    impl RecordingWriter {
        fn failing_after(n: usize) -> Self {
            Self {
                fail_after: Some(n),
                ..Default::default()
            }
        }

        fn ids(&self) -> Vec<&str> {
            self.events.iter().map(|(id, _)| id.as_str()).collect()
        }
    }

    #[async_trait]
    impl FrameWriter for RecordingWriter {
        async fn emit(&mut self, id: &str, payload: &str) -> Result<(), Error> {
            if self.fail_after == Some(self.events.len()) {
                return Err(Error::disconnected(std::io::Error::from(
                    std::io::ErrorKind::BrokenPipe,
                )));
            }
            self.events.push((id.to_string(), payload.to_string()));
            self.emitted_at.push(Instant::now());
            Ok(())
        }
    }

    fn registry() -> Arc<ClientRegistry> {
        Arc::new(ClientRegistry::new())
    }

    #[test]
    fn parse_cursor_accepts_message_ids() {
        assert_eq!(parse_cursor("message-0"), Some(0));
        assert_eq!(parse_cursor("message-5"), Some(5));
        assert_eq!(parse_cursor(" message-12 "), Some(12));
    }

    #[test]
    fn parse_cursor_ignores_malformed_values() {
        assert_eq!(parse_cursor(""), None);
        assert_eq!(parse_cursor("hello"), None);
        assert_eq!(parse_cursor("message-"), None);
        assert_eq!(parse_cursor("message--3"), None);
        assert_eq!(parse_cursor("message-abc"), None);
        assert_eq!(parse_cursor("5"), None);
    }

    #[test]
    fn terminal_cursor_adds_count() {
        assert_eq!(terminal_cursor(1, Some(3)), Some(4));
        assert_eq!(terminal_cursor(5, Some(0)), Some(5));
    }

    #[test]
    fn terminal_cursor_saturates_on_overflow() {
        assert_eq!(terminal_cursor(7, Some(u64::MAX)), Some(u64::MAX));
        assert_eq!(terminal_cursor(u64::MAX, Some(1)), Some(u64::MAX));
    }

    #[test]
    fn terminal_cursor_is_unbounded_without_count() {
        assert_eq!(terminal_cursor(1, None), None);
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_session_emits_greeting_then_count_events() {
        let registry = registry();
        let session = Session::start(
            &registry,
            "10.0.0.1:4000",
            None,
            Some(3),
            DEFAULT_EVENT_INTERVAL,
        );
        let mut writer = RecordingWriter::default();

        session.run(&mut writer).await.unwrap();

        assert_eq!(
            writer.ids(),
            vec!["hello", "message-1", "message-2", "message-3"]
        );
        assert_eq!(writer.events[0].1, "Hello, 10.0.0.1:4000!");
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn session_resumes_from_cursor() {
        let registry = registry();
        let session = Session::start(
            &registry,
            "10.0.0.1:4000",
            Some("message-5"),
            Some(2),
            DEFAULT_EVENT_INTERVAL,
        );
        let mut writer = RecordingWriter::default();

        session.run(&mut writer).await.unwrap();

        assert_eq!(writer.ids(), vec!["hello", "message-5", "message-6"]);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_cursor_falls_back_to_default() {
        let session = Session::start(
            &registry(),
            "10.0.0.1:4000",
            Some("garbage"),
            Some(1),
            DEFAULT_EVENT_INTERVAL,
        );
        let mut writer = RecordingWriter::default();

        session.run(&mut writer).await.unwrap();

        assert_eq!(writer.ids(), vec!["hello", "message-1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_count_sends_only_greeting() {
        let session = Session::start(&registry(), "a:1", None, Some(0), DEFAULT_EVENT_INTERVAL);
        let mut writer = RecordingWriter::default();

        session.run(&mut writer).await.unwrap();

        assert_eq!(writer.ids(), vec!["hello"]);
    }

    #[tokio::test(start_paused = true)]
    async fn events_are_spaced_by_interval() {
        let session = Session::start(&registry(), "a:1", None, Some(3), DEFAULT_EVENT_INTERVAL);
        let mut writer = RecordingWriter::default();

        session.run(&mut writer).await.unwrap();

        for pair in writer.emitted_at.windows(2) {
            assert_eq!(pair[1] - pair[0], DEFAULT_EVENT_INTERVAL);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn near_max_cursor_saturates_and_completes() {
        let start = u64::MAX - 2;
        let resume = format!("message-{start}");
        let session = Session::start(
            &registry(),
            "a:1",
            Some(resume.as_str()),
            Some(u64::MAX),
            DEFAULT_EVENT_INTERVAL,
        );
        assert_eq!(session.terminal_cursor(), Some(u64::MAX));
        let mut writer = RecordingWriter::default();

        session.run(&mut writer).await.unwrap();

        assert_eq!(writer.events.len(), 3);
        assert_eq!(writer.ids()[2], format!("message-{}", u64::MAX - 1));
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_session_stops_at_same_limit_as_bounded() {
        let start = u64::MAX - 2;
        let resume = format!("message-{start}");
        let session = Session::start(
            &registry(),
            "a:1",
            Some(resume.as_str()),
            None,
            DEFAULT_EVENT_INTERVAL,
        );
        assert_eq!(session.terminal_cursor(), None);
        let mut writer = RecordingWriter::default();

        session.run(&mut writer).await.unwrap();

        assert_eq!(
            writer.ids(),
            vec![
                "hello".to_string(),
                format!("message-{}", u64::MAX - 2),
                format!("message-{}", u64::MAX - 1),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn payload_is_json_with_deterministic_random() {
        let session = Session::start(
            &registry(),
            "a:1",
            Some("message-8"),
            Some(1),
            DEFAULT_EVENT_INTERVAL,
        );
        let mut writer = RecordingWriter::default();

        session.run(&mut writer).await.unwrap();

        let payload: Value = serde_json::from_str(&writer.events[1].1).unwrap();
        assert!(payload["time"].is_i64());
        assert_eq!(
            payload["random"],
            generate_random_string(8, RANDOM_STRING_LENGTH)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn write_failure_ends_session_and_unregisters() {
        let registry = registry();
        let session = Session::start(&registry, "a:1", None, None, DEFAULT_EVENT_INTERVAL);
        assert_eq!(registry.len(), 1);
        let mut writer = RecordingWriter::failing_after(3);

        let err = session.run(&mut writer).await.unwrap_err();

        assert_eq!(err.error_kind, ErrorKind::Disconnected);
        assert_eq!(writer.ids(), vec!["hello", "message-1", "message-2"]);
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_greeting_unregisters_client() {
        let registry = registry();
        let session = Session::start(&registry, "a:1", None, Some(5), DEFAULT_EVENT_INTERVAL);
        let mut writer = RecordingWriter::failing_after(0);

        assert!(session.run(&mut writer).await.is_err());
        assert!(writer.events.is_empty());
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cursor_in_registry_tracks_emitted_events() {
        let registry = registry();
        let session = Session::start(&registry, "a:1", None, None, DEFAULT_EVENT_INTERVAL);
        let client = Arc::clone(session.client());
        let mut writer = RecordingWriter::failing_after(4);

        let _ = session.run(&mut writer).await;

        // hello, message-1, message-2, message-3 went out; message-4 is pending.
        assert_eq!(client.last_event_id(), 4);
    }
}

use axum::response::sse::Event;
use serde::Serialize;

/// Id prefix shared by every steady-state event; the numeric suffix is the cursor.
pub const MESSAGE_ID_PREFIX: &str = "message-";

/// Id of the one-time event sent when a session opens.
pub const GREETING_ID: &str = "hello";

/// One logical event before it goes out on the wire.
///
/// On the wire this is an `id:` line, one `data:` line per payload line and a
/// terminating blank line. Multi-line payloads are never joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFrame<'a> {
    pub id: &'a str,
    pub payload: &'a str,
}

impl<'a> EventFrame<'a> {
    pub fn new(id: &'a str, payload: &'a str) -> Self {
        Self { id, payload }
    }

    /// Builds the SSE event for this frame.
    ///
    /// `\r\n` and a lone `\r` both count as line breaks. An empty payload carries
    /// no `data:` line at all.
    pub fn to_event(&self) -> Event {
        let lines: Vec<&str> = self
            .payload
            .lines()
            .flat_map(|line| line.split('\r'))
            .collect();

        let event = Event::default().id(self.id);
        if lines.is_empty() {
            event
        } else {
            event.data(lines.join("\n"))
        }
    }
}

/// Id for the data event at `cursor`.
pub fn message_id(cursor: u64) -> String {
    format!("{MESSAGE_ID_PREFIX}{cursor}")
}

/// Body of the greeting event.
pub fn greeting(remote: &str) -> String {
    format!("Hello, {remote}!")
}

/// JSON payload carried by every data event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Payload {
    /// Wall-clock time of emission, in unix seconds.
    pub time: i64,
    pub random: String,
}

impl Payload {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

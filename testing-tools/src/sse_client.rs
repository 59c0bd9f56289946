use anyhow::Result;
use eventsource_client::{self as es, Client};
use futures_util::stream::StreamExt;
use log::*;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub struct Event {
    pub id: String,
    pub data: String,
    pub timestamp: Instant,
}

/// Body of a `message-<n>` event.
#[derive(Debug, Clone, Deserialize)]
pub struct Payload {
    pub time: i64,
    pub random: String,
}

impl Event {
    pub fn payload(&self) -> Result<Payload> {
        Ok(serde_json::from_str(&self.data)?)
    }
}

/// Options for opening a stream.
#[derive(Debug, Clone, Default)]
pub struct StreamRequest {
    pub count: Option<u64>,
    pub last_event_id: Option<String>,
    pub token: Option<String>,
}

pub struct Connection {
    pub label: String,
    event_rx: mpsc::UnboundedReceiver<Event>,
    handle: tokio::task::JoinHandle<()>,
}

impl Connection {
    pub async fn establish(base_url: &str, request: &StreamRequest, label: String) -> Result<Self> {
        let url = match request.count {
            Some(count) => format!("{}/stream?count={}", base_url, count),
            None => format!("{}/stream", base_url),
        };
        let (tx, rx) = mpsc::unbounded_channel();

        let mut builder = es::ClientBuilder::for_url(&url)?
            .reconnect(es::ReconnectOptions::reconnect(false).build());
        if let Some(token) = &request.token {
            builder = builder.header("Authorization", &format!("Bearer {}", token))?;
        }
        if let Some(last_event_id) = &request.last_event_id {
            builder = builder.header("Last-Event-ID", last_event_id)?;
        }
        let client = builder.build();

        let task_label = label.clone();
        let handle = tokio::spawn(async move {
            let mut stream = client.stream();

            loop {
                match stream.next().await {
                    Some(Ok(es::SSE::Event(event))) => {
                        let sse_event = Event {
                            id: event.id.unwrap_or_default(),
                            data: event.data,
                            timestamp: Instant::now(),
                        };

                        if tx.send(sse_event).is_err() {
                            debug!("SSE receiver dropped for {}", task_label);
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        // Reconnects are disabled, so any error ends the stream.
                        debug!("SSE stream for {} ended: {:?}", task_label, e);
                        break;
                    }
                    None => {
                        debug!("SSE stream ended for {}", task_label);
                        break;
                    }
                }
            }
        });

        Ok(Self {
            label,
            event_rx: rx,
            handle,
        })
    }

    pub async fn wait_for_event(&mut self, id: &str, timeout: Duration) -> Result<Event> {
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                anyhow::bail!("Timeout waiting for event: {}", id);
            }

            match tokio::time::timeout(remaining, self.event_rx.recv()).await {
                Ok(Some(event)) if event.id == id => {
                    return Ok(event);
                }
                Ok(Some(_)) => {
                    continue;
                }
                Ok(None) => {
                    anyhow::bail!("SSE connection closed before event: {}", id);
                }
                Err(_) => {
                    anyhow::bail!("Timeout waiting for event: {}", id);
                }
            }
        }
    }

    /// Collects every event until the server ends the stream.
    pub async fn collect_until_closed(&mut self, timeout: Duration) -> Result<Vec<Event>> {
        let mut events = Vec::new();
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match tokio::time::timeout(remaining, self.event_rx.recv()).await {
                Ok(Some(event)) => events.push(event),
                Ok(None) => return Ok(events),
                Err(_) => anyhow::bail!(
                    "Stream still open after {:?} ({} events received)",
                    timeout,
                    events.len()
                ),
            }
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

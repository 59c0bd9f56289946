//! Server-Sent Events (SSE) streaming core.
//!
//! This crate holds everything a streaming connection needs below the HTTP layer.
//!
//! # Architecture
//!
//! - **One task per connection**: each `/stream` request runs its own `Session`,
//!   emitting strictly one event at a time at a fixed cadence.
//! - **Stateless resumption**: the server keeps no history. A client resuming at
//!   `message-<n>` gets the event recomputed from the deterministic generator in
//!   `random`, identical to the one first sent.
//! - **Shared registry**: `ClientRegistry` is a `DashMap` keyed by remote identity,
//!   written by sessions and read by the status endpoint. Locks are per shard and
//!   never held across a network write.
//! - **Scoped cleanup**: a session's `Registration` removes the client on drop, so
//!   every exit path (completion, disconnect, panic) leaves the registry clean.
//!
//! # Message Flow
//!
//! 1. The web layer validates the request and calls `Session::start`
//! 2. The client is registered with its starting cursor
//! 3. `ChannelWriter::channel` pairs a writer with the `Sse` response
//! 4. `Session::run` sends the `hello` greeting, then `message-<n>` events
//! 5. A write fails once the peer drops the response, ending the session
//!
//! # Modules
//!
//! - `connection`: Client metadata, ClientRegistry and the Registration guard
//! - `message`: Event ids, payloads and their mapping onto SSE events
//! - `writer`: The FrameWriter capability and its channel-backed implementation
//! - `session`: Cursor arithmetic and the per-connection emit loop
//! - `random`: Deterministic payload strings

pub mod connection;
pub mod error;
pub mod message;
pub mod random;
pub mod session;
pub mod writer;

pub use connection::{ClientRegistry, ClientView};
pub use session::Session;
pub use writer::{ChannelWriter, FrameWriter};

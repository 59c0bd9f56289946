//! Event stream HTTP handler for the web layer.
//!
//! This module contains only the Axum handler for the `/stream` endpoint.
//! The streaming core (Session, ClientRegistry, frame writing) lives in the
//! `sse` crate.

pub mod handler;

//! Error types for the `sse` crate.
//!
//! Follows the same pattern as the other layers with a root Error struct holding an
//! error kind and an optional source for error chaining.

use std::error::Error as StdError;
use std::fmt;

#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Ways a streaming session can fail.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    /// The peer went away: a frame could not be written or flushed.
    Disconnected,
    /// An event payload could not be serialized.
    Serialization,
}

impl Error {
    pub fn disconnected<E>(source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            source: Some(Box::new(source)),
            error_kind: ErrorKind::Disconnected,
        }
    }

    pub fn is_disconnect(&self) -> bool {
        self.error_kind == ErrorKind::Disconnected
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "SSE Error ({:?}): {source}", self.error_kind),
            None => write!(f, "SSE Error ({:?})", self.error_kind),
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

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self {
            source: Some(Box::new(err)),
            error_kind: ErrorKind::Serialization,
        }
    }
}

//! This module holds typed parameters for endpoint inputs.
//!
//! Each parameter type is a struct deserialized by an axum extractor, with the
//! validation that turns raw input into the values the handlers work with.

pub(crate) mod stream;

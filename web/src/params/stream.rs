use crate::error::{Error, Result};

/// Query parameters accepted by `GET /stream`.
///
/// `count` is kept as raw text so that a value that is not a number is treated
/// as absent instead of failing extraction.
#[derive(Debug, Default)]
pub(crate) struct StreamParams {
    pub(crate) count: Option<String>,
}

impl StreamParams {
    /// Picks the parameters out of the decoded query pairs. When a key repeats,
    /// the first occurrence wins and the rest are ignored.
    pub(crate) fn from_query(pairs: &[(String, String)]) -> Self {
        let count = pairs
            .iter()
            .find(|(key, _)| key == "count")
            .map(|(_, value)| value.clone());

        Self { count }
    }

    /// Number of data events requested, or `None` for an unbounded stream.
    ///
    /// Only a negative count is an error; anything else that does not parse as a
    /// non-negative integer (including values past the cursor range) means unbounded.
    pub(crate) fn requested_count(&self) -> Result<Option<u64>> {
        let Some(raw) = self.count.as_deref().map(str::trim) else {
            return Ok(None);
        };

        match raw.parse::<i128>() {
            Ok(n) if n < 0 => Err(Error::invalid_parameter(format!(
                "count must not be negative, got {n}"
            ))),
            Ok(n) => Ok(u64::try_from(n).ok()),
            Err(_) if is_negative_integer(raw) => Err(Error::invalid_parameter(format!(
                "count must not be negative, got {raw}"
            ))),
            Err(_) => Ok(None),
        }
    }
}

// Negative numbers too large for i128 are still negative.
fn is_negative_integer(raw: &str) -> bool {
    raw.strip_prefix('-')
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

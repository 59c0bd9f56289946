use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Length of the random string carried by each data event.
pub const RANDOM_STRING_LENGTH: usize = 16;

/// Returns an alphanumeric string derived only from `seed` and `length`.
///
/// Resuming a stream at cursor `n` depends on this producing the same value it
/// produced the first time `n` was sent, so no other entropy may leak in.
pub fn generate_random_string(seed: u64, length: usize) -> String {
    StdRng::seed_from_u64(seed)
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

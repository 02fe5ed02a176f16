//! Retry with exponential backoff for transient page fetches.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::FetchError;
use crate::pause::Pause;
use crate::source::{PageFetch, PageSource};

/// `base * 2^attempt` plus up to `max_jitter_seconds` of random jitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffPolicy {
    pub base_seconds: f64,
    pub max_attempts: u32,
    pub max_jitter_seconds: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_seconds: 1.0,
            max_attempts: 3,
            max_jitter_seconds: 0.5,
        }
    }
}

impl BackoffPolicy {
    /// Delay after the failed attempt with 0-based index `attempt`
    pub fn delay_for<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let exp = self.base_seconds * 2f64.powi(attempt.min(16) as i32);
        let jitter = if self.max_jitter_seconds > 0.0 {
            rng.gen_range(0.0..=self.max_jitter_seconds)
        } else {
            0.0
        };
        Duration::try_from_secs_f64(exp + jitter).unwrap_or(Duration::MAX)
    }
}

/// Ask `source` for its next page, retrying transient failures.
///
/// Sleeps the backoff delay after every failed attempt, including the last,
/// and returns the last error once `max_attempts` are used up.
pub fn fetch_with_retry<R: Rng + ?Sized>(
    source: &mut dyn PageSource,
    policy: &BackoffPolicy,
    pause: &mut dyn Pause,
    rng: &mut R,
) -> Result<PageFetch, FetchError> {
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match source.next_page(pause) {
            Ok(fetch) => return Ok(fetch),
            Err(e) => {
                let delay = policy.delay_for(attempt, rng);
                warn!(
                    "Fetch attempt {}/{} failed: {} (backing off {:.1}s)",
                    attempt + 1,
                    attempts,
                    e,
                    delay.as_secs_f64()
                );
                pause.pause(delay);
                attempt += 1;
                if attempt >= attempts {
                    return Err(e);
                }
            }
        }
    }
}

//! Blocking waits.
//!
//! Every wait in a run (readiness polling, scroll settle, politeness delay,
//! backoff) goes through [`Pause`] so fixture runs can record waits instead
//! of sleeping.

use std::thread;
use std::time::Duration;

use rand::Rng;

pub trait Pause {
    fn pause(&mut self, duration: Duration);
}

/// Real sleep on the current thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPause;

impl Pause for ThreadPause {
    fn pause(&mut self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

/// Uniformly random duration within `(min, max)` seconds.
/// Negative values clamp to zero and overlong ones to `Duration::MAX`.
pub fn random_delay<R: Rng + ?Sized>(rng: &mut R, (min, max): (f64, f64)) -> Duration {
    let secs = if max <= min {
        min
    } else {
        rng.gen_range(min..=max)
    };
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX)
}

//! Scroll a view until its rendered size stops growing.

use std::time::Duration;

use tracing::debug;

use crate::error::FetchError;
use crate::pause::Pause;
use crate::session::BrowserSession;

#[derive(Debug, Clone)]
pub struct ScrollStabilizer {
    max_iterations: u32,
    settle: Duration,
}

impl ScrollStabilizer {
    pub fn new(max_iterations: u32, settle: Duration) -> Self {
        Self {
            max_iterations,
            settle,
        }
    }

    /// Scroll to the bottom, wait `settle`, compare the size metric; repeat
    /// until it stops changing or the budget is spent.
    ///
    /// Returns whether the metric grew at least once.
    pub fn stabilize(
        &self,
        session: &mut dyn BrowserSession,
        pause: &mut dyn Pause,
    ) -> Result<bool, FetchError> {
        let mut previous = session.current_size_metric()?;
        let mut grew = false;

        for i in 0..self.max_iterations {
            session.scroll_to_bottom()?;
            pause.pause(self.settle);
            let current = session.current_size_metric()?;

            if current == previous {
                debug!("Reached page end at scroll {}", i + 1);
                break;
            }
            if current > previous {
                grew = true;
            }
            debug!("Scrolled {}/{} (size {} -> {})", i + 1, self.max_iterations, previous, current);
            previous = current;
        }

        Ok(grew)
    }
}

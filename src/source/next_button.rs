//! Listings advanced by clicking a "Next" control.

use std::time::Duration;

use tracing::info;

use super::{capture, PageFetch, PageSource};
use crate::error::FetchError;
use crate::pause::Pause;
use crate::scroll::ScrollStabilizer;
use crate::session::BrowserSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Initial navigation not done yet
    Navigate,
    /// Current page consumed; click Next
    Advance,
    /// Navigation done, snapshot pending
    Capture,
}

pub struct NextButtonSource<'s> {
    session: &'s mut dyn BrowserSession,
    url: String,
    stabilizer: ScrollStabilizer,
    timeout: Duration,
    step: Step,
    page: u32,
}

impl<'s> NextButtonSource<'s> {
    pub fn new(
        session: &'s mut dyn BrowserSession,
        url: String,
        stabilizer: ScrollStabilizer,
        timeout: Duration,
    ) -> Self {
        Self {
            session,
            url,
            stabilizer,
            timeout,
            step: Step::Navigate,
            page: 1,
        }
    }
}

impl PageSource for NextButtonSource<'_> {
    fn next_page(&mut self, pause: &mut dyn Pause) -> Result<PageFetch, FetchError> {
        match self.step {
            Step::Navigate => {
                info!("Page {}: {}", self.page, self.url);
                self.session.goto(&self.url)?;
            }
            Step::Advance => {
                if !self.session.advance_next()? {
                    info!("Reached last page (Next control absent or disabled)");
                    return Ok(PageFetch::EndOfPages);
                }
                info!("Page {}: clicked Next", self.page);
            }
            Step::Capture => {}
        }
        self.step = Step::Capture;

        let url = self.session.current_url().unwrap_or_else(|| self.url.clone());
        let snapshot = capture(
            &mut *self.session,
            pause,
            &self.stabilizer,
            self.page,
            &url,
            self.timeout,
        )?;

        self.step = Step::Advance;
        self.page += 1;
        Ok(PageFetch::Snapshot(snapshot))
    }

    fn skip(&mut self) {
        // Nothing to advance from until the first page has loaded
        if self.step != Step::Navigate {
            self.step = Step::Advance;
            self.page += 1;
        }
    }
}

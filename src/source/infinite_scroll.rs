//! Infinite-scroll listings: the same view, revealed a budget at a time.

use std::time::Duration;

use tracing::info;

use super::{wait_until_ready, PageFetch, PageSource, RawSnapshot};
use crate::error::FetchError;
use crate::pause::Pause;
use crate::scroll::ScrollStabilizer;
use crate::session::BrowserSession;

pub struct InfiniteScrollSource<'s> {
    session: &'s mut dyn BrowserSession,
    url: String,
    stabilizer: ScrollStabilizer,
    timeout: Duration,
    loaded: bool,
    page: u32,
}

impl<'s> InfiniteScrollSource<'s> {
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
            loaded: false,
            page: 1,
        }
    }

    fn snapshot(&mut self, grew: bool) -> Result<PageFetch, FetchError> {
        let markup = self.session.get_content()?;
        let size_metric = self.session.current_size_metric()?;
        let snapshot = RawSnapshot {
            page_number: self.page,
            url: self.url.clone(),
            markup,
            size_metric,
            grew,
        };
        self.page += 1;
        Ok(PageFetch::Snapshot(snapshot))
    }
}

impl PageSource for InfiniteScrollSource<'_> {
    fn next_page(&mut self, pause: &mut dyn Pause) -> Result<PageFetch, FetchError> {
        if !self.loaded {
            info!("Loading {}", self.url);
            self.session.goto(&self.url)?;
            wait_until_ready(&mut *self.session, pause, &self.url, self.timeout)?;
            self.loaded = true;
            let grew = self.stabilizer.stabilize(&mut *self.session, pause)?;
            return self.snapshot(grew);
        }

        info!("Scroll round {}", self.page);
        let grew = self.stabilizer.stabilize(&mut *self.session, pause)?;
        if !grew {
            info!("No further growth; end of feed");
            return Ok(PageFetch::EndOfPages);
        }
        self.snapshot(grew)
    }

    fn skip(&mut self) {
        self.page += 1;
    }
}

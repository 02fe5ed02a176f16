//! URL-paginated listings: one navigation per page number.

use std::time::Duration;

use tracing::info;

use super::{capture, PageFetch, PageSource};
use crate::config::PAGE_PLACEHOLDER;
use crate::error::FetchError;
use crate::pause::Pause;
use crate::scroll::ScrollStabilizer;
use crate::session::BrowserSession;

pub struct UrlTemplateSource<'s> {
    session: &'s mut dyn BrowserSession,
    template: String,
    first_page_url: Option<String>,
    start_page: u32,
    current: u32,
    stabilizer: ScrollStabilizer,
    timeout: Duration,
}

impl<'s> UrlTemplateSource<'s> {
    pub fn new(
        session: &'s mut dyn BrowserSession,
        template: String,
        first_page_url: Option<String>,
        start_page: u32,
        stabilizer: ScrollStabilizer,
        timeout: Duration,
    ) -> Self {
        Self {
            session,
            template,
            first_page_url,
            start_page,
            current: start_page,
            stabilizer,
            timeout,
        }
    }

    /// URL for page `n`; the first page may have its own URL
    pub fn url_for_page(&self, n: u32) -> String {
        match &self.first_page_url {
            Some(first) if n == self.start_page => first.clone(),
            _ => self.template.replace(PAGE_PLACEHOLDER, &n.to_string()),
        }
    }
}

impl PageSource for UrlTemplateSource<'_> {
    fn next_page(&mut self, pause: &mut dyn Pause) -> Result<PageFetch, FetchError> {
        let url = self.url_for_page(self.current);
        info!("Page {}: {}", self.current, url);

        self.session.goto(&url)?;
        let snapshot = capture(
            &mut *self.session,
            pause,
            &self.stabilizer,
            self.current,
            &url,
            self.timeout,
        )?;

        self.current += 1;
        Ok(PageFetch::Snapshot(snapshot))
    }

    fn skip(&mut self) {
        self.current += 1;
    }
}

//! Page sources: successive raw snapshots from one site.
//!
//! Each variant hides how the site advances (URL pagination, infinite
//! scroll, a "Next" control) behind [`PageSource::next_page`].

mod infinite_scroll;
mod next_button;
mod url_template;

pub use infinite_scroll::*;
pub use next_button::*;
pub use url_template::*;

use std::time::Duration;

use tracing::debug;

use crate::config::{PaginationMode, RunConfig};
use crate::dom::has_body_content;
use crate::error::FetchError;
use crate::pause::Pause;
use crate::scroll::ScrollStabilizer;
use crate::session::BrowserSession;

/// Interval between readiness probes
pub const READY_POLL: Duration = Duration::from_millis(250);

/// Rendered content of one page or scroll state. Dropped after segmentation.
#[derive(Debug, Clone)]
pub struct RawSnapshot {
    pub page_number: u32,
    pub url: String,
    pub markup: String,
    pub size_metric: u64,
    /// Whether scrolling revealed more content while this snapshot was taken
    pub grew: bool,
}

#[derive(Debug, Clone)]
pub enum PageFetch {
    Snapshot(RawSnapshot),
    EndOfPages,
}

pub trait PageSource {
    /// Produce the current page. On error the source stays on the same page,
    /// so calling again retries it.
    fn next_page(&mut self, pause: &mut dyn Pause) -> Result<PageFetch, FetchError>;

    /// Give up on the current page and move past it
    fn skip(&mut self);
}

/// Build the source matching `mode` over `session`
pub fn for_mode<'s>(
    mode: &PaginationMode,
    session: &'s mut dyn BrowserSession,
    run: &RunConfig,
) -> Box<dyn PageSource + 's> {
    let stabilizer = ScrollStabilizer::new(run.max_scroll_iterations, run.scroll_pause());
    let timeout = run.load_timeout();
    match mode {
        PaginationMode::UrlTemplate {
            template,
            first_page_url,
            start_page,
        } => Box::new(UrlTemplateSource::new(
            session,
            template.clone(),
            first_page_url.clone(),
            *start_page,
            stabilizer,
            timeout,
        )),
        PaginationMode::InfiniteScroll { url } => Box::new(InfiniteScrollSource::new(
            session,
            url.clone(),
            stabilizer,
            timeout,
        )),
        PaginationMode::NextButton { url } => Box::new(NextButtonSource::new(
            session,
            url.clone(),
            stabilizer,
            timeout,
        )),
    }
}

/// Poll until the view has some body content, or fail with `LoadTimeout`
pub(crate) fn wait_until_ready(
    session: &mut dyn BrowserSession,
    pause: &mut dyn Pause,
    url: &str,
    timeout: Duration,
) -> Result<(), FetchError> {
    let mut waited = Duration::ZERO;
    loop {
        let markup = session.get_content()?;
        if has_body_content(&markup) {
            return Ok(());
        }
        if waited >= timeout {
            return Err(FetchError::LoadTimeout {
                url: url.to_string(),
                waited,
            });
        }
        pause.pause(READY_POLL);
        waited += READY_POLL;
    }
}

/// Readiness, then scroll-stabilize, then read the markup
pub(crate) fn capture(
    session: &mut dyn BrowserSession,
    pause: &mut dyn Pause,
    stabilizer: &ScrollStabilizer,
    page_number: u32,
    url: &str,
    timeout: Duration,
) -> Result<RawSnapshot, FetchError> {
    wait_until_ready(session, pause, url, timeout)?;
    let grew = stabilizer.stabilize(session, pause)?;
    let markup = session.get_content()?;
    let size_metric = session.current_size_metric()?;
    debug!("Captured page {} ({} bytes, size {})", page_number, markup.len(), size_metric);
    Ok(RawSnapshot {
        page_number,
        url: url.to_string(),
        markup,
        size_metric,
        grew,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixtureSession, RecordingPause};

    #[test]
    fn test_ready_page_needs_no_wait() {
        let url = "https://example.com/a";
        let mut session = FixtureSession::new().with_page(url, "<body><p>hi</p></body>");
        session.goto(url).unwrap();
        let mut pause = RecordingPause::default();
        wait_until_ready(&mut session, &mut pause, url, Duration::from_secs(1)).unwrap();
        assert!(pause.waits().is_empty());
    }

    #[test]
    fn test_blank_page_times_out() {
        let url = "https://example.com/blank";
        let mut session = FixtureSession::new().with_page(url, "<body>  </body>");
        session.goto(url).unwrap();
        let mut pause = RecordingPause::default();

        let err = wait_until_ready(&mut session, &mut pause, url, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, FetchError::LoadTimeout { .. }));
        // 1s budget at 250ms per probe
        assert_eq!(pause.waits().len(), 4);
    }
}

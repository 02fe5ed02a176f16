//! The rendered-content accessor the engine drives.
//!
//! A [`BrowserSession`] is one navigable viewport. The engine only ever
//! navigates, scrolls, reads markup and reads a size metric; launching and
//! configuring a real browser belongs to whoever implements the trait.

use std::ops::{Deref, DerefMut};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{FetchError, SessionError};

pub trait BrowserSession {
    /// Navigate the viewport to `url`
    fn goto(&mut self, url: &str) -> Result<(), FetchError>;

    /// Trigger a "load more" by scrolling to the bottom of the view
    fn scroll_to_bottom(&mut self) -> Result<(), FetchError>;

    /// Current rendered markup
    fn get_content(&mut self) -> Result<String, FetchError>;

    /// Height (or size) of the rendered content
    fn current_size_metric(&mut self) -> Result<u64, FetchError>;

    /// Activate the "Next" control. `Ok(false)` when it is absent or disabled.
    fn advance_next(&mut self) -> Result<bool, FetchError> {
        Ok(false)
    }

    /// URL currently shown, if known
    fn current_url(&self) -> Option<String> {
        None
    }

    /// Release the underlying resource. Called exactly once by [`ScopedSession`].
    fn close(&mut self) {}
}

/// Acquires a session once per run.
pub trait SessionLauncher {
    type Session: BrowserSession;

    fn launch(&mut self) -> Result<Self::Session, SessionError>;
}

/// Owns a session for the duration of a run and closes it on drop, so every
/// exit path (normal stop, interrupt, panic unwinding) releases it.
pub struct ScopedSession<S: BrowserSession> {
    inner: S,
}

impl<S: BrowserSession> ScopedSession<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S: BrowserSession> Deref for ScopedSession<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.inner
    }
}

impl<S: BrowserSession> DerefMut for ScopedSession<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.inner
    }
}

impl<S: BrowserSession> Drop for ScopedSession<S> {
    fn drop(&mut self) {
        debug!("Closing session");
        self.inner.close();
    }
}

/// Session over plain HTTP for server-rendered listing pages.
///
/// Scrolling is a no-op and the size metric is the body length, so the
/// stabilizer settles after one iteration.
pub struct HttpSession {
    agent: ureq::Agent,
    url: Option<String>,
    body: String,
    timeout: Duration,
}

impl HttpSession {
    pub fn new(user_agent: &str, timeout: Duration) -> Self {
        let agent = ureq::Agent::new_with_config(
            ureq::Agent::config_builder()
                .timeout_global(Some(timeout))
                .user_agent(user_agent)
                .build(),
        );
        Self {
            agent,
            url: None,
            body: String::new(),
            timeout,
        }
    }
}

impl BrowserSession for HttpSession {
    fn goto(&mut self, url: &str) -> Result<(), FetchError> {
        debug!("GET {}", url);
        let response = match self.agent.get(url).call() {
            Ok(resp) => resp,
            Err(ureq::Error::Timeout(_)) => {
                return Err(FetchError::LoadTimeout {
                    url: url.to_string(),
                    waited: self.timeout,
                });
            }
            Err(e) => {
                return Err(FetchError::Navigation {
                    url: url.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        self.body = response
            .into_body()
            .read_to_string()
            .map_err(|e| FetchError::Navigation {
                url: url.to_string(),
                reason: format!("failed to read body: {}", e),
            })?;
        self.url = Some(url.to_string());
        Ok(())
    }

    fn scroll_to_bottom(&mut self) -> Result<(), FetchError> {
        Ok(())
    }

    fn get_content(&mut self) -> Result<String, FetchError> {
        Ok(self.body.clone())
    }

    fn current_size_metric(&mut self) -> Result<u64, FetchError> {
        Ok(self.body.len() as u64)
    }

    fn current_url(&self) -> Option<String> {
        self.url.clone()
    }

    fn close(&mut self) {
        self.body.clear();
        self.url = None;
    }
}

/// Launches [`HttpSession`]s
#[derive(Debug, Clone)]
pub struct HttpLauncher {
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for HttpLauncher {
    fn default() -> Self {
        Self {
            user_agent: concat!("listing_harvest/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl SessionLauncher for HttpLauncher {
    type Session = HttpSession;

    fn launch(&mut self) -> Result<HttpSession, SessionError> {
        if self.user_agent.trim().is_empty() {
            return Err(SessionError::Launch("empty user agent".to_string()));
        }
        info!("Starting HTTP session ({:?} timeout)", self.timeout);
        Ok(HttpSession::new(&self.user_agent, self.timeout))
    }
}

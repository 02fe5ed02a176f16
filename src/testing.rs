//! Deterministic stand-ins for the session, clock and sink.
//!
//! These let the whole pipeline run against scripted pages with no network
//! and no real sleeping.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::controller::CancelFlag;
use crate::error::{FetchError, SessionError, SinkError};
use crate::pause::Pause;
use crate::record::Record;
use crate::session::{BrowserSession, SessionLauncher};
use crate::sink::{OutputFormat, ResultSink};

/// Size reported for fixture pages added without an explicit size
pub const DEFAULT_FIXTURE_SIZE: u64 = 4000;

/// Record of a call made to a [`FixtureSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCall {
    Goto(String),
    Scroll,
    Content,
    Size,
    Next,
    Close,
}

/// Scripted session: each URL maps to a list of (markup, size) states that
/// successive scrolls step through.
#[derive(Default)]
pub struct FixtureSession {
    views: HashMap<String, Vec<(String, u64)>>,
    next_chain: Vec<String>,
    failing: HashSet<String>,
    fail_everything: bool,
    current: Option<String>,
    state: usize,
    gotos: usize,
    cancel_on_goto: Option<(usize, CancelFlag)>,
    calls: Arc<Mutex<Vec<SessionCall>>>,
}

impl FixtureSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// A page that never changes when scrolled
    pub fn with_page(self, url: impl Into<String>, markup: impl Into<String>) -> Self {
        self.with_sized_page(url, markup, DEFAULT_FIXTURE_SIZE)
    }

    pub fn with_sized_page(
        mut self,
        url: impl Into<String>,
        markup: impl Into<String>,
        size: u64,
    ) -> Self {
        self.views.insert(url.into(), vec![(markup.into(), size)]);
        self
    }

    /// A page whose content grows through `states` as it is scrolled
    pub fn with_scroll_states<S: Into<String>>(
        mut self,
        url: impl Into<String>,
        states: Vec<(S, u64)>,
    ) -> Self {
        let states = states.into_iter().map(|(m, s)| (m.into(), s)).collect();
        self.views.insert(url.into(), states);
        self
    }

    /// Order in which the "Next" control moves between URLs
    pub fn with_next_chain(mut self, urls: Vec<String>) -> Self {
        self.next_chain = urls;
        self
    }

    /// Navigation to `url` always fails
    pub fn with_failing_url(mut self, url: impl Into<String>) -> Self {
        self.failing.insert(url.into());
        self
    }

    /// Every navigation fails
    pub fn failing_everywhere(mut self) -> Self {
        self.fail_everything = true;
        self
    }

    /// Raise `flag` when the `n`th navigation happens (1-based)
    pub fn cancel_on_goto(mut self, n: usize, flag: CancelFlag) -> Self {
        self.cancel_on_goto = Some((n, flag));
        self
    }

    /// Shared handle to the call log; stays valid after the session moves
    pub fn call_log(&self) -> Arc<Mutex<Vec<SessionCall>>> {
        Arc::clone(&self.calls)
    }

    fn log(&self, call: SessionCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn current_state(&self) -> Option<&(String, u64)> {
        let url = self.current.as_ref()?;
        let states = self.views.get(url)?;
        states.get(self.state.min(states.len().saturating_sub(1)))
    }

    fn navigate(&mut self, url: &str) -> Result<(), FetchError> {
        self.gotos += 1;
        if let Some((n, flag)) = &self.cancel_on_goto {
            if self.gotos == *n {
                flag.raise();
            }
        }

        if self.fail_everything || self.failing.contains(url) {
            return Err(FetchError::Navigation {
                url: url.to_string(),
                reason: "fixture failure".to_string(),
            });
        }
        if !self.views.contains_key(url) {
            return Err(FetchError::Navigation {
                url: url.to_string(),
                reason: "no fixture for url".to_string(),
            });
        }
        self.current = Some(url.to_string());
        self.state = 0;
        Ok(())
    }
}

impl BrowserSession for FixtureSession {
    fn goto(&mut self, url: &str) -> Result<(), FetchError> {
        self.log(SessionCall::Goto(url.to_string()));
        self.navigate(url)
    }

    fn scroll_to_bottom(&mut self) -> Result<(), FetchError> {
        self.log(SessionCall::Scroll);
        let len = self
            .current
            .as_ref()
            .and_then(|u| self.views.get(u))
            .map(|s| s.len())
            .unwrap_or(0);
        if self.state + 1 < len {
            self.state += 1;
        }
        Ok(())
    }

    fn get_content(&mut self) -> Result<String, FetchError> {
        self.log(SessionCall::Content);
        self.current_state()
            .map(|(markup, _)| markup.clone())
            .ok_or_else(|| FetchError::Session("no page loaded".to_string()))
    }

    fn current_size_metric(&mut self) -> Result<u64, FetchError> {
        self.log(SessionCall::Size);
        Ok(self.current_state().map(|(_, size)| *size).unwrap_or(0))
    }

    fn advance_next(&mut self) -> Result<bool, FetchError> {
        self.log(SessionCall::Next);
        let Some(current) = self.current.clone() else {
            return Ok(false);
        };
        let successor = self
            .next_chain
            .iter()
            .position(|u| *u == current)
            .and_then(|i| self.next_chain.get(i + 1))
            .cloned();
        match successor {
            Some(url) => {
                self.navigate(&url)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn current_url(&self) -> Option<String> {
        self.current.clone()
    }

    fn close(&mut self) {
        self.log(SessionCall::Close);
    }
}

/// Hands out one prepared [`FixtureSession`]
pub struct FixtureLauncher {
    session: Option<FixtureSession>,
}

impl FixtureLauncher {
    pub fn new(session: FixtureSession) -> Self {
        Self {
            session: Some(session),
        }
    }

    /// A launcher whose launch always fails
    pub fn unavailable() -> Self {
        Self { session: None }
    }
}

impl SessionLauncher for FixtureLauncher {
    type Session = FixtureSession;

    fn launch(&mut self) -> Result<FixtureSession, SessionError> {
        self.session
            .take()
            .ok_or_else(|| SessionError::Launch("fixture session unavailable".to_string()))
    }
}

/// Records requested waits instead of sleeping
#[derive(Debug, Default, Clone)]
pub struct RecordingPause {
    waits: Vec<Duration>,
}

impl RecordingPause {
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.clone()
    }

    pub fn total(&self) -> Duration {
        self.waits.iter().sum()
    }
}

impl Pause for RecordingPause {
    fn pause(&mut self, duration: Duration) {
        self.waits.push(duration);
    }
}

/// One call to [`MemorySink::write`]
#[derive(Debug, Clone)]
pub struct SinkWrite {
    pub records: Vec<Record>,
    pub destination: PathBuf,
    pub format: OutputFormat,
}

/// Keeps written records in memory; can be told to fail.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub writes: Vec<SinkWrite>,
    fail: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            writes: Vec::new(),
            fail: true,
        }
    }
}

impl ResultSink for MemorySink {
    fn write(
        &mut self,
        records: &[Record],
        destination: &Path,
        format: OutputFormat,
    ) -> Result<Option<PathBuf>, SinkError> {
        let path = destination.with_extension(format.extension());
        if self.fail {
            return Err(SinkError::Io {
                path,
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            });
        }
        self.writes.push(SinkWrite {
            records: records.to_vec(),
            destination: destination.to_path_buf(),
            format,
        });
        Ok(Some(path))
    }
}

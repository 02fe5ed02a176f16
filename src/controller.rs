//! The pagination loop.
//!
//! One worker, one page at a time: fetch (with retry and backoff), segment,
//! classify, dedup, then decide whether to stop. Stopping is always a
//! [`StopReason`], never an error, and whatever was accepted so far is
//! returned with it.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use scraper::Html;
use tracing::{info, warn};
use url::Url;

use crate::backoff::fetch_with_retry;
use crate::classify::FieldClassifier;
use crate::config::RunConfig;
use crate::dedup::Deduplicator;
use crate::pause::{random_delay, Pause};
use crate::record::Record;
use crate::segment::CardSegmenter;
use crate::source::{PageFetch, PageSource, RawSnapshot};

/// Operator abort signal shared between the loop and whoever raises it.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Returns whether it was already up.
    pub fn raise(&self) -> bool {
        self.0.swap(true, Ordering::SeqCst)
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    BudgetExhausted,
    SustainedEmptyPages,
    TooManyConsecutiveFailures,
    Interrupted,
    /// The source ran out of pages on its own
    EndOfPages,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::BudgetExhausted => "page budget exhausted",
            StopReason::SustainedEmptyPages => "too many consecutive empty pages",
            StopReason::TooManyConsecutiveFailures => "too many consecutive failures",
            StopReason::Interrupted => "interrupted",
            StopReason::EndOfPages => "no more pages",
        };
        f.write_str(text)
    }
}

/// Loop counters. Fresh for every run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationState {
    /// Pages attempted, failed ones included
    pub pages_visited: u32,
    pub consecutive_failures: u32,
    pub consecutive_empty: u32,
    pub accepted: usize,
    pub total_failures: u32,
    pub total_empty: u32,
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub records: Vec<Record>,
    pub stop_reason: StopReason,
    pub state: PaginationState,
}

pub struct PaginationController {
    run: RunConfig,
    segmenter: CardSegmenter,
    classifier: FieldClassifier,
    origin: Option<Url>,
    cancel: CancelFlag,
    dedup: Deduplicator,
    state: PaginationState,
    records: Vec<Record>,
    rng: StdRng,
}

impl PaginationController {
    pub fn new(
        run: RunConfig,
        segmenter: CardSegmenter,
        classifier: FieldClassifier,
        origin: Option<Url>,
        cancel: CancelFlag,
    ) -> Self {
        let rng = match run.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            dedup: Deduplicator::new(run.dedup_key),
            run,
            segmenter,
            classifier,
            origin,
            cancel,
            state: PaginationState::default(),
            records: Vec::new(),
            rng,
        }
    }

    /// Drive `source` until a stop condition holds.
    pub fn run(mut self, source: &mut dyn PageSource, pause: &mut dyn Pause) -> RunOutcome {
        let stop_reason = loop {
            if self.cancel.is_raised() {
                break StopReason::Interrupted;
            }

            let accepted = match fetch_with_retry(source, &self.run.retry, pause, &mut self.rng) {
                Ok(PageFetch::EndOfPages) => break StopReason::EndOfPages,
                Ok(PageFetch::Snapshot(snapshot)) => {
                    // A page still in flight when the abort came is dropped
                    if self.cancel.is_raised() {
                        break StopReason::Interrupted;
                    }
                    self.state.consecutive_failures = 0;
                    let accepted = self.process(snapshot);
                    if accepted == 0 {
                        self.state.consecutive_empty += 1;
                        self.state.total_empty += 1;
                    } else {
                        self.state.consecutive_empty = 0;
                    }
                    accepted
                }
                Err(e) => {
                    self.state.consecutive_failures += 1;
                    self.state.total_failures += 1;
                    warn!(
                        "Giving up on page after {} attempts ({} in a row): {}",
                        self.run.retry.max_attempts, self.state.consecutive_failures, e
                    );
                    source.skip();
                    0
                }
            };
            self.state.pages_visited += 1;

            if let Some(reason) = self.evaluate_stop() {
                break reason;
            }

            let range = if accepted > 0 {
                self.run.inter_page_delay_range
            } else {
                self.run.empty_page_delay_range
            };
            pause.pause(random_delay(&mut self.rng, range));
        };

        info!(
            "Stopped: {} after {} pages, {} unique records",
            stop_reason,
            self.state.pages_visited,
            self.records.len()
        );
        RunOutcome {
            records: self.records,
            stop_reason,
            state: self.state,
        }
    }

    /// Segment, classify and dedup one snapshot. Returns records accepted.
    fn process(&mut self, snapshot: RawSnapshot) -> usize {
        // A small page that was still growing is processed; one that never
        // grew is blocked or has nothing on it
        if snapshot.size_metric < self.run.min_page_size && !snapshot.grew {
            warn!(
                "Small page detected on page {} at {} (size {} < {}), treating as empty",
                snapshot.page_number, snapshot.url, snapshot.size_metric, self.run.min_page_size
            );
            return 0;
        }

        let document = Html::parse_document(&snapshot.markup);
        let cards = self.segmenter.segment(&document);
        info!("Page {}: {} job cards", snapshot.page_number, cards.len());

        let mut accepted = 0;
        for card in &cards {
            let record = self
                .classifier
                .assemble(card, snapshot.page_number, self.origin.as_ref());
            if self.dedup.accept(&record) {
                self.records.push(record);
                accepted += 1;
            }
        }
        self.state.accepted += accepted;

        info!(
            "Page {}: {} new, {} duplicates (total {})",
            snapshot.page_number,
            accepted,
            cards.len() - accepted,
            self.state.accepted
        );
        accepted
    }

    fn evaluate_stop(&self) -> Option<StopReason> {
        if self.cancel.is_raised() {
            return Some(StopReason::Interrupted);
        }
        if self.state.consecutive_failures >= self.run.max_consecutive_failures {
            return Some(StopReason::TooManyConsecutiveFailures);
        }
        if self.state.consecutive_empty > self.run.max_consecutive_empty_pages {
            return Some(StopReason::SustainedEmptyPages);
        }
        if self.state.pages_visited >= self.run.max_pages {
            return Some(StopReason::BudgetExhausted);
        }
        None
    }
}

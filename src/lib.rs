//! Incremental job-listing extraction engine
//!
//! Drives one browser-like session across a paginated or infinitely
//! scrolling listing site and turns each rendered page into records:
//! - Page sources for URL templates, infinite scroll and "Next" buttons
//! - Scroll stabilization before every snapshot
//! - Two-tier card segmentation (structural, then content-based)
//! - Ordered heuristic field classification with an `N/A` sentinel
//! - Run-scoped deduplication
//! - A pagination loop with retry/backoff and explicit stop reasons
//! - CSV, JSON and XML output

pub mod backoff;
pub mod classify;
pub mod config;
pub mod controller;
pub mod dedup;
pub mod dom;
pub mod error;
pub mod harvest;
pub mod pause;
pub mod record;
pub mod scroll;
pub mod segment;
pub mod session;
pub mod sink;
pub mod source;
pub mod testing;

pub use backoff::{fetch_with_retry, BackoffPolicy};
pub use classify::FieldClassifier;
pub use config::{
    ClassifierConfig, HarvestConfig, PaginationMode, RunConfig, SegmenterConfig, SiteConfig,
};
pub use controller::{CancelFlag, PaginationController, PaginationState, RunOutcome, StopReason};
pub use dedup::{DedupKey, DedupStrategy, Deduplicator};
pub use error::*;
pub use harvest::{harvest, HarvestReport};
pub use pause::{Pause, ThreadPause};
pub use record::{ClassifiedField, FieldKind, Record, UNKNOWN};
pub use scroll::ScrollStabilizer;
pub use segment::{Card, CardSegmenter};
pub use session::{BrowserSession, HttpLauncher, HttpSession, ScopedSession, SessionLauncher};
pub use sink::{FileSink, OutputFormat, ResultSink};
pub use source::{PageFetch, PageSource, RawSnapshot};

//! End-to-end runs against scripted sessions.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use listing_harvest::testing::{FixtureLauncher, FixtureSession, MemorySink, RecordingPause, SessionCall};
use listing_harvest::{
    harvest, BackoffPolicy, CancelFlag, FileSink, HarvestConfig, HarvestError, OutputFormat,
    PaginationMode, RunConfig, SegmenterConfig, SiteConfig, SinkError, StopReason,
};

const ORIGIN: &str = "https://www.jobhai.com";

fn page_url(n: u32) -> String {
    if n == 1 {
        format!("{ORIGIN}/driver-jobs-cgy")
    } else {
        format!("{ORIGIN}/driver-jobs-page-{n}-cgy")
    }
}

fn card(page: u32, i: u32) -> String {
    format!(
        r#"<div class="job-card">
             <h2 class="job-title">Driver {page}-{i}</h2>
             <span class="company-name">Fleet {i}</span>
             <p>₹2{i},000 per month</p>
             <p>Pune</p>
             <a href="/job/{page}-{i}">Apply</a>
           </div>"#
    )
}

fn listing_markup(page: u32, count: u32) -> String {
    let cards: String = (1..=count).map(|i| card(page, i)).collect();
    format!(r#"<html><body><div class="jobs">{cards}</div></body></html>"#)
}

const NO_RESULTS: &str = "<html><body><p>No jobs found for this search</p></body></html>";

fn url_template_site() -> SiteConfig {
    SiteConfig {
        origin: ORIGIN.to_string(),
        pagination: PaginationMode::UrlTemplate {
            template: format!("{ORIGIN}/driver-jobs-page-{{page}}-cgy"),
            first_page_url: Some(page_url(1)),
            start_page: 1,
        },
        segmenter: SegmenterConfig {
            min_structural_cards: 1,
            ..SegmenterConfig::default()
        },
        classifier: Default::default(),
    }
}

fn quick_run() -> RunConfig {
    RunConfig {
        max_pages: 20,
        max_scroll_iterations: 2,
        rng_seed: Some(42),
        retry: BackoffPolicy {
            base_seconds: 0.5,
            max_attempts: 2,
            max_jitter_seconds: 0.0,
        },
        ..RunConfig::default()
    }
}

fn count_calls(log: &Arc<Mutex<Vec<SessionCall>>>, wanted: fn(&SessionCall) -> bool) -> usize {
    log.lock().unwrap().iter().filter(|c| wanted(c)).count()
}

fn gotos(log: &Arc<Mutex<Vec<SessionCall>>>) -> usize {
    count_calls(log, |c| matches!(c, SessionCall::Goto(_)))
}

fn closes(log: &Arc<Mutex<Vec<SessionCall>>>) -> usize {
    count_calls(log, |c| *c == SessionCall::Close)
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "listing_harvest_it_{}_{}",
        name,
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    dir
}

#[test]
fn test_sustained_failures_stop_with_no_records() {
    let session = FixtureSession::new().failing_everywhere();
    let log = session.call_log();
    let mut launcher = FixtureLauncher::new(session);
    let mut sink = MemorySink::new();
    let mut pause = RecordingPause::default();
    let run = RunConfig {
        max_consecutive_failures: 4,
        ..quick_run()
    };

    let report = harvest(
        &mut launcher,
        &url_template_site(),
        &run,
        CancelFlag::new(),
        &mut pause,
        &mut sink,
        Path::new("out/jobs"),
        OutputFormat::Csv,
    )
    .unwrap();

    assert_eq!(report.outcome.stop_reason, StopReason::TooManyConsecutiveFailures);
    assert!(report.outcome.records.is_empty());
    assert_eq!(report.outcome.state.total_failures, 4);
    // Every controller-level failure is one exhausted retry cycle
    assert_eq!(gotos(&log), 4 * 2);
    assert_eq!(closes(&log), 1);
    assert_eq!(sink.writes.len(), 1);
    assert!(sink.writes[0].records.is_empty());
}

#[test]
fn test_sustained_empty_pages_keep_earlier_records() {
    let mut session = FixtureSession::new()
        .with_page(page_url(1), listing_markup(1, 3))
        .with_page(page_url(2), listing_markup(2, 2));
    for n in 3..=8 {
        session = session.with_page(page_url(n), NO_RESULTS);
    }
    let log = session.call_log();
    let mut launcher = FixtureLauncher::new(session);
    let mut sink = MemorySink::new();
    let mut pause = RecordingPause::default();
    let run = RunConfig {
        max_consecutive_empty_pages: 2,
        ..quick_run()
    };

    let report = harvest(
        &mut launcher,
        &url_template_site(),
        &run,
        CancelFlag::new(),
        &mut pause,
        &mut sink,
        Path::new("out/jobs"),
        OutputFormat::Json,
    )
    .unwrap();

    assert_eq!(report.outcome.stop_reason, StopReason::SustainedEmptyPages);
    assert_eq!(report.outcome.records.len(), 5);
    // Two listing pages, then max + 1 empty ones
    assert_eq!(report.outcome.state.pages_visited, 5);
    assert_eq!(gotos(&log), 5);
    assert_eq!(closes(&log), 1);

    let first = &report.outcome.records[0];
    assert_eq!(first.title, "Driver 1-1");
    assert_eq!(first.company, "Fleet 1");
    assert_eq!(first.salary, "₹21,000 per month");
    assert_eq!(first.location, "Pune");
    assert_eq!(first.url, "https://www.jobhai.com/job/1-1");
    assert_eq!(report.outcome.records[4].page_number, 2);
}

#[test]
fn test_interrupt_keeps_exactly_completed_pages() {
    let cancel = CancelFlag::new();
    let mut session = FixtureSession::new().cancel_on_goto(3, cancel.clone());
    for n in 1..=5 {
        session = session.with_page(page_url(n), listing_markup(n, 2));
    }
    let log = session.call_log();
    let mut launcher = FixtureLauncher::new(session);
    let mut sink = MemorySink::new();
    let mut pause = RecordingPause::default();

    let report = harvest(
        &mut launcher,
        &url_template_site(),
        &quick_run(),
        cancel,
        &mut pause,
        &mut sink,
        Path::new("out/jobs"),
        OutputFormat::Xml,
    )
    .unwrap();

    assert_eq!(report.outcome.stop_reason, StopReason::Interrupted);
    assert_eq!(report.outcome.state.pages_visited, 2);
    let written = &sink.writes[0].records;
    assert_eq!(written.len(), 4);
    assert!(written.iter().all(|r| r.page_number <= 2));
    assert_eq!(closes(&log), 1);
}

#[test]
fn test_sink_failure_returns_records() {
    let session = FixtureSession::new()
        .with_page(page_url(1), listing_markup(1, 3))
        .with_page(page_url(2), NO_RESULTS);
    let log = session.call_log();
    let mut launcher = FixtureLauncher::new(session);
    let mut sink = MemorySink::failing();
    let mut pause = RecordingPause::default();
    let run = RunConfig {
        max_pages: 2,
        ..quick_run()
    };

    let err = harvest(
        &mut launcher,
        &url_template_site(),
        &run,
        CancelFlag::new(),
        &mut pause,
        &mut sink,
        Path::new("out/jobs"),
        OutputFormat::Csv,
    )
    .unwrap_err();

    match err {
        HarvestError::Persist { source, outcome } => {
            assert!(matches!(source, SinkError::Io { .. }));
            assert_eq!(outcome.records.len(), 3);
            assert_eq!(outcome.stop_reason, StopReason::BudgetExhausted);
        }
        other => panic!("expected Persist, got {:?}", other),
    }
    assert_eq!(closes(&log), 1);
}

#[test]
fn test_launch_failure_is_surfaced() {
    let mut launcher = FixtureLauncher::unavailable();
    let mut sink = MemorySink::new();
    let mut pause = RecordingPause::default();

    let err = harvest(
        &mut launcher,
        &url_template_site(),
        &quick_run(),
        CancelFlag::new(),
        &mut pause,
        &mut sink,
        Path::new("out/jobs"),
        OutputFormat::Csv,
    )
    .unwrap_err();

    assert!(matches!(err, HarvestError::Session(_)));
    assert!(sink.writes.is_empty());
}

#[test]
fn test_infinite_scroll_accepts_each_listing_once() {
    let url = "https://apna.co/jobs/driver_jobs";
    let states: Vec<(String, u64)> = (1..=3)
        .map(|round| {
            let cards: String = (1..=round * 2).map(|i| card(1, i)).collect();
            (
                format!(r#"<html><body><div class="jobs">{cards}</div></body></html>"#),
                1000 * (round as u64 + 1),
            )
        })
        .collect();
    let session = FixtureSession::new().with_scroll_states(url, states);
    let mut launcher = FixtureLauncher::new(session);
    let mut sink = MemorySink::new();
    let mut pause = RecordingPause::default();
    let site = SiteConfig {
        origin: "https://apna.co".into(),
        pagination: PaginationMode::InfiniteScroll { url: url.into() },
        ..url_template_site()
    };
    let run = RunConfig {
        max_scroll_iterations: 1,
        ..quick_run()
    };

    let report = harvest(
        &mut launcher,
        &site,
        &run,
        CancelFlag::new(),
        &mut pause,
        &mut sink,
        Path::new("out/jobs"),
        OutputFormat::Json,
    )
    .unwrap();

    assert_eq!(report.outcome.stop_reason, StopReason::EndOfPages);
    let records = &report.outcome.records;
    assert_eq!(records.len(), 6);
    assert_eq!(records.iter().filter(|r| r.page_number == 1).count(), 4);
    assert_eq!(records.iter().filter(|r| r.page_number == 2).count(), 2);
    assert_eq!(records[0].url, "https://apna.co/job/1-1");
}

#[test]
fn test_next_button_walks_the_chain() {
    let urls: Vec<String> = (1..=3).map(|n| format!("https://apna.co/jobs?p={n}")).collect();
    let mut session = FixtureSession::new().with_next_chain(urls.clone());
    for (n, url) in (1..=3).zip(&urls) {
        session = session.with_page(url.clone(), listing_markup(n, 2));
    }
    let mut launcher = FixtureLauncher::new(session);
    let mut sink = MemorySink::new();
    let mut pause = RecordingPause::default();
    let site = SiteConfig {
        origin: "https://apna.co".into(),
        pagination: PaginationMode::NextButton {
            url: urls[0].clone(),
        },
        ..url_template_site()
    };

    let report = harvest(
        &mut launcher,
        &site,
        &quick_run(),
        CancelFlag::new(),
        &mut pause,
        &mut sink,
        Path::new("out/jobs"),
        OutputFormat::Csv,
    )
    .unwrap();

    assert_eq!(report.outcome.stop_reason, StopReason::EndOfPages);
    assert_eq!(report.outcome.records.len(), 6);
    assert_eq!(report.outcome.records[5].title, "Driver 3-2");
}

#[test]
fn test_csv_file_written_from_config_file() {
    let dir = scratch_dir("csv");
    fs::create_dir_all(&dir).unwrap();
    let config_path = dir.join("site.json");
    fs::write(
        &config_path,
        r#"{
            "site": {
                "origin": "https://www.jobhai.com",
                "pagination": {
                    "mode": "url_template",
                    "template": "https://www.jobhai.com/driver-jobs-page-{page}-cgy",
                    "first_page_url": "https://www.jobhai.com/driver-jobs-cgy"
                },
                "segmenter": { "min_structural_cards": 1 }
            },
            "run": {
                "max_pages": 2,
                "rng_seed": 3,
                "retry": { "base_seconds": 0.0, "max_attempts": 1, "max_jitter_seconds": 0.0 }
            }
        }"#,
    )
    .unwrap();
    let config = HarvestConfig::from_json_file(&config_path).unwrap();

    let session = FixtureSession::new()
        .with_page(page_url(1), listing_markup(1, 2))
        .with_page(page_url(2), listing_markup(2, 1));
    let mut launcher = FixtureLauncher::new(session);
    let mut pause = RecordingPause::default();
    let format: OutputFormat = "CSV".parse().unwrap();

    let report = harvest(
        &mut launcher,
        &config.site,
        &config.run,
        CancelFlag::new(),
        &mut pause,
        &mut FileSink,
        &dir.join("driver_jobs"),
        format,
    )
    .unwrap();

    let path = report.written.unwrap();
    assert_eq!(path, dir.join("driver_jobs.csv"));
    let text = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("Job Title,Company Name"));
    assert!(lines[3].starts_with("Driver 2-1,Fleet 1,N/A,"));
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_unsupported_format_rejected_by_name() {
    match "yaml".parse::<OutputFormat>() {
        Err(SinkError::UnsupportedFormat(name)) => assert_eq!(name, "yaml"),
        other => panic!("expected UnsupportedFormat, got {:?}", other),
    }
}

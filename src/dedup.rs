//! Exactly-once acceptance of listings within a run.
//!
//! The seen-set lives as long as one [`Deduplicator`] and is never pruned.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::record::Record;

/// Which fields make up the dedup key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupStrategy {
    #[default]
    TitleCompanyLocation,
    TitleCompanySalaryLocation,
    /// title, company, salary, location, experience
    Full,
}

/// Normalized composite key; equal keys are the same listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey(String);

impl DedupKey {
    pub fn for_record(record: &Record, strategy: DedupStrategy) -> Self {
        let parts: Vec<&str> = match strategy {
            DedupStrategy::TitleCompanyLocation => {
                vec![&record.title, &record.company, &record.location]
            }
            DedupStrategy::TitleCompanySalaryLocation => vec![
                &record.title,
                &record.company,
                &record.salary,
                &record.location,
            ],
            DedupStrategy::Full => vec![
                &record.title,
                &record.company,
                &record.salary,
                &record.location,
                &record.experience,
            ],
        };
        // Trimmed, case preserved
        Self(parts.iter().map(|p| p.trim()).collect::<Vec<_>>().join("_"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Default)]
pub struct Deduplicator {
    strategy: DedupStrategy,
    seen: HashSet<DedupKey>,
}

impl Deduplicator {
    pub fn new(strategy: DedupStrategy) -> Self {
        Self {
            strategy,
            seen: HashSet::new(),
        }
    }

    /// True the first time a key is seen, false for every repeat
    pub fn accept(&mut self, record: &Record) -> bool {
        self.seen.insert(DedupKey::for_record(record, self.strategy))
    }
}

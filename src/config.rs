//! Run and site configuration.
//!
//! Everything site-specific (locator, selector words, known locations) is
//! data here; the engine itself has no per-site code.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backoff::BackoffPolicy;
use crate::dedup::DedupStrategy;
use crate::error::ConfigError;

/// Placeholder substituted with the page number in URL templates
pub const PAGE_PLACEHOLDER: &str = "{page}";

/// Upper bound for any configured wait, one day
pub const MAX_WAIT_SECONDS: f64 = 86_400.0;

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// How the engine advances from one logical page to the next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PaginationMode {
    /// `template` contains `{page}`. Page 1 may live at a different URL.
    UrlTemplate {
        template: String,
        #[serde(default)]
        first_page_url: Option<String>,
        #[serde(default = "default_start_page")]
        start_page: u32,
    },
    /// One view that keeps growing as it is scrolled
    InfiniteScroll { url: String },
    /// One view advanced by a "Next" control
    NextButton { url: String },
}

fn default_start_page() -> u32 {
    1
}

/// Knobs for the pagination loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub max_pages: u32,
    pub max_scroll_iterations: u32,
    pub scroll_pause_seconds: f64,
    /// Politeness delay between pages, seconds
    pub inter_page_delay_range: (f64, f64),
    /// Shorter delay used after a page that accepted nothing
    pub empty_page_delay_range: (f64, f64),
    pub max_consecutive_failures: u32,
    pub max_consecutive_empty_pages: u32,
    /// Rendered-size floor below which a page counts as empty
    pub min_page_size: u64,
    pub load_timeout_seconds: f64,
    pub retry: BackoffPolicy,
    pub dedup_key: DedupStrategy,
    /// Seed for delay/jitter randomness; `None` seeds from entropy
    pub rng_seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_pages: 150,
            max_scroll_iterations: 10,
            scroll_pause_seconds: 1.5,
            inter_page_delay_range: (1.0, 2.0),
            empty_page_delay_range: (0.5, 1.0),
            max_consecutive_failures: 5,
            max_consecutive_empty_pages: 3,
            min_page_size: 1000,
            load_timeout_seconds: 10.0,
            retry: BackoffPolicy::default(),
            dedup_key: DedupStrategy::default(),
            rng_seed: None,
        }
    }
}

impl RunConfig {
    pub fn scroll_pause(&self) -> Duration {
        Duration::from_secs_f64(self.scroll_pause_seconds)
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.load_timeout_seconds)
    }

    /// Reject values that would make the loop meaningless
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_pages == 0 {
            return Err(invalid("max_pages", "must be at least 1"));
        }
        if self.max_consecutive_failures == 0 {
            return Err(invalid("max_consecutive_failures", "must be at least 1"));
        }
        check_range("inter_page_delay_range", self.inter_page_delay_range)?;
        check_range("empty_page_delay_range", self.empty_page_delay_range)?;
        check_secs("scroll_pause_seconds", self.scroll_pause_seconds)?;
        check_secs("load_timeout_seconds", self.load_timeout_seconds)?;
        check_secs("retry.base_seconds", self.retry.base_seconds)?;
        check_secs("retry.max_jitter_seconds", self.retry.max_jitter_seconds)?;
        if self.retry.max_attempts == 0 {
            return Err(invalid("retry.max_attempts", "must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

fn check_secs(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(field, "must be a non-negative number of seconds"));
    }
    if value > MAX_WAIT_SECONDS {
        return Err(invalid(field, "longer than one day"));
    }
    Ok(())
}

fn check_range(field: &'static str, (min, max): (f64, f64)) -> Result<(), ConfigError> {
    check_secs(field, min)?;
    check_secs(field, max)?;
    if min > max {
        return Err(invalid(field, "min is greater than max"));
    }
    Ok(())
}

/// How candidate cards are found in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Tags considered by the structural pass
    pub structural_tags: Vec<String>,
    /// Class tokens that mark a structural card
    pub structural_class_tokens: Vec<String>,
    /// Below this many structural cards, use the content-based fallback
    pub min_structural_cards: usize,
    /// Tags considered by the fallback pass
    pub fallback_tags: Vec<String>,
    /// A fallback container must hold one of these
    pub heading_tags: Vec<String>,
    /// ... and its text must contain one of these
    pub signal_tokens: Vec<String>,
    /// Cards with shorter text are noise
    pub min_card_text_len: usize,
    /// If non-empty, a card must mention at least one of these
    pub required_any_keywords: Vec<String>,
    /// Drop cards whose text has no currency symbol
    pub require_currency: bool,
    pub currency_symbols: Vec<String>,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            structural_tags: words(&["div", "article", "li"]),
            structural_class_tokens: words(&["job", "card", "item", "listing", "post"]),
            min_structural_cards: 5,
            fallback_tags: words(&["div"]),
            heading_tags: words(&["h2", "h3", "a"]),
            signal_tokens: words(&["₹", "experience", "fresher"]),
            min_card_text_len: 20,
            required_any_keywords: Vec::new(),
            require_currency: false,
            currency_symbols: words(&["₹", "$", "€", "£"]),
        }
    }
}

/// Rule data for field classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub currency_symbols: Vec<String>,
    pub known_locations: Vec<String>,
    pub title_tags: Vec<String>,
    pub title_class_tokens: Vec<String>,
    /// Used when no tag in `title_tags` carries a title-like class
    pub title_fallback_tags: Vec<String>,
    pub company_tags: Vec<String>,
    pub company_class_tokens: Vec<String>,
    /// Descendants walked for fragment classification
    pub fragment_tags: Vec<String>,
    /// Longer fragments are skipped by the walk
    pub max_fragment_len: usize,
    /// Scan the whole card text for salary/location/experience before the walk
    pub full_text_scan: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            currency_symbols: words(&["₹", "$", "€", "£"]),
            known_locations: words(&[
                "Bangalore", "Mumbai", "Delhi", "Kolkata", "Chennai", "Hyderabad", "Pune",
                "Ahmedabad", "NCR", "Gurgaon", "Noida",
            ]),
            title_tags: words(&["h2", "h3", "a"]),
            title_class_tokens: words(&["title", "heading"]),
            title_fallback_tags: words(&["h2", "h3"]),
            company_tags: words(&["span", "div", "p"]),
            company_class_tokens: words(&["company", "employer"]),
            fragment_tags: words(&["li", "span", "div", "p"]),
            max_fragment_len: 150,
            full_text_scan: false,
        }
    }
}

/// Everything that describes one target site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Base URL used to resolve relative listing links
    pub origin: String,
    pub pagination: PaginationMode,
    #[serde(default)]
    pub segmenter: SegmenterConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

impl SiteConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if url::Url::parse(&self.origin).is_err() {
            return Err(invalid("origin", "not an absolute URL"));
        }
        if let PaginationMode::UrlTemplate { template, .. } = &self.pagination {
            if !template.contains(PAGE_PLACEHOLDER) {
                return Err(invalid("pagination.template", "missing {page} placeholder"));
            }
        }
        Ok(())
    }
}

/// File format read by the binary: one site plus its run knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestConfig {
    pub site: SiteConfig,
    #[serde(default)]
    pub run: RunConfig,
}

impl HarvestConfig {
    /// Load and validate a JSON config file
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: HarvestConfig = serde_json::from_str(raw)?;
        config.site.validate()?;
        config.run.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let raw = r#"{
            "site": {
                "origin": "https://www.jobhai.com",
                "pagination": {
                    "mode": "url_template",
                    "template": "https://www.jobhai.com/driver-jobs-page-{page}-cgy",
                    "first_page_url": "https://www.jobhai.com/driver-jobs-cgy"
                }
            },
            "run": { "max_pages": 20, "dedup_key": "title_company_salary_location" }
        }"#;

        let config = HarvestConfig::from_json_str(raw).unwrap();
        assert_eq!(config.run.max_pages, 20);
        assert_eq!(config.run.max_consecutive_failures, 5);
        assert_eq!(config.run.dedup_key, DedupStrategy::TitleCompanySalaryLocation);
        assert_eq!(config.site.segmenter.min_structural_cards, 5);
        match config.site.pagination {
            PaginationMode::UrlTemplate { start_page, .. } => assert_eq!(start_page, 1),
            other => panic!("unexpected mode {:?}", other),
        }
    }

    #[test]
    fn test_demo_configs_load() {
        let jobhai = HarvestConfig::from_json_str(include_str!("../demos/jobhai_drivers.json")).unwrap();
        assert_eq!(jobhai.site.segmenter.required_any_keywords.len(), 5);

        let apna = HarvestConfig::from_json_str(include_str!("../demos/apna_scroll.json")).unwrap();
        assert!(matches!(apna.site.pagination, PaginationMode::InfiniteScroll { .. }));
        assert!(apna.site.classifier.full_text_scan);
        assert_eq!(apna.run.dedup_key, DedupStrategy::TitleCompanySalaryLocation);
    }

    #[test]
    fn test_template_without_placeholder_rejected() {
        let raw = r#"{
            "site": {
                "origin": "https://apna.co",
                "pagination": { "mode": "url_template", "template": "https://apna.co/jobs" }
            }
        }"#;
        let err = HarvestConfig::from_json_str(raw).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { field: "pagination.template", .. }
        ));
    }

    #[test]
    fn test_inverted_delay_range_rejected() {
        let run = RunConfig {
            inter_page_delay_range: (3.0, 1.0),
            ..RunConfig::default()
        };
        assert!(run.validate().is_err());

        let run = RunConfig {
            max_pages: 0,
            ..RunConfig::default()
        };
        assert!(matches!(
            run.validate(),
            Err(ConfigError::Invalid { field: "max_pages", .. })
        ));
    }

    #[test]
    fn test_oversized_waits_rejected() {
        let mut run = RunConfig::default();
        run.retry.base_seconds = 1e20;
        assert!(matches!(
            run.validate(),
            Err(ConfigError::Invalid { field: "retry.base_seconds", .. })
        ));

        let run = RunConfig {
            inter_page_delay_range: (1.0, 1e30),
            ..RunConfig::default()
        };
        assert!(matches!(
            run.validate(),
            Err(ConfigError::Invalid { field: "inter_page_delay_range", .. })
        ));
    }
}

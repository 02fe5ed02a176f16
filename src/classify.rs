//! Heuristic field classification for listing cards.
//!
//! A fragment of card text is assigned to at most one kind, first rule wins:
//!
//! 1. salary: a currency amount or range, or a denomination word
//!    (`lakh`, `per month`, `monthly`, `LPA`)
//! 2. experience: `fresher`/`experience`/`exp`, or a number with a
//!    years/months unit
//! 3. location: a known city or region
//! 4. location again: any short label with no currency symbol and no digit
//!
//! [`FieldClassifier::assemble`] then builds a whole [`Record`] from a card:
//! structural title/company lookups first, then the fragment walk fills
//! whatever is still unknown.

use regex::Regex;
use tracing::trace;
use url::Url;

use crate::config::ClassifierConfig;
use crate::dom::{
    descendant_elements, element_text, find_descendant, first_link, has_own_text, normalize_ws,
    tag_in,
};
use crate::error::ConfigError;
use crate::record::{ClassifiedField, FieldKind, Record};
use crate::segment::Card;

/// Longest fragment that can fall through to the location fallback
const FALLBACK_LOCATION_MAX_CHARS: usize = 50;

pub struct FieldClassifier {
    config: ClassifierConfig,
    salary_amount: Regex,
    salary_words: Regex,
    experience_words: Regex,
    experience_span: Regex,
    location: Option<Regex>,
}

fn build(field: &'static str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|e| ConfigError::Invalid {
        field,
        reason: e.to_string(),
    })
}

impl FieldClassifier {
    pub fn new(config: ClassifierConfig) -> Result<Self, ConfigError> {
        let symbols: Vec<String> = config
            .currency_symbols
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| regex::escape(s))
            .collect();
        if symbols.is_empty() {
            return Err(ConfigError::Invalid {
                field: "classifier.currency_symbols",
                reason: "at least one symbol is required".to_string(),
            });
        }
        let currency = format!("(?:{})", symbols.join("|"));

        let salary_amount = build(
            "classifier.currency_symbols",
            &format!(
                r"(?i){c}\s*[\d,]+(?:\.\d+)?(?:\s*[-–]\s*{c}?\s*[\d,]+(?:\.\d+)?)?(?:\s*(?:per month|monthly|lakhs?|lpa))?",
                c = currency
            ),
        )?;
        let salary_words = build("salary", r"(?i)\b(?:lakhs?|per month|monthly|lpa)\b")?;
        let experience_words = build("experience", r"(?i)\b(?:fresher|experience|exp)\b")?;
        let experience_span = build(
            "experience",
            r"(?i)\b\d+(?:\.\d+)?\s*[+-]?\s*(?:yrs?|years?|months?)\b",
        )?;

        let names: Vec<String> = config
            .known_locations
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .map(regex::escape)
            .collect();
        let location = if names.is_empty() {
            None
        } else {
            Some(build(
                "classifier.known_locations",
                &format!(r"(?i)\b(?:{})\b", names.join("|")),
            )?)
        };

        Ok(Self {
            config,
            salary_amount,
            salary_words,
            experience_words,
            experience_span,
            location,
        })
    }

    fn has_currency(&self, text: &str) -> bool {
        self.config
            .currency_symbols
            .iter()
            .any(|s| !s.is_empty() && text.contains(s.as_str()))
    }

    /// Assign one fragment of text to at most one field kind.
    ///
    /// Pure: the same text always gives the same answer. The value is the
    /// whole normalized fragment.
    pub fn classify_fragment(&self, text: &str) -> Option<ClassifiedField> {
        let text = normalize_ws(text);
        if text.is_empty() {
            return None;
        }

        let kind = if self.salary_amount.is_match(&text) || self.salary_words.is_match(&text) {
            FieldKind::Salary
        } else if self.experience_words.is_match(&text) || self.experience_span.is_match(&text) {
            FieldKind::Experience
        } else if self.location.as_ref().is_some_and(|re| re.is_match(&text)) {
            FieldKind::Location
        } else if text.chars().count() <= FALLBACK_LOCATION_MAX_CHARS
            && !self.has_currency(&text)
            && !text.chars().any(|c| c.is_ascii_digit())
        {
            FieldKind::Location
        } else {
            return None;
        };

        Some(ClassifiedField { kind, value: text })
    }

    /// Build a record from one card. Never fails; anything unresolved stays `N/A`.
    pub fn assemble(&self, card: &Card<'_>, page_number: u32, base: Option<&Url>) -> Record {
        let mut record = Record::unknown(page_number);
        let cfg = &self.config;

        let title = find_descendant(card.element, &cfg.title_tags, &cfg.title_class_tokens)
            .or_else(|| find_descendant(card.element, &cfg.title_fallback_tags, &[]));
        if let Some(el) = title {
            record.fill(FieldKind::Title, element_text(el));
        }
        if let Some(el) = find_descendant(card.element, &cfg.company_tags, &cfg.company_class_tokens)
        {
            record.fill(FieldKind::Company, element_text(el));
        }

        if cfg.full_text_scan {
            self.scan_full_text(&card.text, &mut record);
        }

        for el in descendant_elements(card.element) {
            if !self.needs_fragments(&record) {
                break;
            }
            if !tag_in(el, &cfg.fragment_tags) || !has_own_text(el) {
                continue;
            }
            let text = element_text(el);
            if text.is_empty()
                || text.chars().count() > cfg.max_fragment_len
                || text == record.title
                || text == record.company
            {
                continue;
            }
            if let Some(field) = self.classify_fragment(&text) {
                trace!("{:?} <- {:?}", field.kind, field.value);
                record.fill(field.kind, field.value);
            }
        }

        if let Some(url) = first_link(card.element, base) {
            record.fill(FieldKind::Url, url);
        }

        record
    }

    fn needs_fragments(&self, record: &Record) -> bool {
        [FieldKind::Salary, FieldKind::Experience, FieldKind::Location]
            .into_iter()
            .any(|kind| record.is_unknown(kind))
    }

    /// Whole-card matches for salary, location and experience
    fn scan_full_text(&self, text: &str, record: &mut Record) {
        if let Some(m) = self.salary_amount.find(text) {
            record.fill(FieldKind::Salary, m.as_str().trim());
        }
        if let Some(m) = self.location.as_ref().and_then(|re| re.find(text)) {
            record.fill(FieldKind::Location, m.as_str());
        }
        let experience = self
            .experience_span
            .find(text)
            .or_else(|| self.experience_words.find(text));
        if let Some(m) = experience {
            record.fill(FieldKind::Experience, m.as_str());
        }
    }
}

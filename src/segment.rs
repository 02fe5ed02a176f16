//! Splits a rendered page into candidate listing cards.
//!
//! Two passes: a structural one (tag plus class words such as `job` or
//! `card`) and, when that finds too few, a content-based fallback that looks
//! for containers holding a heading and a domain signal like `₹`. Cards
//! shorter than a noise floor are dropped either way.

use std::collections::HashSet;

use scraper::{ElementRef, Html};
use tracing::{debug, info};

use crate::config::SegmenterConfig;
use crate::dom::{
    all_elements, class_matches, contains_any_ci, descendant_elements, element_text, is_within,
    tag_in,
};

/// A fragment of a page believed to hold one listing.
#[derive(Debug, Clone)]
pub struct Card<'a> {
    /// Where the card came from, for link and structural lookups
    pub element: ElementRef<'a>,
    /// Whitespace-normalized text of the whole card
    pub text: String,
}

impl<'a> Card<'a> {
    pub fn new(element: ElementRef<'a>) -> Self {
        Self {
            element,
            text: element_text(element),
        }
    }
}

pub struct CardSegmenter {
    config: SegmenterConfig,
}

impl CardSegmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self { config }
    }

    /// Cards of `document`, in document order
    pub fn segment<'a>(&self, document: &'a Html) -> Vec<Card<'a>> {
        let structural: Vec<Card<'a>> = self
            .structural(document)
            .into_iter()
            .map(Card::new)
            .collect();
        debug!("Structural pass matched {} containers", structural.len());

        let candidates = if structural.len() < self.config.min_structural_cards {
            let fallback = self.fallback(document);
            if fallback.is_empty() {
                structural
            } else {
                info!(
                    "Only {} structural cards; content fallback found {}",
                    structural.len(),
                    fallback.len()
                );
                fallback
            }
        } else {
            structural
        };

        let cards: Vec<Card<'a>> = candidates
            .into_iter()
            .filter(|card| self.keep(card))
            .collect();
        debug!("{} cards after filtering", cards.len());
        cards
    }

    fn has_heading(&self, element: ElementRef<'_>) -> bool {
        descendant_elements(element).any(|d| tag_in(d, &self.config.heading_tags))
    }

    /// Tag and class matches, minus wrappers around other cards
    fn structural<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        let matches: Vec<ElementRef<'a>> = all_elements(document)
            .filter(|el| {
                tag_in(*el, &self.config.structural_tags)
                    && class_matches(*el, &self.config.structural_class_tokens)
            })
            .collect();

        // A list container named "jobs-list" matches the same words as its
        // items. It is recognised by holding repeated headed matches: siblings
        // with the same tag and class. A card's own "card-header" and
        // "card-body" parts differ in class and do not make it a wrapper.
        let headed: Vec<ElementRef<'a>> = matches
            .iter()
            .copied()
            .filter(|el| self.has_heading(*el))
            .collect();
        let repeated: HashSet<_> = headed
            .iter()
            .filter(|el| headed.iter().any(|other| is_repeat_of(*other, **el)))
            .map(|el| el.id())
            .collect();
        let unwrapped: Vec<ElementRef<'a>> = matches
            .into_iter()
            .filter(|el| !descendant_elements(*el).any(|d| repeated.contains(&d.id())))
            .collect();

        // Inner parts of a card ("card-body") can match too: keep the outermost
        unwrapped
            .iter()
            .copied()
            .filter(|el| !unwrapped.iter().any(|other| is_within(*el, *other)))
            .collect()
    }

    /// Containers holding a heading and a signal token, innermost first.
    ///
    /// Filters run before nesting is resolved, so an inner block too small
    /// to be a card does not hide the card around it.
    fn fallback<'a>(&self, document: &'a Html) -> Vec<Card<'a>> {
        let candidates: Vec<Card<'a>> = all_elements(document)
            .filter(|el| tag_in(*el, &self.config.fallback_tags) && self.has_heading(*el))
            .map(Card::new)
            .filter(|card| contains_any_ci(&card.text, &self.config.signal_tokens))
            .filter(|card| self.keep(card))
            .collect();

        candidates
            .iter()
            .filter(|card| {
                !candidates
                    .iter()
                    .any(|inner| is_within(inner.element, card.element))
            })
            .cloned()
            .collect()
    }

    /// Noise floor plus optional keyword and currency filters
    fn keep(&self, card: &Card<'_>) -> bool {
        if card.text.chars().count() < self.config.min_card_text_len {
            return false;
        }
        if self.config.require_currency
            && !self
                .config
                .currency_symbols
                .iter()
                .any(|symbol| card.text.contains(symbol.as_str()))
        {
            return false;
        }
        if !self.config.required_any_keywords.is_empty()
            && !contains_any_ci(&card.text, &self.config.required_any_keywords)
        {
            return false;
        }
        true
    }
}

/// Distinct siblings sharing tag and class, like the items of one list
fn is_repeat_of(a: ElementRef<'_>, b: ElementRef<'_>) -> bool {
    a.id() != b.id()
        && a.parent().map(|p| p.id()) == b.parent().map(|p| p.id())
        && a.value().name() == b.value().name()
        && a.value().attr("class") == b.value().attr("class")
}

//! Listing records and classified fields

use serde::{Deserialize, Serialize};

/// Sentinel for attributes the classifier could not resolve.
pub const UNKNOWN: &str = "N/A";

/// Column headers, in output order.
pub const HEADERS: [&str; 7] = [
    "Job Title",
    "Company Name",
    "Experience",
    "Salary",
    "Location",
    "URL",
    "Page Number",
];

/// Semantic kind a fragment of card text can be assigned to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Salary,
    Experience,
    Location,
    Title,
    Company,
    Url,
}

/// A (kind, value) pair produced from one fragment of card text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedField {
    pub kind: FieldKind,
    pub value: String,
}

/// One assembled listing.
///
/// Every text attribute is always present; unresolved ones hold [`UNKNOWN`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "Job Title")]
    pub title: String,
    #[serde(rename = "Company Name")]
    pub company: String,
    #[serde(rename = "Experience")]
    pub experience: String,
    #[serde(rename = "Salary")]
    pub salary: String,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Page Number")]
    pub page_number: u32,
}

impl Record {
    /// A record for `page_number` with every attribute set to [`UNKNOWN`].
    pub fn unknown(page_number: u32) -> Self {
        Self {
            title: UNKNOWN.to_string(),
            company: UNKNOWN.to_string(),
            experience: UNKNOWN.to_string(),
            salary: UNKNOWN.to_string(),
            location: UNKNOWN.to_string(),
            url: UNKNOWN.to_string(),
            page_number,
        }
    }

    /// Mutable slot for a field kind.
    pub fn slot_mut(&mut self, kind: FieldKind) -> &mut String {
        match kind {
            FieldKind::Title => &mut self.title,
            FieldKind::Company => &mut self.company,
            FieldKind::Experience => &mut self.experience,
            FieldKind::Salary => &mut self.salary,
            FieldKind::Location => &mut self.location,
            FieldKind::Url => &mut self.url,
        }
    }

    pub fn is_unknown(&self, kind: FieldKind) -> bool {
        let value = match kind {
            FieldKind::Title => &self.title,
            FieldKind::Company => &self.company,
            FieldKind::Experience => &self.experience,
            FieldKind::Salary => &self.salary,
            FieldKind::Location => &self.location,
            FieldKind::Url => &self.url,
        };
        value == UNKNOWN
    }

    /// Set `kind` only if it is still unknown. Returns whether it was set.
    pub fn fill(&mut self, kind: FieldKind, value: impl Into<String>) -> bool {
        if !self.is_unknown(kind) {
            return false;
        }
        let value = value.into();
        if value.trim().is_empty() {
            return false;
        }
        *self.slot_mut(kind) = value;
        true
    }

    /// (header, value) pairs in [`HEADERS`] order
    pub fn columns(&self) -> [(&'static str, String); 7] {
        [
            (HEADERS[0], self.title.clone()),
            (HEADERS[1], self.company.clone()),
            (HEADERS[2], self.experience.clone()),
            (HEADERS[3], self.salary.clone()),
            (HEADERS[4], self.location.clone()),
            (HEADERS[5], self.url.clone()),
            (HEADERS[6], self.page_number.to_string()),
        ]
    }
}

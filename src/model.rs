use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::normalize::sections::Section;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Jsearch,
    Pracuj,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Jsearch => "jsearch",
            Source::Pracuj => "pracuj",
        }
    }
}

/// Monthly salary range. Both ends are always present and `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Salary {
    min: i64,
    max: i64,
}

impl Salary {
    pub fn new(a: i64, b: i64) -> Self {
        Salary {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Round fractional amounts once, here at the storage boundary.
    pub fn from_amounts(min: f64, max: f64) -> Option<Self> {
        if !min.is_finite() || !max.is_finite() {
            return None;
        }
        Some(Salary::new(min.round() as i64, max.round() as i64))
    }

    pub fn min(&self) -> i64 {
        self.min
    }

    pub fn max(&self) -> i64 {
        self.max
    }
}

/// Loosely filled record a source extractor builds before normalization.
/// Blank strings and empty lists are allowed here; `JobPosting::from_draft`
/// resolves them to absent once.
#[derive(Debug, Clone, Default)]
pub struct PostingDraft {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub level: Vec<String>,
    pub schedule: Vec<String>,
    pub mode: Vec<String>,
    pub contract: Vec<String>,
    pub responsibilities: Vec<String>,
    pub requirements: Vec<String>,
    pub benefits: Vec<String>,
    pub salary: Option<Salary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub url: String,
    pub source: Source,
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub level: Option<Vec<String>>,
    pub schedule: Option<Vec<String>>,
    pub mode: Option<Vec<String>>,
    pub contract: Option<Vec<String>>,
    pub responsibilities: Option<Vec<String>>,
    pub requirements: Option<Vec<String>>,
    pub benefits: Option<Vec<String>>,
    pub salary: Option<Salary>,
    added_date: NaiveDate,
}

impl JobPosting {
    pub fn from_draft(url: impl Into<String>, source: Source, draft: PostingDraft) -> Self {
        Self::from_draft_on(url, source, draft, Utc::now().date_naive())
    }

    pub fn from_draft_on(
        url: impl Into<String>,
        source: Source,
        draft: PostingDraft,
        added_date: NaiveDate,
    ) -> Self {
        JobPosting {
            url: url.into(),
            source,
            title: clean_text(draft.title),
            company: clean_text(draft.company),
            location: clean_text(draft.location),
            description: clean_text(draft.description),
            level: clean_list(draft.level),
            schedule: clean_list(draft.schedule),
            mode: clean_list(draft.mode),
            contract: clean_list(draft.contract),
            responsibilities: clean_list(draft.responsibilities),
            requirements: clean_list(draft.requirements),
            benefits: clean_list(draft.benefits),
            salary: draft.salary,
            added_date,
        }
    }

    pub fn added_date(&self) -> NaiveDate {
        self.added_date
    }

    pub fn section(&self, section: Section) -> &Option<Vec<String>> {
        match section {
            Section::Responsibilities => &self.responsibilities,
            Section::Requirements => &self.requirements,
            Section::Benefits => &self.benefits,
        }
    }

    /// Store an enrichment result; empty lists are kept absent.
    pub fn set_section(&mut self, section: Section, value: Option<Vec<String>>) {
        let value = value.and_then(clean_list);
        match section {
            Section::Responsibilities => self.responsibilities = value,
            Section::Requirements => self.requirements = value,
            Section::Benefits => self.benefits = value,
        }
    }

    pub fn missing_sections(&self) -> Vec<Section> {
        Section::ALL
            .into_iter()
            .filter(|s| self.section(*s).is_none())
            .collect()
    }
}

fn clean_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Strip markup leftovers from list items and collapse an empty list to absent.
pub fn clean_list(items: Vec<String>) -> Option<Vec<String>> {
    let cleaned: Vec<String> = items
        .into_iter()
        .map(|item| {
            item.replace(['{', '}', '#'], "")
                .trim()
                .to_string()
        })
        .filter(|item| !item.is_empty())
        .collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

// ── Tests ──

use serde::{Deserialize, Serialize};

use crate::error::{BookstacksError, Result};

pub type BookId = i64;

pub const UNKNOWN: &str = "Unknown";
pub const MAX_RATING: f64 = 5.0;
pub const MAX_YEAR: i32 = 2100;

// ─── Book ───────────────────────────────────────────────────

/// A stored book, with author and genre already resolved to their names and
/// the rating averaged over all rating rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub genre: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,

    /// Comma-joined subject tags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subjects: Option<String>,

    /// `None` until a cover has been resolved or entered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

impl Book {
    /// The stored cover, if it is non-blank.
    pub fn cached_cover(&self) -> Option<&str> {
        self.cover_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    pub fn subject_list(&self) -> Vec<&str> {
        split_subjects(self.subjects.as_deref())
    }

    /// Human label used when picking a book: `#12 — Dune by Frank Herbert (2021)`.
    pub fn label(&self) -> String {
        let year = self
            .year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "—".to_string());
        format!("#{} — {} by {} ({year})", self.id, self.title, self.author)
    }
}

// ─── NewBook ────────────────────────────────────────────────

/// Input of add/update. Blank strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: Option<String>,
    pub genre: Option<String>,
    pub year: Option<i32>,
    pub rating: Option<f64>,
    pub isbn: Option<String>,
    pub subjects: Option<String>,
    pub cover_url: Option<String>,
}

impl NewBook {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(BookstacksError::ValidationError(
                "title must not be empty".to_string(),
            ));
        }
        if let Some(rating) = self.rating.filter(|r| !(0.0..=MAX_RATING).contains(r)) {
            return Err(BookstacksError::ValidationError(format!(
                "rating {rating} outside 0–{MAX_RATING}"
            )));
        }
        if let Some(year) = self.year.filter(|y| !(0..=MAX_YEAR).contains(y)) {
            return Err(BookstacksError::ValidationError(format!(
                "year {year} outside 0–{MAX_YEAR}"
            )));
        }
        if let Some(url) = non_blank(self.cover_url.as_deref()) {
            validate_cover_url(url)?;
        }
        Ok(())
    }

    pub fn author_name(&self) -> &str {
        non_blank(self.author.as_deref()).unwrap_or(UNKNOWN)
    }

    /// Explicit genre, else the first subject tag, else "Unknown".
    pub fn genre_name(&self) -> &str {
        non_blank(self.genre.as_deref())
            .or_else(|| split_subjects(self.subjects.as_deref()).into_iter().next())
            .unwrap_or(UNKNOWN)
    }
}

// ─── CoverUpdate ────────────────────────────────────────────

/// Fields written back after a successful cover resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverUpdate {
    pub cover_url: String,
    pub isbn: Option<String>,
    pub subjects: Option<String>,
}

// ─── Helpers ────────────────────────────────────────────────

/// Trimmed value, or `None` when blank.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub fn split_subjects(subjects: Option<&str>) -> Vec<&str> {
    subjects
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn validate_cover_url(url: &str) -> Result<()> {
    match url::Url::parse(url) {
        Ok(parsed) if parsed.has_host() => Ok(()),
        Ok(_) => Err(BookstacksError::ValidationError(format!(
            "cover URL has no host: {url}"
        ))),
        Err(e) => Err(BookstacksError::ValidationError(format!(
            "invalid cover URL {url}: {e}"
        ))),
    }
}

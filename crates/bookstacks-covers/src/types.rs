use bookstacks_core::CoverUpdate;
use serde::{Deserialize, Serialize};

/// What one catalog lookup found. Never stored on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogResult {
    pub cover_url: Option<String>,
    pub isbn: Option<String>,
    /// Up to five subject tags joined with `", "`.
    pub subjects: Option<String>,
}

impl CatalogResult {
    pub fn cover(url: impl Into<String>) -> Self {
        Self {
            cover_url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn has_cover(&self) -> bool {
        self.cover_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.cover_url.is_none() && self.isbn.is_none() && self.subjects.is_none()
    }

    /// The write-back for a book, keeping the book's own isbn/subjects where
    /// this result has none.
    pub fn to_cover_update(
        &self,
        current_isbn: Option<&str>,
        current_subjects: Option<&str>,
    ) -> Option<CoverUpdate> {
        let cover_url = self.cover_url.clone().filter(|url| !url.trim().is_empty())?;
        Some(CoverUpdate {
            cover_url,
            isbn: self.isbn.clone().or_else(|| current_isbn.map(str::to_string)),
            subjects: self
                .subjects
                .clone()
                .or_else(|| current_subjects.map(str::to_string)),
        })
    }
}

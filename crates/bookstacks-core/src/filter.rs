use serde::{Deserialize, Serialize};

use crate::models::Book;

/// Browsing state for the book grid. Passed explicitly to whatever renders
/// the list; nothing here is global.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookFilter {
    /// Case-insensitive substring matched against title or author.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

impl BookFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.query.as_deref().is_none_or(|q| q.trim().is_empty())
            && self.genre.is_none()
            && self.year.is_none()
    }

    pub fn matches(&self, book: &Book) -> bool {
        if let Some(query) = self.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let needle = query.to_lowercase();
            if !book.title.to_lowercase().contains(&needle)
                && !book.author.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        if let Some(genre) = &self.genre {
            if &book.genre != genre {
                return false;
            }
        }
        if let Some(year) = self.year {
            if book.year != Some(year) {
                return false;
            }
        }
        true
    }

    pub fn apply<'a>(&self, books: &'a [Book]) -> Vec<&'a Book> {
        books.iter().filter(|b| self.matches(b)).collect()
    }
}

/// Distinct genres, sorted: the choices offered by the genre filter.
pub fn genre_options(books: &[Book]) -> Vec<String> {
    let mut genres: Vec<String> = books.iter().map(|b| b.genre.clone()).collect();
    genres.sort();
    genres.dedup();
    genres
}

/// Distinct years, ascending.
pub fn year_options(books: &[Book]) -> Vec<i32> {
    let mut years: Vec<i32> = books.iter().filter_map(|b| b.year).collect();
    years.sort_unstable();
    years.dedup();
    years
}

use std::sync::Arc;

use bookstacks_core::{CoversConfig, NewBook, non_blank};

use crate::error::Result;
use crate::sources::google_books::GoogleBooksSource;
use crate::sources::openlibrary::OpenLibrarySource;
use crate::sources::{IsbnCoverSource, TitleSearchSource};
use crate::types::CatalogResult;

/// Walks the catalogs in priority order until one yields a cover:
/// ISBN lookup, primary title search, secondary title search, placeholder.
#[derive(Clone)]
pub struct CoverResolver {
    isbn_source: Arc<dyn IsbnCoverSource>,
    primary: Arc<dyn TitleSearchSource>,
    secondary: Arc<dyn TitleSearchSource>,
    placeholder_url: String,
}

impl CoverResolver {
    pub fn new(
        isbn_source: Arc<dyn IsbnCoverSource>,
        primary: Arc<dyn TitleSearchSource>,
        secondary: Arc<dyn TitleSearchSource>,
        placeholder_url: impl Into<String>,
    ) -> Self {
        Self {
            isbn_source,
            primary,
            secondary,
            placeholder_url: placeholder_url.into(),
        }
    }

    /// Open Library for the ISBN lookup and primary search, Google Books as
    /// the secondary search.
    pub fn from_config(config: &CoversConfig) -> Result<Self> {
        let openlibrary = Arc::new(OpenLibrarySource::from_config(config)?);
        let google = Arc::new(GoogleBooksSource::from_config(config)?);
        Ok(Self::new(
            openlibrary.clone(),
            openlibrary,
            google,
            config.placeholder_url.clone(),
        ))
    }

    pub fn placeholder_url(&self) -> &str {
        &self.placeholder_url
    }

    pub fn is_placeholder(&self, url: &str) -> bool {
        url == self.placeholder_url
    }

    /// Never fails: the worst outcome is the placeholder with no isbn or
    /// subjects.
    pub async fn resolve_cover(
        &self,
        title: &str,
        author: Option<&str>,
        isbn: Option<&str>,
    ) -> CatalogResult {
        let author = non_blank(author);
        let isbn = non_blank(isbn);

        if let Some(isbn) = isbn {
            let found = self.isbn_source.lookup_cover(isbn).await;
            if let Some(url) = found.filter(|url| !url.trim().is_empty()) {
                tracing::debug!(isbn, source = self.isbn_source.name(), "cover found by ISBN");
                return CatalogResult {
                    cover_url: Some(url),
                    isbn: Some(isbn.to_string()),
                    subjects: None,
                };
            }
        }

        let primary = self.primary.find_cover(title, author).await;
        if primary.has_cover() {
            tracing::debug!(title, source = self.primary.name(), "cover found by title search");
            return primary;
        }

        let secondary = self.secondary.find_cover(title, author).await;
        if secondary.has_cover() {
            tracing::debug!(title, source = self.secondary.name(), "cover found by title search");
            return CatalogResult {
                cover_url: secondary.cover_url,
                isbn: isbn.map(str::to_string),
                subjects: None,
            };
        }

        tracing::info!(title, "no cover found, using placeholder");
        CatalogResult::cover(self.placeholder_url.clone())
    }

    /// Fills the cover of a book about to be saved when the user left it
    /// blank. Values the user typed are kept; a placeholder is not stored.
    /// Returns whether anything was filled.
    pub async fn complete_book(&self, book: &mut NewBook) -> bool {
        if non_blank(book.cover_url.as_deref()).is_some() {
            return false;
        }

        let fetched = self
            .resolve_cover(&book.title, book.author.as_deref(), book.isbn.as_deref())
            .await;
        let Some(url) = fetched.cover_url.filter(|url| !self.is_placeholder(url)) else {
            return false;
        };

        book.cover_url = Some(url);
        if non_blank(book.isbn.as_deref()).is_none() {
            book.isbn = fetched.isbn;
        }
        if non_blank(book.subjects.as_deref()).is_none() {
            book.subjects = fetched.subjects;
        }
        true
    }
}

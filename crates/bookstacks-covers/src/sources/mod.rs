use async_trait::async_trait;

use crate::types::CatalogResult;

pub mod google_books;
pub mod openlibrary;

/// A catalog that can turn an ISBN into a cover.
#[async_trait]
pub trait IsbnCoverSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// The cover for this ISBN, including any URL the catalog builds from
    /// the ISBN alone. Failures are logged by the source and come back as
    /// `None`.
    async fn lookup_cover(&self, isbn: &str) -> Option<String>;
}

/// A catalog searched by title and optional author.
#[async_trait]
pub trait TitleSearchSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whatever the catalog found. Nothing found and failure both give an
    /// empty result.
    async fn find_cover(&self, title: &str, author: Option<&str>) -> CatalogResult;
}

//! Cover cache fill: resolved URLs are written back onto the book rows so a
//! book is only resolved once until the next rebuild.

use bookstacks_core::{Book, BookId, CoverUpdate, Database};

use crate::resolver::CoverResolver;

/// Where resolved covers are read from and written back to.
pub trait CoverStore {
    fn list_books(&self) -> bookstacks_core::Result<Vec<Book>>;
    fn save_cover(&self, id: BookId, cover: &CoverUpdate) -> bookstacks_core::Result<()>;
}

impl CoverStore for Database {
    fn list_books(&self) -> bookstacks_core::Result<Vec<Book>> {
        Database::list_books(self)
    }

    fn save_cover(&self, id: BookId, cover: &CoverUpdate) -> bookstacks_core::Result<()> {
        self.update_cover(id, cover)
    }
}

/// The book's cover URL. A stored cover is returned untouched; otherwise the
/// cover is resolved and, unless it is the placeholder, stored on the book.
pub async fn get_or_fetch_cover<S>(resolver: &CoverResolver, store: &S, book: &Book) -> String
where
    S: CoverStore + ?Sized,
{
    if let Some(cached) = book.cached_cover() {
        return cached.to_string();
    }

    let result = resolver
        .resolve_cover(&book.title, Some(&book.author), book.isbn.as_deref())
        .await;
    let url = result
        .cover_url
        .clone()
        .unwrap_or_else(|| resolver.placeholder_url().to_string());
    if resolver.is_placeholder(&url) {
        return url;
    }

    if let Some(update) = result.to_cover_update(book.isbn.as_deref(), book.subjects.as_deref()) {
        if let Err(err) = store.save_cover(book.id, &update) {
            tracing::warn!(id = book.id, error = %err, "failed to store resolved cover");
        }
    }
    url
}

/// Re-resolves every stored book and stores each non-placeholder result.
/// Returns how many books were updated.
pub async fn rebuild_all_covers<S>(resolver: &CoverResolver, store: &S) -> usize
where
    S: CoverStore + ?Sized,
{
    let books = match store.list_books() {
        Ok(books) => books,
        Err(err) => {
            tracing::error!(error = %err, "failed to list books for cover rebuild");
            return 0;
        }
    };

    let total = books.len();
    let mut updated = 0;
    for book in &books {
        let result = resolver
            .resolve_cover(&book.title, Some(&book.author), book.isbn.as_deref())
            .await;
        let update = result
            .to_cover_update(book.isbn.as_deref(), book.subjects.as_deref())
            .filter(|update| !resolver.is_placeholder(&update.cover_url));
        let Some(update) = update else {
            tracing::debug!(id = book.id, title = %book.title, "no cover found, row left as is");
            continue;
        };

        match store.save_cover(book.id, &update) {
            Ok(()) => updated += 1,
            Err(err) => {
                tracing::warn!(id = book.id, error = %err, "failed to store rebuilt cover");
            }
        }
    }

    tracing::info!(updated, total, "cover rebuild finished");
    updated
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bookstacks_core::{BookstacksError, NewBook};

    use super::*;
    use crate::resolver::tests::{empty_search, isbn_source, resolver, search_source};
    use crate::types::CatalogResult;

    fn seed(db: &Database, title: &str, cover: Option<&str>) -> Book {
        let mut book = NewBook::new(title);
        book.author = Some("Albert Camus".to_string());
        book.subjects = Some("Classics".to_string());
        book.cover_url = cover.map(str::to_string);
        let id = db.add_book(&book).unwrap();
        db.get_book(id).unwrap()
    }

    struct BrokenStore;

    impl CoverStore for BrokenStore {
        fn list_books(&self) -> bookstacks_core::Result<Vec<Book>> {
            Err(BookstacksError::ConfigError("store offline".to_string()))
        }

        fn save_cover(&self, _id: BookId, _cover: &CoverUpdate) -> bookstacks_core::Result<()> {
            Err(BookstacksError::ConfigError("store offline".to_string()))
        }
    }

    #[tokio::test]
    async fn cached_cover_makes_no_calls() {
        let db = Database::open_in_memory().unwrap();
        let book = seed(&db, "The Plague", Some("https://mine.test/plague.jpg"));
        let isbn = isbn_source(Some("https://covers.test/unused.jpg"));
        let primary = search_source(CatalogResult::cover("https://covers.test/unused.jpg"));
        let secondary = search_source(CatalogResult::default());
        let r = resolver(isbn.clone(), primary.clone(), secondary.clone());

        let url = get_or_fetch_cover(&r, &db, &book).await;
        assert_eq!(url, "https://mine.test/plague.jpg");
        assert_eq!(isbn.call_count() + primary.call_count() + secondary.call_count(), 0);
    }

    #[tokio::test]
    async fn resolved_cover_is_stored_with_fallback_fields() {
        let db = Database::open_in_memory().unwrap();
        let book = seed(&db, "The Stranger", None);
        let primary = search_source(CatalogResult {
            cover_url: Some("https://covers.test/b/id/9-L.jpg".to_string()),
            isbn: Some("9780679720201".to_string()),
            subjects: None,
        });
        let r = resolver(isbn_source(None), primary.clone(), empty_search());

        let url = get_or_fetch_cover(&r, &db, &book).await;
        assert_eq!(url, "https://covers.test/b/id/9-L.jpg");

        let stored = db.get_book(book.id).unwrap();
        assert_eq!(stored.cover_url.as_deref(), Some("https://covers.test/b/id/9-L.jpg"));
        assert_eq!(stored.isbn.as_deref(), Some("9780679720201"));
        assert_eq!(stored.subjects.as_deref(), Some("Classics"));

        // Second read is served from the row.
        let again = get_or_fetch_cover(&r, &db, &stored).await;
        assert_eq!(again, url);
        assert_eq!(primary.call_count(), 1);
    }

    #[tokio::test]
    async fn placeholder_is_returned_but_not_stored() {
        let db = Database::open_in_memory().unwrap();
        let book = seed(&db, "Unfindable", None);
        let r = resolver(isbn_source(None), empty_search(), empty_search());

        let url = get_or_fetch_cover(&r, &db, &book).await;
        assert!(r.is_placeholder(&url));
        assert_eq!(db.get_book(book.id).unwrap().cover_url, None);
    }

    #[tokio::test]
    async fn store_failure_still_returns_url() {
        let db = Database::open_in_memory().unwrap();
        let book = seed(&db, "The Fall", None);
        let primary = search_source(CatalogResult::cover("https://covers.test/b/id/3-L.jpg"));
        let r = resolver(isbn_source(None), primary, empty_search());

        let url = get_or_fetch_cover(&r, &BrokenStore, &book).await;
        assert_eq!(url, "https://covers.test/b/id/3-L.jpg");
    }

    /// Title search that only knows some titles.
    struct KnownTitles(Vec<&'static str>);

    #[async_trait::async_trait]
    impl crate::sources::TitleSearchSource for KnownTitles {
        fn name(&self) -> &'static str {
            "known-titles"
        }

        async fn find_cover(&self, title: &str, _author: Option<&str>) -> CatalogResult {
            if self.0.iter().any(|known| *known == title) {
                CatalogResult::cover(format!("https://covers.test/{}.jpg", title.len()))
            } else {
                CatalogResult::default()
            }
        }
    }

    #[tokio::test]
    async fn rebuild_counts_only_resolved_books() {
        let db = Database::open_in_memory().unwrap();
        let old = "https://old.test/cover.jpg";
        let dune = seed(&db, "Dune", Some(old));
        let plague = seed(&db, "The Plague", None);
        let lost = seed(&db, "Lost Book", Some(old));
        let also_lost = seed(&db, "Another Lost Book", None);

        let r = CoverResolver::new(
            isbn_source(None),
            Arc::new(KnownTitles(vec!["Dune", "The Plague"])),
            empty_search(),
            "https://placeholder.test/none.png",
        );

        assert_eq!(rebuild_all_covers(&r, &db).await, 2);
        assert_eq!(
            db.get_book(dune.id).unwrap().cover_url.as_deref(),
            Some("https://covers.test/4.jpg")
        );
        assert_eq!(
            db.get_book(plague.id).unwrap().cover_url.as_deref(),
            Some("https://covers.test/10.jpg")
        );
        assert_eq!(db.get_book(lost.id).unwrap(), lost);
        assert_eq!(db.get_book(also_lost.id).unwrap(), also_lost);
    }

    /// Database that refuses to store the cover of one book.
    struct RejectingStore<'a> {
        db: &'a Database,
        reject: BookId,
    }

    impl CoverStore for RejectingStore<'_> {
        fn list_books(&self) -> bookstacks_core::Result<Vec<Book>> {
            self.db.list_books()
        }

        fn save_cover(&self, id: BookId, cover: &CoverUpdate) -> bookstacks_core::Result<()> {
            if id == self.reject {
                return Err(BookstacksError::ValidationError("row locked".to_string()));
            }
            self.db.update_cover(id, cover)
        }
    }

    #[tokio::test]
    async fn rebuild_does_not_count_books_that_fail_to_store() {
        let db = Database::open_in_memory().unwrap();
        let dune = seed(&db, "Dune", None);
        let plague = seed(&db, "The Plague", None);
        let fall = seed(&db, "The Fall", None);

        let r = CoverResolver::new(
            isbn_source(None),
            Arc::new(KnownTitles(vec!["Dune", "The Plague", "The Fall"])),
            empty_search(),
            "https://placeholder.test/none.png",
        );
        let store = RejectingStore {
            db: &db,
            reject: plague.id,
        };

        assert_eq!(rebuild_all_covers(&r, &store).await, 2);
        assert_eq!(db.get_book(plague.id).unwrap(), plague);
        assert!(db.get_book(dune.id).unwrap().cover_url.is_some());
        assert_eq!(
            db.get_book(fall.id).unwrap().cover_url.as_deref(),
            Some("https://covers.test/8.jpg")
        );
    }

    #[tokio::test]
    async fn rebuild_with_unreadable_store_is_zero() {
        let r = resolver(isbn_source(None), empty_search(), empty_search());
        assert_eq!(rebuild_all_covers(&r, &BrokenStore).await, 0);
    }
}

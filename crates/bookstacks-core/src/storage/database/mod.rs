mod connection;
mod migrations;
mod schema;

pub use connection::ConnectionPool;
pub use migrations::{Migration, get_applied_versions, run_migrations};
pub use schema::init_schema;

use std::path::Path;

use crate::error::{BookstacksError, Result};
use crate::models::{Book, BookId, CoverUpdate, LibraryStats, NewBook};

use super::queries::LibraryStatsQuery;
use super::repositories::{BookRepository, Repository, SqliteBookRepository};

pub fn open_database(path: &Path) -> Result<ConnectionPool> {
    let pool = ConnectionPool::open(path)?;
    {
        let conn = pool.get_connection();
        migrations::run_migrations(&conn)?;
    }
    Ok(pool)
}

pub fn open_in_memory() -> Result<ConnectionPool> {
    let pool = ConnectionPool::open_in_memory()?;
    {
        let conn = pool.get_connection();
        migrations::run_migrations(&conn)?;
    }
    Ok(pool)
}

/// The book store. Each method takes the connection lock for its own
/// duration only.
pub struct Database {
    pool: ConnectionPool,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let pool = open_database(path)?;
        Ok(Self { pool })
    }

    pub fn open_in_memory() -> Result<Self> {
        let pool = open_in_memory()?;
        Ok(Self { pool })
    }

    fn books(&self) -> SqliteBookRepository<'_> {
        SqliteBookRepository::new(self.pool.get_connection())
    }

    /// All books, newest year first, then by title.
    pub fn list_books(&self) -> Result<Vec<Book>> {
        self.books().list()
    }

    pub fn get_book(&self, id: BookId) -> Result<Book> {
        self.books()
            .find_by_id(&id)?
            .ok_or(BookstacksError::BookNotFound(id))
    }

    pub fn add_book(&self, book: &NewBook) -> Result<BookId> {
        let id = self.books().insert(book)?;
        tracing::info!(id, title = %book.title, "book added");
        Ok(id)
    }

    pub fn update_book(&self, id: BookId, book: &NewBook) -> Result<()> {
        self.books().update(id, book)?;
        tracing::info!(id, title = %book.title, "book updated");
        Ok(())
    }

    pub fn delete_book(&self, id: BookId) -> Result<()> {
        if !self.books().delete(&id)? {
            return Err(BookstacksError::BookNotFound(id));
        }
        tracing::info!(id, "book deleted");
        Ok(())
    }

    pub fn update_cover(&self, id: BookId, cover: &CoverUpdate) -> Result<()> {
        self.books().update_cover(id, cover)
    }

    pub fn count_books(&self) -> Result<usize> {
        self.books().count()
    }

    pub fn stats(&self) -> Result<LibraryStats> {
        LibraryStatsQuery::new(self.pool.get_connection()).get_stats()
    }

    pub fn path(&self) -> Option<&str> {
        self.pool.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_book(title: &str, author: &str, genre: &str, year: i32, rating: f64) -> NewBook {
        NewBook {
            title: title.to_string(),
            author: Some(author.to_string()),
            genre: Some(genre.to_string()),
            year: Some(year),
            rating: Some(rating),
            ..Default::default()
        }
    }

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.count_books().unwrap(), 0);
        assert!(db.path().is_none());
    }

    #[test]
    fn test_add_and_get() {
        let db = Database::open_in_memory().unwrap();
        let id = db
            .add_book(&new_book("The Stranger", "Albert Camus", "Philosophy", 2023, 4.5))
            .unwrap();

        let book = db.get_book(id).unwrap();
        assert_eq!(book.title, "The Stranger");
        assert_eq!(book.author, "Albert Camus");
        assert_eq!(book.genre, "Philosophy");
        assert_eq!(book.year, Some(2023));
        assert_eq!(book.rating, Some(4.5));
        assert_eq!(book.cover_url, None);
    }

    #[test]
    fn test_missing_author_and_genre_become_unknown() {
        let db = Database::open_in_memory().unwrap();
        let id = db.add_book(&NewBook::new("Untitled Notes")).unwrap();
        let book = db.get_book(id).unwrap();
        assert_eq!(book.author, "Unknown");
        assert_eq!(book.genre, "Unknown");
        assert_eq!(book.rating, None);
    }

    #[test]
    fn test_blank_strings_stored_as_absent() {
        let db = Database::open_in_memory().unwrap();
        let mut nb = NewBook::new("Dune");
        nb.cover_url = Some("   ".to_string());
        nb.isbn = Some(String::new());
        let id = db.add_book(&nb).unwrap();
        let book = db.get_book(id).unwrap();
        assert_eq!(book.cover_url, None);
        assert_eq!(book.isbn, None);
    }

    #[test]
    fn test_authors_are_shared() {
        let db = Database::open_in_memory().unwrap();
        db.add_book(&new_book("Norwegian Wood", "Haruki Murakami", "Fiction", 2024, 4.0))
            .unwrap();
        db.add_book(&new_book("Kafka on the Shore", "Haruki Murakami", "Fiction", 2023, 5.0))
            .unwrap();

        let conn = db.pool.get_connection();
        let authors: i64 = conn
            .query_row("SELECT COUNT(*) FROM authors", [], |row| row.get(0))
            .unwrap();
        assert_eq!(authors, 1);
    }

    #[test]
    fn test_list_orders_by_year_desc_then_title() {
        let db = Database::open_in_memory().unwrap();
        db.add_book(&new_book("B", "X", "G", 2023, 3.0)).unwrap();
        db.add_book(&new_book("A", "X", "G", 2023, 3.0)).unwrap();
        db.add_book(&new_book("C", "X", "G", 2025, 3.0)).unwrap();
        db.add_book(&NewBook::new("D")).unwrap();

        let titles: Vec<String> = db.list_books().unwrap().into_iter().map(|b| b.title).collect();
        assert_eq!(titles, vec!["C", "A", "B", "D"]);
    }

    #[test]
    fn test_update_replaces_fields_and_rating() {
        let db = Database::open_in_memory().unwrap();
        let id = db
            .add_book(&new_book("Dune", "Frank Herbert", "SF", 2020, 3.0))
            .unwrap();

        let mut edited = new_book("Dune Messiah", "Frank Herbert", "Science Fiction", 2021, 4.2);
        edited.cover_url = Some("https://example.com/dune.jpg".to_string());
        db.update_book(id, &edited).unwrap();

        let book = db.get_book(id).unwrap();
        assert_eq!(book.title, "Dune Messiah");
        assert_eq!(book.genre, "Science Fiction");
        assert_eq!(book.rating, Some(4.2));
        assert_eq!(book.cover_url.as_deref(), Some("https://example.com/dune.jpg"));

        let conn = db.pool.get_connection();
        let ratings: i64 = conn
            .query_row("SELECT COUNT(*) FROM ratings WHERE book_id = ?1", [id], |row| row.get(0))
            .unwrap();
        assert_eq!(ratings, 1);
    }

    #[test]
    fn test_update_missing_book() {
        let db = Database::open_in_memory().unwrap();
        let err = db.update_book(42, &NewBook::new("Ghost")).unwrap_err();
        assert!(matches!(err, BookstacksError::BookNotFound(42)));
    }

    #[test]
    fn test_delete_cascades_ratings() {
        let db = Database::open_in_memory().unwrap();
        let id = db
            .add_book(&new_book("Deletable", "A", "G", 2020, 2.0))
            .unwrap();
        db.delete_book(id).unwrap();

        assert!(matches!(db.get_book(id), Err(BookstacksError::BookNotFound(_))));
        assert!(matches!(db.delete_book(id), Err(BookstacksError::BookNotFound(_))));

        let conn = db.pool.get_connection();
        let ratings: i64 = conn
            .query_row("SELECT COUNT(*) FROM ratings", [], |row| row.get(0))
            .unwrap();
        assert_eq!(ratings, 0);
    }

    #[test]
    fn test_update_cover_writes_back_fields() {
        let db = Database::open_in_memory().unwrap();
        let id = db.add_book(&NewBook::new("Dune")).unwrap();
        db.update_cover(
            id,
            &CoverUpdate {
                cover_url: "https://covers.openlibrary.org/b/id/42-L.jpg".to_string(),
                isbn: Some("9780441013593".to_string()),
                subjects: Some("Science fiction, Deserts".to_string()),
            },
        )
        .unwrap();

        let book = db.get_book(id).unwrap();
        assert_eq!(
            book.cover_url.as_deref(),
            Some("https://covers.openlibrary.org/b/id/42-L.jpg")
        );
        assert_eq!(book.isbn.as_deref(), Some("9780441013593"));
        assert_eq!(book.subject_list(), vec!["Science fiction", "Deserts"]);
    }

    #[test]
    fn test_update_cover_rejects_invalid_url() {
        let db = Database::open_in_memory().unwrap();
        let id = db.add_book(&NewBook::new("Dune")).unwrap();
        let err = db
            .update_cover(
                id,
                &CoverUpdate {
                    cover_url: "nope".to_string(),
                    isbn: None,
                    subjects: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, BookstacksError::ValidationError(_)));
        assert_eq!(db.get_book(id).unwrap().cover_url, None);
    }

    #[test]
    fn test_stats() {
        let db = Database::open_in_memory().unwrap();
        db.add_book(&new_book("A", "X", "Fiction", 2021, 4.0)).unwrap();
        db.add_book(&new_book("B", "Y", "Fiction", 2023, 3.0)).unwrap();
        db.add_book(&new_book("C", "Z", "Philosophy", 2023, 5.0)).unwrap();
        db.add_book(&NewBook::new("D")).unwrap();

        let stats = db.stats().unwrap();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.average_rating, Some(4.0));
        assert_eq!(stats.top_genre.as_deref(), Some("Fiction"));
        assert_eq!(stats.year_range, Some((2021, 2023)));
        assert_eq!(stats.by_genre.len(), 3);
        assert_eq!(stats.by_year.len(), 2);
        assert_eq!(stats.by_year[1].count, 2);
    }

    #[test]
    fn test_stats_on_empty_library() {
        let db = Database::open_in_memory().unwrap();
        let stats = db.stats().unwrap();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.average_rating, None);
        assert_eq!(stats.top_genre, None);
        assert_eq!(stats.year_range, None);
    }
}

use rusqlite::{Connection, OptionalExtension, params};
use std::sync::MutexGuard;

use crate::error::{BookstacksError, Result};
use crate::models::{Book, BookId, CoverUpdate, NewBook, non_blank};

use super::Repository;

const SELECT_BOOKS: &str = "
    SELECT b.id,
           b.title,
           COALESCE(a.name, 'Unknown'),
           COALESCE(g.name, 'Unknown'),
           b.year,
           b.isbn,
           b.subjects,
           b.cover_url,
           ROUND(AVG(r.rating), 2)
    FROM books b
    LEFT JOIN authors a ON b.author_id = a.id
    LEFT JOIN genres  g ON b.genre_id  = g.id
    LEFT JOIN ratings r ON b.id = r.book_id";

pub trait BookRepository: Repository<Entity = Book, Id = BookId> {
    fn list(&self) -> Result<Vec<Book>>;
    fn count(&self) -> Result<usize>;
    fn insert(&self, book: &NewBook) -> Result<BookId>;
    fn update(&self, id: BookId, book: &NewBook) -> Result<()>;
    fn update_cover(&self, id: BookId, cover: &CoverUpdate) -> Result<()>;
}

pub struct SqliteBookRepository<'a> {
    conn: MutexGuard<'a, Connection>,
}

impl<'a> SqliteBookRepository<'a> {
    pub fn new(conn: MutexGuard<'a, Connection>) -> Self {
        Self { conn }
    }

    fn row_to_book(row: &rusqlite::Row) -> rusqlite::Result<Book> {
        Ok(Book {
            id: row.get(0)?,
            title: row.get(1)?,
            author: row.get(2)?,
            genre: row.get(3)?,
            year: row.get(4)?,
            isbn: row.get(5)?,
            subjects: row.get(6)?,
            cover_url: row.get(7)?,
            rating: row.get(8)?,
        })
    }

    fn get_or_create_author(conn: &Connection, name: &str) -> Result<i64> {
        get_or_create_named(conn, "authors", name)
    }

    fn get_or_create_genre(conn: &Connection, name: &str) -> Result<i64> {
        get_or_create_named(conn, "genres", name)
    }
}

fn get_or_create_named(conn: &Connection, table: &str, name: &str) -> Result<i64> {
    conn.execute(
        &format!("INSERT OR IGNORE INTO {table} (name) VALUES (?1)"),
        params![name],
    )?;
    let id = conn.query_row(
        &format!("SELECT id FROM {table} WHERE name = ?1"),
        params![name],
        |row| row.get(0),
    )?;
    Ok(id)
}

fn owned(value: Option<&String>) -> Option<String> {
    non_blank(value.map(String::as_str)).map(str::to_string)
}

impl Repository for SqliteBookRepository<'_> {
    type Entity = Book;
    type Id = BookId;

    fn find_by_id(&self, id: &Self::Id) -> Result<Option<Self::Entity>> {
        let sql = format!("{SELECT_BOOKS} WHERE b.id = ?1 GROUP BY b.id");
        let book = self
            .conn
            .query_row(&sql, params![id], Self::row_to_book)
            .optional()?;
        Ok(book)
    }

    /// Ratings go with the book through `ON DELETE CASCADE`.
    fn delete(&self, id: &Self::Id) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM books WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }
}

impl BookRepository for SqliteBookRepository<'_> {
    fn list(&self) -> Result<Vec<Book>> {
        let sql = format!("{SELECT_BOOKS} GROUP BY b.id ORDER BY b.year DESC, b.title");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], Self::row_to_book)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn insert(&self, book: &NewBook) -> Result<BookId> {
        book.validate()?;
        let tx = self.conn.unchecked_transaction()?;

        let author_id = Self::get_or_create_author(&tx, book.author_name())?;
        let genre_id = Self::get_or_create_genre(&tx, book.genre_name())?;

        tx.execute(
            "INSERT INTO books (title, author_id, genre_id, year, isbn, subjects, cover_url)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                book.title.trim(),
                author_id,
                genre_id,
                book.year,
                owned(book.isbn.as_ref()),
                owned(book.subjects.as_ref()),
                owned(book.cover_url.as_ref()),
            ],
        )?;
        let id = tx.last_insert_rowid();

        if let Some(rating) = book.rating {
            tx.execute(
                "INSERT INTO ratings (book_id, rating) VALUES (?1, ?2)",
                params![id, rating],
            )?;
        }

        tx.commit()?;
        Ok(id)
    }

    /// Overwrites every editable field and replaces the rating rows.
    fn update(&self, id: BookId, book: &NewBook) -> Result<()> {
        book.validate()?;
        let tx = self.conn.unchecked_transaction()?;

        let author_id = Self::get_or_create_author(&tx, book.author_name())?;
        let genre_id = Self::get_or_create_genre(&tx, book.genre_name())?;

        let changed = tx.execute(
            "UPDATE books
             SET title = ?1, author_id = ?2, genre_id = ?3, year = ?4,
                 isbn = ?5, subjects = ?6, cover_url = ?7
             WHERE id = ?8",
            params![
                book.title.trim(),
                author_id,
                genre_id,
                book.year,
                owned(book.isbn.as_ref()),
                owned(book.subjects.as_ref()),
                owned(book.cover_url.as_ref()),
                id,
            ],
        )?;
        if changed == 0 {
            return Err(BookstacksError::BookNotFound(id));
        }

        tx.execute("DELETE FROM ratings WHERE book_id = ?1", params![id])?;
        if let Some(rating) = book.rating {
            tx.execute(
                "INSERT INTO ratings (book_id, rating) VALUES (?1, ?2)",
                params![id, rating],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn update_cover(&self, id: BookId, cover: &CoverUpdate) -> Result<()> {
        crate::models::validate_cover_url(&cover.cover_url)?;
        let changed = self.conn.execute(
            "UPDATE books SET cover_url = ?1, isbn = ?2, subjects = ?3 WHERE id = ?4",
            params![
                cover.cover_url.trim(),
                owned(cover.isbn.as_ref()),
                owned(cover.subjects.as_ref()),
                id,
            ],
        )?;
        if changed == 0 {
            return Err(BookstacksError::BookNotFound(id));
        }
        Ok(())
    }
}

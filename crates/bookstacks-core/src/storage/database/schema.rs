use rusqlite::Connection;

use crate::error::Result;

pub fn apply_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        ",
    )?;
    Ok(())
}

pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS authors (
            id    INTEGER PRIMARY KEY AUTOINCREMENT,
            name  TEXT UNIQUE NOT NULL
        );

        CREATE TABLE IF NOT EXISTS genres (
            id    INTEGER PRIMARY KEY AUTOINCREMENT,
            name  TEXT UNIQUE NOT NULL
        );

        CREATE TABLE IF NOT EXISTS books (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            title       TEXT NOT NULL,
            author_id   INTEGER REFERENCES authors(id),
            genre_id    INTEGER REFERENCES genres(id),
            year        INTEGER,
            isbn        TEXT,
            subjects    TEXT,
            cover_url   TEXT
        );

        CREATE TABLE IF NOT EXISTS ratings (
            id       INTEGER PRIMARY KEY AUTOINCREMENT,
            book_id  INTEGER NOT NULL REFERENCES books(id) ON DELETE CASCADE,
            rating   REAL NOT NULL CHECK(rating >= 0 AND rating <= 5)
        );
        ",
    )?;
    Ok(())
}

pub fn create_indexes(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_books_year     ON books(year);
        CREATE INDEX IF NOT EXISTS idx_books_author   ON books(author_id);
        CREATE INDEX IF NOT EXISTS idx_books_genre    ON books(genre_id);
        CREATE INDEX IF NOT EXISTS idx_ratings_book   ON ratings(book_id);
        ",
    )?;
    Ok(())
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    create_tables(conn)?;
    create_indexes(conn)?;
    Ok(())
}

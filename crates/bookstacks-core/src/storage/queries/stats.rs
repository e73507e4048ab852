use rusqlite::Connection;
use std::sync::MutexGuard;

use crate::error::Result;
use crate::models::{GenreCount, LibraryStats, YearCount};

pub struct LibraryStatsQuery<'a> {
    conn: MutexGuard<'a, Connection>,
}

impl<'a> LibraryStatsQuery<'a> {
    pub fn new(conn: MutexGuard<'a, Connection>) -> Self {
        Self { conn }
    }

    pub fn get_stats(&self) -> Result<LibraryStats> {
        let total: usize = self
            .conn
            .query_row("SELECT COUNT(*) FROM books", [], |row| {
                row.get::<_, i64>(0).map(|n| n as usize)
            })?;

        // Mean of the per-book averages, like the rating column shown in the grid.
        let average_rating: Option<f64> = self.conn.query_row(
            "SELECT AVG(per_book) FROM (
                 SELECT ROUND(AVG(rating), 2) AS per_book FROM ratings GROUP BY book_id
             )",
            [],
            |row| row.get(0),
        )?;

        let year_range: Option<(i32, i32)> = self.conn.query_row(
            "SELECT MIN(year), MAX(year) FROM books WHERE year IS NOT NULL",
            [],
            |row| {
                let min: Option<i32> = row.get(0)?;
                let max: Option<i32> = row.get(1)?;
                Ok(min.zip(max))
            },
        )?;

        let by_genre = self.count_by_genre()?;
        let top_genre = by_genre.first().map(|g| g.genre.clone());

        Ok(LibraryStats {
            total,
            average_rating: average_rating.map(round2),
            top_genre,
            year_range,
            by_genre,
            by_year: self.count_by_year()?,
        })
    }

    /// Most common first; ties broken alphabetically.
    pub fn count_by_genre(&self) -> Result<Vec<GenreCount>> {
        let mut stmt = self.conn.prepare(
            "SELECT COALESCE(g.name, 'Unknown') AS genre, COUNT(*) AS n
             FROM books b LEFT JOIN genres g ON b.genre_id = g.id
             GROUP BY genre
             ORDER BY n DESC, genre ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(GenreCount {
                    genre: row.get(0)?,
                    count: row.get::<_, i64>(1)? as usize,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn count_by_year(&self) -> Result<Vec<YearCount>> {
        let mut stmt = self.conn.prepare(
            "SELECT year, COUNT(*) FROM books
             WHERE year IS NOT NULL
             GROUP BY year ORDER BY year",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(YearCount {
                    year: row.get(0)?,
                    count: row.get::<_, i64>(1)? as usize,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

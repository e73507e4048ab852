//! Bookstacks core: book records, SQLite storage, configuration and
//! dashboard statistics.

pub mod config;
pub mod error;
pub mod filter;
pub mod models;
pub mod storage;

pub use config::{AppConfig, CoreConfig, CoversConfig};
pub use error::{BookstacksError, ExitCode, Result};
pub use filter::BookFilter;
pub use models::*;

pub use storage::database::{ConnectionPool, Database, open_database, open_in_memory};
pub use storage::queries::LibraryStatsQuery;
pub use storage::repositories::{BookRepository, Repository, SqliteBookRepository};

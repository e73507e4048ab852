use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::Connection;

use super::schema::apply_pragmas;
use crate::error::Result;

/// A single SQLite connection behind a mutex: every read or write call is
/// serialized, nothing spans calls.
pub struct ConnectionPool {
    path: Option<String>,
    connection: Mutex<Connection>,
}

impl ConnectionPool {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        apply_pragmas(&conn)?;
        Ok(Self {
            path: Some(path.to_string_lossy().to_string()),
            connection: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_pragmas(&conn)?;
        Ok(Self {
            path: None,
            connection: Mutex::new(conn),
        })
    }

    pub fn get_connection(&self) -> MutexGuard<'_, Connection> {
        self.connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}

//! SQLite implementations of [`OrmBackend`](orm_core::OrmBackend).
//!
//! - [`relational::RelationalBackend`]: normalized tables with foreign keys
//! - [`blob::BlobBackend`]: one key-value table with `bincode` payloads

pub mod blob;
pub mod relational;

use anyhow::{Context, Result};
use orm_core::{Book, Person};
use rusqlite::{Connection, Row};
use std::path::Path;

pub use blob::BlobBackend;
pub use relational::RelationalBackend;

/// Configure a connection for benchmark throughput.
pub fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = OFF;
         PRAGMA cache_size = -131072;
         PRAGMA temp_store = MEMORY;
         PRAGMA foreign_keys = ON;",
    )?;
    Ok(())
}

pub(crate) fn open_connection(path: Option<&Path>) -> Result<Connection> {
    match path {
        Some(path) => Connection::open(path)
            .with_context(|| format!("failed to open SQLite database {}", path.display())),
        None => Connection::open_in_memory().context("failed to open in-memory SQLite"),
    }
}

/// Clamp a requested row count to what `LIMIT` accepts.
pub(crate) fn sql_limit(quantity: usize) -> i64 {
    i64::try_from(quantity).unwrap_or(i64::MAX)
}

pub(crate) fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        id: Some(row.get(0)?),
        title: row.get(1)?,
        author: row.get(2)?,
    })
}

pub(crate) fn person_from_row(row: &Row<'_>) -> rusqlite::Result<Person> {
    Ok(Person {
        id: Some(row.get(0)?),
        first_name: row.get(1)?,
        second_name: row.get(2)?,
    })
}

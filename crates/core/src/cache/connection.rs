//! Database connection management with pragma configuration.
//!
//! This module handles opening the SQLite metadata database, applying pragmas,
//! and running migrations. Every open ensures the schema, so callers can open a
//! fresh handle per fetch and close it when done.

use super::migrations;
use crate::Error;
use std::path::Path;
use tokio_rusqlite::Connection;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
                       PRAGMA synchronous=NORMAL;
                       PRAGMA temp_store=MEMORY;";

/// Metadata database handle.
///
/// Wraps a tokio-rusqlite Connection that runs database operations
/// on a background thread.
#[derive(Clone, Debug)]
pub struct CacheDb {
    pub(crate) conn: Connection,
}

impl CacheDb {
    /// Open a database at the specified path.
    ///
    /// Creates the file if it doesn't exist, applies pragmas,
    /// and runs any pending migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::init(conn).await
    }

    /// Open an in-memory database for testing.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| {
            conn.execute_batch(PRAGMAS)?;
            Ok(())
        })
        .await
        .map_err(Error::Database)?;

        migrations::run(&conn).await?;

        Ok(Self { conn })
    }

    /// Close the connection, waiting for the background thread to finish.
    ///
    /// Other clones of this handle see `ConnectionClosed` afterwards.
    pub async fn close(self) -> Result<(), Error> {
        self.conn.close().await.map_err(Error::Database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let version = db
            .conn
            .call(|conn| conn.query_row("SELECT sqlite_version()", [], |row| row.get::<_, String>(0)))
            .await
            .unwrap();
        assert!(!version.is_empty());
    }

    #[tokio::test]
    async fn test_schema_is_single_table() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let tables = db
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type='table'")?;
                let names = stmt.query_map([], |row| row.get(0))?.collect::<Result<Vec<String>, _>>()?;
                Ok::<_, tokio_rusqlite::rusqlite::Error>(names)
            })
            .await
            .unwrap();
        assert_eq!(tables, vec!["response".to_string()]);
    }

    #[tokio::test]
    async fn test_open_file_twice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.sqlite");

        let first = CacheDb::open(&path).await.unwrap();
        first.close().await.unwrap();

        let second = CacheDb::open(&path).await.unwrap();
        second.close().await.unwrap();

        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_close_invalidates_clones() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let clone = db.clone();
        db.close().await.unwrap();

        let result = clone.get_response("http://example.test/").await;
        assert!(matches!(result, Err(Error::Database(_))));
    }
}

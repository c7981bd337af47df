//! Database schema migrations.
//!
//! The applied version lives in SQLite's `user_version` header field, so the
//! database file holds nothing but the `response` table.

use super::Error;
use tokio_rusqlite::Connection;

/// Migration list: (version, SQL).
///
/// Migrations must be applied in order. All migrations are idempotent
/// using CREATE IF NOT EXISTS, so running them against a database created
/// without a recorded version is harmless.
const MIGRATIONS: &[(i64, &str)] = &[(1, include_str!("../../migrations/001_response.sql"))];

/// Run any pending migrations.
///
/// Reads `PRAGMA user_version`, applies every migration above it and bumps the
/// version after each one.
///
/// # Errors
///
/// Returns an error if a migration SQL fails to execute.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        let current: i64 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .map_err(Error::from)?;

        for &(version, sql) in MIGRATIONS {
            if version > current {
                tracing::debug!(version, "applying migration");
                conn.execute_batch(sql)
                    .map_err(|e| Error::MigrationFailed(format!("version {version}: {e}")))?;
                conn.pragma_update(None, "user_version", version)
                    .map_err(Error::from)?;
            }
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}

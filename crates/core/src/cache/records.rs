//! Response record operations.
//!
//! A record maps an exact request URL string to the normalized headers of the
//! last 200 response and the absolute path of its stored payload.

use std::path::{Path, PathBuf};

use super::connection::CacheDb;
use super::headers::NormalizedHeaders;
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Cached bookkeeping for one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRecord {
    pub url: String,
    pub headers: NormalizedHeaders,
    pub location: Option<PathBuf>,
}

impl CacheDb {
    /// Get the record for `url`.
    ///
    /// Matches on exact string equality; no URL normalization is applied.
    /// Returns None if the URL has never been stored.
    pub async fn get_response(&self, url: &str) -> Result<Option<ResponseRecord>, Error> {
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<Option<ResponseRecord>, Error> {
                let mut stmt = conn.prepare("SELECT url, headers, location FROM response WHERE url = ?1")?;

                let result = stmt.query_row(params![url], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?, row.get::<_, Option<String>>(2)?))
                });

                match result {
                    Ok((url, headers, location)) => {
                        let headers = match headers {
                            Some(json) => NormalizedHeaders::from_json(&json)?,
                            None => NormalizedHeaders::default(),
                        };
                        Ok(Some(ResponseRecord { url, headers, location: location.map(PathBuf::from) }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace the record for `url`.
    ///
    /// Runs as a single autocommit statement, so the row is durable once this
    /// returns. `location` must be valid UTF-8 to round-trip through the
    /// `TEXT` column; anything else is `Error::InvalidInput`.
    pub async fn upsert_response(&self, url: &str, headers: &NormalizedHeaders, location: &Path) -> Result<(), Error> {
        let url = url.to_string();
        let headers = headers.to_json()?;
        let location = location
            .to_str()
            .ok_or_else(|| Error::InvalidInput(format!("payload location is not valid UTF-8: {}", location.display())))?
            .to_string();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR REPLACE INTO response (url, headers, location) VALUES (?1, ?2, ?3)",
                    params![url, headers, location],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Number of stored records.
    pub async fn response_count(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM response", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

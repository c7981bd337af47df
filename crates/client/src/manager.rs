//! Cache manager: the public entry point.
//!
//! Each call opens the metadata store, looks up the URL, revalidates with the
//! origin when a usable payload exists, and then either stores a fresh body or
//! serves the cached one. The store connection is closed before the call
//! returns, on every path.
//!
//! On a fresh response the payload file is written before the metadata row, so
//! a record never points at a file that was not written.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use lastmod_core::{AppConfig, CacheDb, Error, NormalizedHeaders, PayloadStore};

use crate::fetch::{FetchClient, FetchConfig, FetchOutcome, FetchRequest};

/// A response body together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    /// Downloaded from the origin (`200`) and written through to the cache.
    Fresh(Bytes),
    /// Read from the cache after the origin answered `304`.
    Cached(Bytes),
}

impl Fetched {
    pub fn bytes(&self) -> &Bytes {
        match self {
            Fetched::Fresh(bytes) | Fetched::Cached(bytes) => bytes,
        }
    }

    pub fn into_bytes(self) -> Bytes {
        match self {
            Fetched::Fresh(bytes) | Fetched::Cached(bytes) => bytes,
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, Fetched::Fresh(_))
    }
}

/// Write-through owed after a `200`.
struct PendingWrite {
    location: PathBuf,
    headers: NormalizedHeaders,
}

/// Conditional-GET cache over a metadata database and a payload directory.
#[derive(Debug, Clone)]
pub struct CacheManager {
    client: FetchClient,
    payload: PayloadStore,
    db_path: PathBuf,
}

impl CacheManager {
    /// Build a manager from configuration.
    ///
    /// Fails immediately if `cache_path` or `db` is missing.
    pub fn new(config: &AppConfig) -> Result<Self, Error> {
        config.validate()?;
        let payload = PayloadStore::new(config.require_cache_path()?)?;
        let db_path = config.require_db()?.to_path_buf();
        let client = FetchClient::new(FetchConfig::from(config))?;

        Ok(Self { client, payload, db_path })
    }

    /// Build a manager from the `[lastmod]` section of a TOML file, layered
    /// under `LASTMOD_*` environment variables.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let config = AppConfig::load(Some(path.as_ref()))?;
        Self::new(&config)
    }

    pub fn payload_store(&self) -> &PayloadStore {
        &self.payload
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn client(&self) -> &FetchClient {
        &self.client
    }

    /// Fetch a URL through the cache.
    ///
    /// On `200` the body is stored before this returns. On `304` the stored
    /// payload is returned. A `304` with nothing cached is an error.
    pub async fn fetch(&self, request: impl Into<FetchRequest>) -> Result<Fetched, Error> {
        self.open(request, Fetched::clone).await
    }

    /// Fetch a URL and hand the body to `read` before the write-through.
    ///
    /// After `read` returns, the payload and metadata are written regardless
    /// of what `read` did. If that write fails the error is returned even
    /// though `read` has already seen the body, which then was not durably
    /// cached.
    ///
    /// A panic in `read` is held until the write-through has run and then
    /// resumed. A write failure in that case is only logged.
    pub async fn open<F, R>(&self, request: impl Into<FetchRequest>, read: F) -> Result<R, Error>
    where
        F: FnOnce(&Fetched) -> R,
    {
        let request = request.into();
        let db = CacheDb::open(&self.db_path).await?;
        let result = self.open_with(&db, &request, read).await;

        if let Err(e) = db.close().await {
            tracing::warn!(error = %e, "failed to close metadata store");
        }

        result
    }

    async fn open_with<F, R>(&self, db: &CacheDb, request: &FetchRequest, read: F) -> Result<R, Error>
    where
        F: FnOnce(&Fetched) -> R,
    {
        let (fetched, pending) = self.exchange(db, request).await?;
        let output = panic::catch_unwind(AssertUnwindSafe(|| read(&fetched)));

        let stored = match pending {
            Some(pending) => self.write_through(db, &request.url, &fetched, &pending).await,
            None => Ok(()),
        };

        match output {
            Ok(output) => stored.map(|()| output),
            Err(payload) => {
                if let Err(e) = stored {
                    tracing::warn!(url = %request.url, error = %e, "write-through failed after reader panicked");
                }
                panic::resume_unwind(payload)
            }
        }
    }

    async fn write_through(&self, db: &CacheDb, url: &str, fetched: &Fetched, pending: &PendingWrite) -> Result<(), Error> {
        self.payload.write(&pending.location, fetched.bytes()).await?;
        db.upsert_response(url, &pending.headers, &pending.location).await?;
        tracing::debug!(url, location = %pending.location.display(), "cached response");
        Ok(())
    }

    async fn exchange(&self, db: &CacheDb, request: &FetchRequest) -> Result<(Fetched, Option<PendingWrite>), Error> {
        let url = request.url.as_str();
        let record = db.get_response(url).await?;

        let cache_dest = match &request.cache_dest {
            Some(dest) => Some(std::path::absolute(dest).map_err(|e| Error::from_io(dest, e))?),
            None => record.as_ref().and_then(|r| r.location.clone()),
        };

        let mut if_modified_since = None;
        if let Some(record) = &record
            && let Some(dest) = &cache_dest
        {
            if self.payload.exists(dest).await? {
                if_modified_since = record.headers.last_modified();
            } else {
                tracing::debug!(url, location = %dest.display(), "cached payload missing, fetching unconditionally");
            }
        } else {
            tracing::debug!(url, "no cached response");
        }

        match self.client.fetch(request, if_modified_since).await? {
            FetchOutcome::Fresh(response) => {
                let location = cache_dest.unwrap_or_else(|| self.payload.resolve_location(url));
                let pending = PendingWrite { location, headers: response.headers };
                Ok((Fetched::Fresh(response.bytes), Some(pending)))
            }
            FetchOutcome::NotModified { .. } => {
                let Some(location) = cache_dest else {
                    return Err(Error::NotModifiedWithoutCache(url.to_string()));
                };
                let body = self.payload.read(&location).await?;
                tracing::debug!(url, location = %location.display(), "serving cached payload");
                Ok((Fetched::Cached(Bytes::from(body)), None))
            }
        }
    }
}

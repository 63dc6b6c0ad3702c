//! Store-level operations: opening stores and matching across all of them.

use async_trait::async_trait;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::OptionalExtension;

use super::connection::CacheDb;
use super::hash::compute_request_key;
use super::store::{NamedCache, RESPONSE_COLUMNS, StoredResponse};
use crate::Error;
use crate::http::{Method, Request, Response};
use crate::worker::CacheStorage;

impl CacheDb {
    /// Open the store called `name`, creating it if absent.
    pub async fn open_cache(&self, name: &str) -> Result<NamedCache, Error> {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("cache name cannot be empty".into()));
        }
        let owned = name.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        let id = self
            .conn
            .call(move |conn| -> Result<i64, Error> {
                conn.execute(
                    "INSERT INTO caches (name, created_at) VALUES (?1, ?2) ON CONFLICT(name) DO NOTHING",
                    params![owned, created_at],
                )?;
                let id = conn.query_row("SELECT id FROM caches WHERE name = ?1", params![owned], |row| row.get(0))?;
                Ok(id)
            })
            .await
            .map_err(Error::from)?;

        Ok(NamedCache { db: self.clone(), id, name: name.to_string() })
    }

    /// Whether a store called `name` exists. Never creates one.
    pub async fn has_cache(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists =
                    conn.query_row("SELECT EXISTS(SELECT 1 FROM caches WHERE name = ?1)", params![name], |row| {
                        row.get(0)
                    })?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Look up an existing store without creating it.
    pub async fn find_cache(&self, name: &str) -> Result<Option<NamedCache>, Error> {
        let owned = name.to_string();
        let id = self
            .conn
            .call(move |conn| -> Result<Option<i64>, Error> {
                let id = conn
                    .query_row("SELECT id FROM caches WHERE name = ?1", params![owned], |row| row.get(0))
                    .optional()?;
                Ok(id)
            })
            .await
            .map_err(Error::from)?;

        Ok(id.map(|id| NamedCache { db: self.clone(), id, name: name.to_string() }))
    }

    /// Store names in creation order.
    pub async fn cache_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM caches ORDER BY id")?;
                let names = stmt.query_map([], |row| row.get(0))?.collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Total entries across every store.
    pub async fn entry_count(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Match `request` against every store; the oldest store with an entry wins.
    ///
    /// Non-GET requests never match.
    pub async fn match_any(&self, request: &Request) -> Result<Option<Response>, Error> {
        if request.method != Method::Get {
            return Ok(None);
        }
        let key = compute_request_key(request.method, &request.url);
        let stored = self
            .conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                let sql = format!(
                    "SELECT {RESPONSE_COLUMNS} FROM entries e
                     JOIN caches c ON c.id = e.cache_id
                     WHERE e.request_key = ?1
                     ORDER BY c.id
                     LIMIT 1"
                );
                let stored = conn.query_row(&sql, params![key], StoredResponse::from_row).optional()?;
                Ok(stored)
            })
            .await
            .map_err(Error::from)?;

        stored.map(StoredResponse::into_response).transpose()
    }
}

#[async_trait]
impl CacheStorage for CacheDb {
    type Store = NamedCache;

    async fn open(&self, name: &str) -> Result<NamedCache, Error> {
        self.open_cache(name).await
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        self.has_cache(name).await
    }

    async fn match_request(&self, request: &Request) -> Result<Option<Response>, Error> {
        self.match_any(request).await
    }
}

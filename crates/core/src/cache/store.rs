//! Entry operations on a single named store.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use futures_util::future::try_join_all;
use tokio_rusqlite::{params, rusqlite};

use super::connection::CacheDb;
use super::hash::compute_request_key;
use crate::Error;
use crate::http::{Method, Request, Response, ResponseSource};
use crate::worker::{CacheStore, Network};

/// Columns read back to rebuild a stored response, in `StoredResponse` order.
pub(crate) const RESPONSE_COLUMNS: &str =
    "e.response_url, e.status, e.status_text, e.response_headers_json, e.body";

/// Raw response columns as they come out of SQLite.
pub(crate) struct StoredResponse {
    url: String,
    status: i64,
    status_text: String,
    headers_json: String,
    body: Vec<u8>,
}

impl StoredResponse {
    pub(crate) fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            url: row.get(0)?,
            status: row.get(1)?,
            status_text: row.get(2)?,
            headers_json: row.get(3)?,
            body: row.get(4)?,
        })
    }

    pub(crate) fn into_response(self) -> Result<Response, Error> {
        let status = u16::try_from(self.status)
            .map_err(|_| Error::CorruptEntry(format!("status {} out of range", self.status)))?;
        let headers: BTreeMap<String, String> = serde_json::from_str(&self.headers_json)?;
        Ok(Response {
            url: self.url,
            status,
            status_text: self.status_text,
            headers,
            body: self.body.into(),
            source: ResponseSource::Cache,
        })
    }
}

/// Reject requests the cache cannot hold.
pub(crate) fn check_storable(request: &Request) -> Result<(), Error> {
    if request.method != Method::Get {
        return Err(Error::InvalidRequest(format!("only GET requests can be cached, got {}", request.method)));
    }
    match request.url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(Error::InvalidRequest(format!("unsupported scheme: {scheme}"))),
    }
}

/// A named store inside a `CacheDb`.
#[derive(Clone, Debug)]
pub struct NamedCache {
    pub(crate) db: CacheDb,
    pub(crate) id: i64,
    pub(crate) name: String,
}

impl NamedCache {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look a request up in this store only.
    ///
    /// Non-GET requests never match.
    pub async fn get(&self, request: &Request) -> Result<Option<Response>, Error> {
        if request.method != Method::Get {
            return Ok(None);
        }
        let key = compute_request_key(request.method, &request.url);
        let cache_id = self.id;
        let stored = self
            .db
            .conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                let sql =
                    format!("SELECT {RESPONSE_COLUMNS} FROM entries e WHERE e.cache_id = ?1 AND e.request_key = ?2");
                match conn.query_row(&sql, params![cache_id, key], StoredResponse::from_row) {
                    Ok(s) => Ok(Some(s)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        stored.map(StoredResponse::into_response).transpose()
    }

    /// Request URLs stored in this store, oldest entry first.
    pub async fn keys(&self) -> Result<Vec<String>, Error> {
        let cache_id = self.id;
        self.db
            .conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM entries WHERE cache_id = ?1 ORDER BY cached_at, url")?;
                let urls = stmt
                    .query_map(params![cache_id], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in this store.
    pub async fn len(&self) -> Result<u64, Error> {
        let cache_id = self.id;
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE cache_id = ?1", params![cache_id], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len().await? == 0)
    }

    /// Write every pair in one transaction, replacing entries with the same key.
    pub(crate) async fn put_all(&self, entries: Vec<(Request, Response)>) -> Result<(), Error> {
        let cache_id = self.id;
        let cached_at = chrono::Utc::now().to_rfc3339();
        let mut rows = Vec::with_capacity(entries.len());
        for (request, response) in entries {
            check_storable(&request)?;
            rows.push((
                compute_request_key(request.method, &request.url),
                request.method.as_str(),
                request.url.to_string(),
                serde_json::to_string(&request.headers)?,
                response.url,
                response.status as i64,
                response.status_text,
                serde_json::to_string(&response.headers)?,
                response.body.to_vec(),
            ));
        }

        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO entries (
                        cache_id, request_key, method, url, request_headers_json,
                        response_url, status, status_text, response_headers_json, body, cached_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                    ON CONFLICT(cache_id, request_key) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        request_headers_json = excluded.request_headers_json,
                        response_url = excluded.response_url,
                        status = excluded.status,
                        status_text = excluded.status_text,
                        response_headers_json = excluded.response_headers_json,
                        body = excluded.body,
                        cached_at = excluded.cached_at",
                    )?;
                    for (key, method, url, req_headers, resp_url, status, status_text, resp_headers, body) in &rows {
                        stmt.execute(params![
                            cache_id,
                            key,
                            method,
                            url,
                            req_headers,
                            resp_url,
                            status,
                            status_text,
                            resp_headers,
                            body,
                            &cached_at,
                        ])?;
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait]
impl CacheStore for NamedCache {
    fn name(&self) -> &str {
        &self.name
    }

    async fn add_all(&self, requests: Vec<Request>, network: &dyn Network) -> Result<(), Error> {
        let mut seen = HashSet::new();
        for request in &requests {
            check_storable(request)?;
            if !seen.insert(compute_request_key(request.method, &request.url)) {
                return Err(Error::InvalidState(format!("duplicate request in batch: {}", request.url)));
            }
        }

        let responses = try_join_all(requests.iter().map(|request| network.fetch(request))).await?;

        for (request, response) in requests.iter().zip(&responses) {
            if !response.ok() {
                return Err(Error::BadStatus { url: request.url.to_string(), status: response.status });
            }
        }

        let count = requests.len();
        self.put_all(requests.into_iter().zip(responses).collect()).await?;
        tracing::debug!(cache = %self.name, count, "stored batch");
        Ok(())
    }

    async fn match_request(&self, request: &Request) -> Result<Option<Response>, Error> {
        self.get(request).await
    }
}

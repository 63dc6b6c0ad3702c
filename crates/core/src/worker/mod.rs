//! The offline-caching worker.
//!
//! Two handlers bridge host lifecycle signals to cache operations:
//!
//! - `install`: open the `pdf-app-v1` store and pre-cache the root document,
//!   deferring the event until the store has it.
//! - `fetch`: answer from any store when the request matches, otherwise from
//!   the network. Fetches never write to a store.
//!
//! Both are plain functions of (event, cache storage, network); the host owns
//! the capabilities and decides when to call them.

mod capabilities;
mod events;
mod host;

pub use capabilities::{CacheStorage, CacheStore, Network};
pub use events::{FetchEvent, InstallEvent};
pub use host::{WorkerHost, WorkerState};

use crate::Error;
use crate::http::{Request, Url, resolve};

/// Name of the single store this worker owns.
pub const CACHE_NAME: &str = "pdf-app-v1";

/// Paths fetched and stored on install, relative to the worker scope.
pub const PRECACHE_PATHS: &[&str] = &["/"];

/// Pre-caches the app shell on install and serves cache-first on fetch.
#[derive(Debug, Clone)]
pub struct OfflineCacheWorker {
    scope: Url,
}

impl OfflineCacheWorker {
    /// Create a worker controlling `scope` (e.g. `http://127.0.0.1:5000/`).
    pub fn new(scope: Url) -> Self {
        Self { scope }
    }

    pub fn scope(&self) -> &Url {
        &self.scope
    }

    /// Requests for [`PRECACHE_PATHS`], resolved against the scope.
    pub fn precache_requests(&self) -> Result<Vec<Request>, Error> {
        PRECACHE_PATHS
            .iter()
            .map(|path| Ok(Request::get(resolve(&self.scope, path)?)))
            .collect()
    }

    /// Whether `storage` already holds every pre-cache request in [`CACHE_NAME`].
    ///
    /// True after a successful install, including one made by an earlier
    /// process against the same storage.
    pub async fn is_precached<S: CacheStorage>(&self, storage: &S) -> Result<bool, Error> {
        if !storage.has(CACHE_NAME).await? {
            return Ok(false);
        }
        let cache = storage.open(CACHE_NAME).await?;
        for request in self.precache_requests()? {
            if cache.match_request(&request).await?.is_none() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Handle an install signal.
    pub fn on_install<'a, S, N>(&'a self, event: &mut InstallEvent<'a>, storage: &'a S, network: &'a N)
    where
        S: CacheStorage,
        N: Network,
    {
        event.wait_until(async move {
            let cache = storage.open(CACHE_NAME).await?;
            let requests = self.precache_requests()?;
            let count = requests.len();
            cache.add_all(requests, network).await?;
            tracing::info!(cache = CACHE_NAME, count, "pre-cached app shell");
            Ok(())
        });
    }

    /// Handle a fetch signal.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidState` if another handler already responded.
    pub fn on_fetch<'a, S, N>(&'a self, event: &mut FetchEvent<'a>, storage: &'a S, network: &'a N) -> Result<(), Error>
    where
        S: CacheStorage,
        N: Network,
    {
        let request = event.request().clone();
        event.respond_with(async move {
            if let Some(cached) = storage.match_request(&request).await? {
                tracing::debug!(url = %request.url, "cache hit");
                return Ok(cached);
            }
            tracing::debug!(url = %request.url, method = %request.method, "cache miss, going to network");
            network.fetch(&request).await
        })
    }
}

//! Capabilities the worker is handed instead of reaching for ambient globals.
//!
//! The host supplies one implementation of each: `CacheDb` for the cache
//! storage and an HTTP client for the network. Tests swap in stubs.

use async_trait::async_trait;

use crate::Error;
use crate::http::{Request, Response};

/// Performs real network requests.
#[async_trait]
pub trait Network: Send + Sync {
    /// Send `request` and return whatever the server answered.
    ///
    /// Any HTTP status is a response; only transport failures are errors.
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// The host's collection of named cache stores.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    type Store: CacheStore;

    /// Open the store called `name`, creating it if absent.
    async fn open(&self, name: &str) -> Result<Self::Store, Error>;

    /// Whether a store called `name` exists. Never creates one.
    async fn has(&self, name: &str) -> Result<bool, Error>;

    /// Look `request` up across every store, oldest store first.
    async fn match_request(&self, request: &Request) -> Result<Option<Response>, Error>;
}

/// One named store.
#[async_trait]
pub trait CacheStore: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch every request through `network` and store the responses.
    ///
    /// Rejects the whole batch if any request is not storable, any fetch
    /// fails, or any response is not a 2xx; nothing is written in that case.
    async fn add_all(&self, requests: Vec<Request>, network: &dyn Network) -> Result<(), Error>;

    async fn match_request(&self, request: &Request) -> Result<Option<Response>, Error>;
}

//! cache_match tool implementation.
//!
//! Looks a GET request up across every store, the way `caches.match` does.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{CacheDb, Error, Network, Request, WorkerHost, http::resolve};

use crate::tools::{ResponseView, json_result};

/// Parameters for the cache_match tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheMatchParams {
    /// Absolute URL, or a path resolved against the worker scope.
    pub url: String,
}

/// Implementation of the cache_match tool.
pub async fn match_impl<N: Network>(
    host: &WorkerHost<CacheDb, N>, params: CacheMatchParams,
) -> Result<CallToolResult, McpError> {
    let url = resolve(host.worker().scope(), &params.url).map_err(Error::from)?;
    let response = host
        .storage()
        .match_any(&Request::get(url.clone()))
        .await?
        .ok_or_else(|| Error::CacheMiss(url.to_string()))?;

    json_result(&ResponseView::from(response))
}

//! cache_keys tool implementation.
//!
//! Lists stores in creation order with the request URLs each one holds.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{CacheDb, Error, Network, WorkerHost};

use crate::tools::json_result;

/// Parameters for the cache_keys tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysParams {
    /// Only list this store. Lists every store when omitted.
    #[serde(default)]
    pub cache_name: Option<String>,
}

/// One store and its keys.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListing {
    pub name: String,
    pub keys: Vec<String>,
}

/// Output from the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysOutput {
    pub caches: Vec<CacheListing>,
}

/// Implementation of the cache_keys tool.
pub async fn keys_impl<N: Network>(
    host: &WorkerHost<CacheDb, N>, params: CacheKeysParams,
) -> Result<CallToolResult, McpError> {
    let db = host.storage();
    let names = match params.cache_name {
        Some(name) => {
            if !db.has_cache(&name).await? {
                return Err(Error::CacheMiss(format!("no cache named {name}")).into());
            }
            vec![name]
        }
        None => db.cache_names().await?,
    };

    let mut caches = Vec::with_capacity(names.len());
    for name in names {
        let keys = match db.find_cache(&name).await? {
            Some(cache) => cache.keys().await?,
            None => Vec::new(),
        };
        caches.push(CacheListing { name, keys });
    }

    json_result(&CacheKeysOutput { caches })
}

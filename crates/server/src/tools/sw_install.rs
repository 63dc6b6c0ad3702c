//! sw_install tool implementation.
//!
//! Dispatches an install signal and reports what the worker's store holds.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{CACHE_NAME, CacheDb, Network, WorkerHost, WorkerState};

use super::json_result;

/// Output from the sw_install tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwInstallOutput {
    /// The store the worker pre-caches into.
    pub cache_name: String,
    /// Request URLs held by that store after install.
    pub keys: Vec<String>,
    /// Worker lifecycle state after the install settled.
    pub state: WorkerState,
}

/// Implementation of the sw_install tool.
pub async fn install_impl<N: Network>(host: &WorkerHost<CacheDb, N>) -> Result<CallToolResult, McpError> {
    host.dispatch_install().await?;

    let keys = match host.storage().find_cache(CACHE_NAME).await? {
        Some(cache) => cache.keys().await?,
        None => Vec::new(),
    };

    let output = SwInstallOutput { cache_name: CACHE_NAME.to_string(), keys, state: host.state() };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{host_for, parse_output};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_install_reports_cached_root() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<h1>PDF Upload</h1>"))
            .expect(1)
            .mount(&server)
            .await;
        let host = host_for(&server.uri()).await;

        let result = install_impl(&host).await.unwrap();
        let output: SwInstallOutput = parse_output(&result);

        assert_eq!(output.cache_name, "pdf-app-v1");
        assert_eq!(output.keys, vec![format!("{}/", server.uri())]);
        assert_eq!(output.state, WorkerState::Installed);
    }

    #[tokio::test]
    async fn test_install_failure_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let host = host_for(&server.uri()).await;

        let result = install_impl(&host).await;

        let err = result.unwrap_err();
        assert_eq!(err.code.0, -32009);
        assert_eq!(host.state(), WorkerState::Redundant);
    }
}

//! MCP server handler implementation.
//!
//! Routes tool calls to the hosted worker and its cache storage.

use std::sync::Arc;

use swcache_client::FetchClient;
use swcache_core::{CacheDb, WorkerHost};

use crate::tools::cache::{keys_impl, match_impl};
use crate::tools::sw_fetch::fetch_impl;
use crate::tools::sw_install::install_impl;
use crate::tools::{CacheKeysParams, CacheMatchParams, SwFetchParams};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The worker host as served over MCP.
pub type Host = WorkerHost<CacheDb, FetchClient>;

/// The main MCP server handler for swcache.
#[derive(Clone)]
pub struct SwCacheServer {
    tool_router: ToolRouter<Self>,
    host: Arc<Host>,
}

/// Tool router implementation using the #[tool_router] macro.
#[tool_router]
impl SwCacheServer {
    /// Create a new server handler around a shared worker host.
    pub fn new(host: Arc<Host>) -> Self {
        Self { tool_router: Self::tool_router(), host }
    }

    /// Dispatch an install signal to the worker.
    ///
    /// Pre-caches the worker's assets into its store. Safe to call again after a failure.
    #[tool(description = "Install the offline-caching worker: pre-cache its assets and report the store contents.")]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.host).await
    }

    /// Dispatch a fetch signal to the worker.
    #[tool(description = "Fetch a URL through the worker. Cached responses are served first, the network otherwise.")]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.host, params.0).await
    }

    /// Look a URL up across every cache store.
    ///
    /// No network requests are made.
    #[tool(description = "Look up a cached GET response by URL across all cache stores. Never touches the network.")]
    async fn cache_match(&self, params: Parameters<CacheMatchParams>) -> Result<CallToolResult, McpError> {
        match_impl(&self.host, params.0).await
    }

    #[tool(description = "List cache stores and the request URLs each one holds.")]
    async fn cache_keys(&self, params: Parameters<CacheKeysParams>) -> Result<CallToolResult, McpError> {
        keys_impl(&self.host, params.0).await
    }
}

impl ServerHandler for SwCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "swcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::host_for;

    #[tokio::test]
    async fn test_lists_all_tools() {
        let server = SwCacheServer::new(Arc::new(host_for("http://127.0.0.1:5000/").await));
        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();

        assert_eq!(names, vec!["cache_keys", "cache_match", "sw_fetch", "sw_install"]);
    }

    #[tokio::test]
    async fn test_server_info() {
        let server = SwCacheServer::new(Arc::new(host_for("http://127.0.0.1:5000/").await));
        assert_eq!(server.get_info().server_info.name, "swcache");
    }
}

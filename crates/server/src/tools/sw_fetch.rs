//! sw_fetch tool implementation.
//!
//! Dispatches a fetch signal for one request, exactly as a page inside the
//! worker's scope would issue it.

use std::collections::BTreeMap;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{CacheDb, Method, Network, Request, WorkerHost, http::resolve};

use super::{ResponseView, json_result};
use crate::error::ToolError;

/// Input parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL, or a path resolved against the worker scope (e.g. "/").
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default)]
    pub method: Option<String>,

    /// Request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Request body, for methods that carry one.
    #[serde(default)]
    pub body: Option<String>,
}

/// Turn tool parameters into a request inside the worker's scope.
pub(crate) fn build_request<N: Network>(
    host: &WorkerHost<CacheDb, N>, params: SwFetchParams,
) -> Result<Request, McpError> {
    let method = match params.method.as_deref() {
        Some(m) => m.parse::<Method>()?,
        None => Method::Get,
    };

    if params.body.is_some() && matches!(method, Method::Get | Method::Head) {
        return Err(ToolError::InvalidInput(format!("{method} requests cannot have a body")).into());
    }

    let url = resolve(host.worker().scope(), &params.url).map_err(swcache_core::Error::from)?;
    let mut request = Request::new(method, url);
    for (name, value) in params.headers {
        request = request.with_header(name, value);
    }
    if let Some(body) = params.body {
        request = request.with_body(body);
    }
    Ok(request)
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl<N: Network>(
    host: &WorkerHost<CacheDb, N>, params: SwFetchParams,
) -> Result<CallToolResult, McpError> {
    let request = build_request(host, params)?;
    let response = host.dispatch_fetch(request).await?;
    json_result(&ResponseView::from(response))
}

//! MCP tool implementations.
//!
//! `sw_*` tools dispatch lifecycle signals to the hosted worker; `cache_*`
//! tools read the cache storage without touching the network.

pub mod cache;
pub mod sw_fetch;
pub mod sw_install;

use std::collections::BTreeMap;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{Response, ResponseSource};

use crate::error::ToolError;

pub use cache::{CacheKeysParams, CacheMatchParams};
pub use sw_fetch::SwFetchParams;

/// A response as reported back to the tool caller.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResponseView {
    /// Final URL of the response.
    pub url: String,
    /// Whether it came from a cache store or the network.
    pub source: ResponseSource,
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    pub content_type: Option<String>,
    /// Body length in bytes.
    pub body_len: usize,
    /// Body as text, when it is valid UTF-8.
    pub body_text: Option<String>,
}

impl From<Response> for ResponseView {
    fn from(response: Response) -> Self {
        let content_type = response.content_type().map(str::to_string);
        Self {
            body_len: response.body.len(),
            body_text: String::from_utf8(response.body.to_vec()).ok(),
            url: response.url,
            source: response.source,
            status: response.status,
            status_text: response.status_text,
            headers: response.headers,
            content_type,
        }
    }
}

/// Pretty-print `output` as the tool's single text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(ToolError::from)?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_view_text_body() {
        let response = Response::new("http://127.0.0.1:5000/", 200)
            .with_header("content-type", "text/html")
            .with_body("<h1>PDF Upload</h1>");
        let view = ResponseView::from(response);

        assert_eq!(view.body_len, 19);
        assert_eq!(view.body_text.as_deref(), Some("<h1>PDF Upload</h1>"));
        assert_eq!(view.content_type.as_deref(), Some("text/html"));
    }

    #[test]
    fn test_response_view_binary_body() {
        let response = Response::new("http://127.0.0.1:5000/other.png", 200).with_body(vec![0x89, 0xff, 0x00]);
        let view = ResponseView::from(response);

        assert_eq!(view.body_len, 3);
        assert!(view.body_text.is_none());
    }
}

//! Structured errors raised by the tool layer itself.
//!
//! Worker and cache failures arrive as `swcache_core::Error` and convert on
//! their own; these cover what only the tool surface can get wrong.

use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Structured errors for the swcache tool surface.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Tool parameters that cannot describe a valid request.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Tool output could not be encoded.
    #[error("SERIALIZE_FAILED: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let (code, message) = match &err {
            ToolError::InvalidInput(msg) => (-32602, msg.clone()),
            ToolError::Serialize(e) => (-32603, e.to_string()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_code() {
        let err: McpError = ToolError::InvalidInput("body not allowed".into()).into();
        assert_eq!(err.code.0, -32602);
        assert_eq!(err.message, "body not allowed");
    }
}

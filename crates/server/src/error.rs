//! Structured errors for tool parameter handling.
//!
//! Worker and store failures arrive as `sw_cache_core::Error` and convert on
//! their own; these cover what goes wrong before a call reaches the worker.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use sw_cache_worker::fetch::UrlError;

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Invalid input parameters (e.g., malformed control message).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// URL could not be resolved against the app origin.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(#[from] UrlError),

    /// Tool output could not be serialized.
    #[error("OUTPUT_FAILED: {0}")]
    Output(String),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let code = match &err {
            ToolError::InvalidInput(_) => -32602,
            ToolError::InvalidUrl(_) => -32602,
            ToolError::Output(_) => -32603,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        let err: McpError = ToolError::InvalidInput("bad".into()).into();
        assert_eq!(err.code, ErrorCode(-32602));
        assert_eq!(err.message, "INVALID_INPUT: bad");

        let err: McpError = ToolError::InvalidUrl(UrlError::Empty).into();
        assert_eq!(err.code, ErrorCode(-32602));
        assert!(err.message.starts_with("INVALID_URL"));

        let err: McpError = ToolError::Output("nan".into()).into();
        assert_eq!(err.code, ErrorCode(-32603));
    }
}

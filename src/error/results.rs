//! Shortcuts for handlers that want to fail fast with a ready-made error
//! result instead of returning `Err` through the middleware.

use rmcp::model::{CallToolResult, Content};
use std::error::Error as StdError;

use super::tool_error::ToolError;

impl From<ToolError> for CallToolResult {
    fn from(err: ToolError) -> Self {
        CallToolResult::error(vec![Content::text(err.to_json())])
    }
}

/// Converts any error into an error result, preserving a `ToolError` found
/// in its chain.
pub fn wrap_error(err: &(dyn StdError + 'static)) -> CallToolResult {
    ToolError::normalize(err).into()
}

/// Error result for invalid input.
pub fn validation_error(message: impl Into<String>) -> CallToolResult {
    ToolError::validation(message).into()
}

/// Error result for a missing resource.
pub fn not_found_error(message: impl Into<String>) -> CallToolResult {
    ToolError::not_found(message).into()
}

/// Error result for a concurrent modification conflict.
pub fn conflict_error(message: impl Into<String>) -> CallToolResult {
    ToolError::conflict(message).into()
}

/// Error result for denied access.
pub fn permission_error(message: impl Into<String>) -> CallToolResult {
    ToolError::permission(message).into()
}

/// Error result for a temporary failure. Marked recoverable.
pub fn transient_error(message: impl Into<String>) -> CallToolResult {
    ToolError::transient(message).into()
}

pub fn internal_error(message: impl Into<String>) -> CallToolResult {
    ToolError::internal(message).into()
}

/// Returns the text of the first text content block, if any.
pub fn result_text(result: &CallToolResult) -> Option<&str> {
    result
        .content
        .iter()
        .find_map(|content| content.as_text())
        .map(|text| text.text.as_str())
}

/// Parses the structured error carried by an error result.
///
/// Returns `None` for results not flagged as errors or whose payload is not
/// a structured error.
pub fn result_error(result: &CallToolResult) -> Option<ToolError> {
    if result.is_error != Some(true) {
        return None;
    }
    result_text(result).and_then(|text| ToolError::from_json(text).ok())
}

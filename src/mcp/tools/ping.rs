// ping MCP tool implementation
// Liveness check that reports the server version

use async_trait::async_trait;
use rmcp::model::{CallToolRequestParam, CallToolResult, Content, Tool};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{input_schema, parse_arguments};
use crate::mcp::middleware::{HandlerResult, ToolHandler};

/// Request parameters for the ping tool.
/// This tool takes no parameters.
#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct PingRequest {}

/// Response from the ping tool.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PingResponse {
    /// Always "ok"
    pub status: String,
    /// Crate version of the server
    pub version: String,
}

impl Default for PingResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PingTool;

impl PingTool {
    pub const NAME: &'static str = "ping";

    pub fn descriptor() -> Tool {
        Tool::new(
            Self::NAME,
            "Check that the server is responsive",
            input_schema::<PingRequest>(),
        )
    }
}

#[async_trait]
impl ToolHandler for PingTool {
    async fn call(&self, request: CallToolRequestParam) -> HandlerResult {
        let _: PingRequest = parse_arguments(&request)?;
        let body = serde_json::to_string(&PingResponse::default())?;
        Ok(CallToolResult::success(vec![Content::text(body)]))
    }
}

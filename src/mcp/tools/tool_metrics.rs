// tool_metrics MCP tool implementation
// Returns the per-tool call metrics collected by the instrumentation stage

use async_trait::async_trait;
use rmcp::model::{CallToolRequestParam, CallToolResult, Content, Tool};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{input_schema, parse_arguments};
use crate::error::ToolError;
use crate::mcp::middleware::{HandlerResult, ToolHandler};
use crate::metrics::{MetricsRegistry, MetricsSnapshot, ToolStats};

/// Request parameters for the tool_metrics tool.
#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct ToolMetricsRequest {
    /// Restrict the report to a single tool.
    #[schemars(description = "Only report metrics for this tool name")]
    #[serde(default)]
    pub tool: Option<String>,
}

/// Response from the tool_metrics tool.
#[derive(Debug, Serialize)]
pub struct ToolMetricsResponse {
    /// Per-tool counters keyed by tool name
    pub tools: MetricsSnapshot,
    /// Sum over the reported tools
    pub totals: ToolStats,
}

impl ToolMetricsResponse {
    pub fn from_snapshot(tools: MetricsSnapshot) -> Self {
        let totals = tools.totals();
        Self { tools, totals }
    }
}

/// Exposes a [`MetricsRegistry`] as an MCP tool.
#[derive(Debug, Clone)]
pub struct ToolMetricsTool {
    registry: Arc<MetricsRegistry>,
}

impl ToolMetricsTool {
    pub const NAME: &'static str = "tool_metrics";

    pub fn new(registry: Arc<MetricsRegistry>) -> Self {
        Self { registry }
    }

    pub fn descriptor() -> Tool {
        Tool::new(
            Self::NAME,
            "Report call count, error count and cumulative duration per tool",
            input_schema::<ToolMetricsRequest>(),
        )
    }

    fn report(&self, filter: Option<&str>) -> Result<ToolMetricsResponse, ToolError> {
        let snapshot = self.registry.snapshot();
        let Some(name) = filter else {
            return Ok(ToolMetricsResponse::from_snapshot(snapshot));
        };

        match snapshot.get(name) {
            Some(stats) => Ok(ToolMetricsResponse::from_snapshot(
                std::iter::once((name.to_string(), *stats)).collect(),
            )),
            None => Err(
                ToolError::not_found(format!("no metrics recorded for tool {:?}", name))
                    .with_field("tool", name),
            ),
        }
    }
}

#[async_trait]
impl ToolHandler for ToolMetricsTool {
    async fn call(&self, request: CallToolRequestParam) -> HandlerResult {
        let args: ToolMetricsRequest = parse_arguments(&request)?;
        let response = self.report(args.tool.as_deref())?;
        let body = serde_json::to_string(&response)?;
        Ok(CallToolResult::success(vec![Content::text(body)]))
    }
}

// Built-in MCP tools for instrumented servers
// Also holds the argument and schema helpers shared by tool handlers

pub mod ping;
pub mod tool_metrics;

pub use ping::{PingRequest, PingResponse, PingTool};
pub use tool_metrics::{ToolMetricsRequest, ToolMetricsResponse, ToolMetricsTool};

use rmcp::model::{CallToolRequestParam, JsonObject};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

use crate::error::ToolError;

/// Deserialize a request's arguments into `T`.
///
/// Missing arguments are treated as an empty object. Malformed arguments
/// become a `VALIDATION` error naming the tool.
pub fn parse_arguments<T: DeserializeOwned>(request: &CallToolRequestParam) -> Result<T, ToolError> {
    let arguments = Value::Object(request.arguments.clone().unwrap_or_default());
    serde_json::from_value(arguments).map_err(|err| {
        ToolError::validation(format!("invalid arguments for {}: {}", request.name, err))
            .with_field("tool", request.name.to_string())
    })
}

/// JSON schema for `T` as a tool input schema object.
pub fn input_schema<T: JsonSchema>() -> Arc<JsonObject> {
    match serde_json::to_value(schemars::schema_for!(T)) {
        Ok(Value::Object(schema)) => Arc::new(schema),
        _ => Arc::new(JsonObject::new()),
    }
}

// MCP server with instrumented tool dispatch
// Every registered tool runs behind the Instrument stage

use rmcp::model::{
    CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam,
    ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData, RoleServer, ServerHandler};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ServerConfig;
use crate::error::ToolError;
use crate::metrics::{MetricsRegistry, MetricsSnapshot};

use super::instrument::Instrument;
use super::middleware::{Interceptor, Pipeline, ToolHandler};
use super::tools::{PingTool, ToolMetricsTool};

/// A tool descriptor paired with its handler.
#[derive(Clone)]
pub struct RegisteredTool {
    pub tool: Tool,
    pub handler: Arc<dyn ToolHandler>,
}

/// MCP server that routes `tools/call` through an instrumented pipeline.
///
/// The [`Instrument`] stage is always outermost, so every handler failure or
/// panic reaches the client as a structured error result and is counted in
/// the shared [`MetricsRegistry`].
///
/// # Thread Safety
///
/// Cloning is cheap; clones share the tool table and the registry.
#[derive(Clone)]
pub struct InstrumentedServer {
    name: String,
    instructions: Option<String>,
    tools: Arc<BTreeMap<String, RegisteredTool>>,
    pipeline: Pipeline,
    registry: Arc<MetricsRegistry>,
}

impl InstrumentedServer {
    /// Create a server with no tools that records into `registry`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use interbase::mcp::InstrumentedServer;
    /// use interbase::metrics::MetricsRegistry;
    ///
    /// let server = InstrumentedServer::new("my-server", Arc::new(MetricsRegistry::new()));
    /// assert!(server.tool_names().is_empty());
    /// ```
    pub fn new(name: impl Into<String>, registry: Arc<MetricsRegistry>) -> Self {
        Self::with_instrument(name, Instrument::new(registry))
    }

    fn with_instrument(name: impl Into<String>, instrument: Instrument) -> Self {
        let registry = Arc::clone(instrument.registry());
        Self {
            name: name.into(),
            instructions: None,
            tools: Arc::new(BTreeMap::new()),
            pipeline: Pipeline::new().with_stage(instrument),
            registry,
        }
    }

    /// Create a server from configuration, registering the built-in tools
    /// it enables.
    pub fn from_config(config: &ServerConfig, registry: Arc<MetricsRegistry>) -> Self {
        let mut instrument = Instrument::new(registry);
        if let Some(ms) = config.instrumentation.slow_call_ms {
            instrument = instrument.with_slow_call_threshold(Duration::from_millis(ms));
        }

        let mut server = Self::with_instrument(config.server.name.clone(), instrument);
        server.instructions = config.server.instructions.clone();
        server = server.with_tool(PingTool::descriptor(), PingTool);
        if config.instrumentation.metrics_tool {
            let metrics_tool = ToolMetricsTool::new(Arc::clone(&server.registry));
            server = server.with_tool(ToolMetricsTool::descriptor(), metrics_tool);
        }
        server
    }

    /// Set the instructions returned during initialization.
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Register a tool. A later registration with the same name replaces
    /// the earlier one.
    pub fn with_tool(mut self, tool: Tool, handler: impl ToolHandler + 'static) -> Self {
        self.register(tool, handler);
        self
    }

    /// Register a tool on an existing server.
    pub fn register(&mut self, tool: Tool, handler: impl ToolHandler + 'static) {
        let name = tool.name.to_string();
        if Arc::make_mut(&mut self.tools)
            .insert(
                name.clone(),
                RegisteredTool {
                    tool,
                    handler: Arc::new(handler),
                },
            )
            .is_some()
        {
            tracing::warn!(tool = %name, "replacing previously registered tool");
        }
    }

    /// Add an interceptor inside the instrumentation stage.
    pub fn with_stage(mut self, stage: impl Interceptor + 'static) -> Self {
        self.pipeline.push(Arc::new(stage));
        self
    }

    /// The registry this server records into.
    pub fn registry(&self) -> &Arc<MetricsRegistry> {
        &self.registry
    }

    /// Current per-tool metrics.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.registry.snapshot()
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Descriptors of every registered tool, in name order.
    pub fn tools(&self) -> Vec<Tool> {
        self.tools.values().map(|t| t.tool.clone()).collect()
    }

    /// Run a tool call through the pipeline.
    ///
    /// Unknown tool names are a protocol error (`invalid_params`) and are
    /// not counted. Everything the handler does is returned as `Ok`.
    pub async fn dispatch(&self, request: CallToolRequestParam) -> Result<CallToolResult, ErrorData> {
        let Some(registered) = self.tools.get(&*request.name) else {
            tracing::debug!(tool = %request.name, "call to unknown tool");
            return Err(ErrorData::invalid_params(
                format!("tool not found: {}", request.name),
                None,
            ));
        };

        match self
            .pipeline
            .dispatch(registered.handler.as_ref(), request)
            .await
        {
            Ok(result) => Ok(result),
            // Instrument is outermost and always returns Ok.
            Err(err) => Ok(ToolError::from_boxed(err).into()),
        }
    }
}

impl std::fmt::Debug for InstrumentedServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstrumentedServer")
            .field("name", &self.name)
            .field("tools", &self.tool_names())
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

impl ServerHandler for InstrumentedServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: self.name.clone(),
                title: None,
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: self.instructions.clone(),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(self.tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        self.dispatch(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::error::{result_error, BoxError, ErrorKind};
    use crate::mcp::middleware::tool_request;
    use rmcp::model::Content;
    use serde_json::Map;

    fn bare_tool(name: &'static str) -> Tool {
        Tool::new(name, "test tool", Arc::new(Map::new()))
    }

    #[test]
    fn test_new_server_is_empty() {
        let server = InstrumentedServer::new("test", Arc::new(MetricsRegistry::new()));
        assert!(server.tool_names().is_empty());
        assert!(server.metrics().is_empty());
    }

    #[test]
    fn test_from_config_registers_builtin_tools() {
        let server =
            InstrumentedServer::from_config(&ServerConfig::default(), Arc::new(MetricsRegistry::new()));
        assert_eq!(server.tool_names(), vec!["ping", "tool_metrics"]);
    }

    #[test]
    fn test_from_config_without_metrics_tool() {
        let mut config = ServerConfig::default();
        config.instrumentation.metrics_tool = false;
        let server = InstrumentedServer::from_config(&config, Arc::new(MetricsRegistry::new()));
        assert_eq!(server.tool_names(), vec!["ping"]);
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool_is_protocol_error() {
        let server = InstrumentedServer::new("test", Arc::new(MetricsRegistry::new()));
        let err = server.dispatch(tool_request("missing")).await.unwrap_err();
        assert!(err.message.contains("missing"));
        assert!(server.metrics().get("missing").is_none());
    }

    #[tokio::test]
    async fn test_dispatch_routes_through_instrumentation() {
        let registry = Arc::new(MetricsRegistry::new());
        let server = InstrumentedServer::new("test", Arc::clone(&registry))
            .with_tool(bare_tool("ok"), |_request: CallToolRequestParam| async {
                Ok::<_, BoxError>(CallToolResult::success(vec![Content::text("ok")]))
            })
            .with_tool(bare_tool("broken"), |_request: CallToolRequestParam| async {
                Err::<CallToolResult, BoxError>(ToolError::permission("read-only").into())
            });

        let ok = server.dispatch(tool_request("ok")).await.unwrap();
        assert_ne!(ok.is_error, Some(true));

        let broken = server.dispatch(tool_request("broken")).await.unwrap();
        assert_eq!(result_error(&broken).unwrap().kind, ErrorKind::Permission);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.get("ok").map(|s| (s.calls, s.errors)), Some((1, 0)));
        assert_eq!(snapshot.get("broken").map(|s| (s.calls, s.errors)), Some((1, 1)));
    }

    #[test]
    fn test_with_tool_replaces_same_name() {
        let server = InstrumentedServer::new("test", Arc::new(MetricsRegistry::new()))
            .with_tool(bare_tool("dup"), PingTool)
            .with_tool(bare_tool("dup"), PingTool);
        assert_eq!(server.tool_names(), vec!["dup"]);
    }

    #[test]
    fn test_clone_shares_registry() {
        let server = InstrumentedServer::new("test", Arc::new(MetricsRegistry::new()));
        let cloned = server.clone();
        server.registry().record_call("shared");
        assert_eq!(cloned.metrics().get("shared").map(|s| s.calls), Some(1));
    }

    #[test]
    fn test_server_handler_get_info() {
        let server = InstrumentedServer::new("demarch-test", Arc::new(MetricsRegistry::new()))
            .with_instructions("test instructions");
        let info = server.get_info();

        assert_eq!(info.server_info.name, "demarch-test");
        assert_eq!(info.server_info.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(info.instructions.as_deref(), Some("test instructions"));
        assert!(info.capabilities.tools.is_some());
    }
}

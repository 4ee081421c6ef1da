// MCP (Model Context Protocol) integration
// Middleware pipeline, instrumentation stage, server and built-in tools

pub mod instrument;
pub mod middleware;
pub mod server;
pub mod tools;

pub use instrument::Instrument;
pub use middleware::{tool_request, HandlerResult, Interceptor, Next, Pipeline, ToolHandler};
pub use server::{InstrumentedServer, RegisteredTool};

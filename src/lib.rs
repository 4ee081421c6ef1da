//! Interbase - structured tool errors and call instrumentation for MCP servers
//!
//! - [`error`]: the six-kind error taxonomy, its JSON envelope, and helpers
//!   that turn failures into tool error results.
//! - [`metrics`]: a concurrent per-tool registry of call, error and
//!   duration counters.
//! - [`mcp`]: the interceptor pipeline, the [`mcp::Instrument`] stage, and an
//!   rmcp server that runs every tool behind it.

pub mod config;
pub mod error;
pub mod logging;
pub mod mcp;
pub mod metrics;

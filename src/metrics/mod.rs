//! Per-tool call metrics.
//!
//! [`MetricsRegistry`] aggregates call count, error count, and cumulative
//! duration per tool name. It is shared by the instrumentation middleware and
//! read on demand through [`MetricsSnapshot`].

pub mod registry;
pub mod snapshot;

pub use registry::{MetricsRegistry, ToolCounters};
pub use snapshot::{MetricsSnapshot, ToolStats};

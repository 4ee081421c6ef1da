//! Instrumentation stage: timing, error counting, error normalization and
//! panic containment for every tool call.

use async_trait::async_trait;
use futures::FutureExt;
use rmcp::model::CallToolRequestParam;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{ErrorKind, ToolError};
use crate::metrics::{MetricsRegistry, ToolCounters};

use super::middleware::{HandlerResult, Interceptor, Next};

/// Wraps the rest of the chain with per-tool metrics and failure
/// classification.
///
/// The stage always returns `Ok`: reported failures and panics both come
/// back as an error result carrying a serialized [`ToolError`].
///
/// ```no_run
/// use std::sync::Arc;
/// use interbase::mcp::{Instrument, Pipeline};
/// use interbase::metrics::MetricsRegistry;
///
/// let registry = Arc::new(MetricsRegistry::new());
/// let pipeline = Pipeline::new().with_stage(Instrument::new(Arc::clone(&registry)));
/// ```
#[derive(Debug, Clone)]
pub struct Instrument {
    registry: Arc<MetricsRegistry>,
    slow_call: Option<Duration>,
}

impl Instrument {
    pub fn new(registry: Arc<MetricsRegistry>) -> Self {
        Self {
            registry,
            slow_call: None,
        }
    }

    /// Logs a warning for calls that take longer than `threshold`.
    pub fn with_slow_call_threshold(mut self, threshold: Duration) -> Self {
        self.slow_call = Some(threshold);
        self
    }

    pub fn registry(&self) -> &Arc<MetricsRegistry> {
        &self.registry
    }
}

#[async_trait]
impl Interceptor for Instrument {
    async fn intercept(&self, request: CallToolRequestParam, next: Next<'_>) -> HandlerResult {
        let tool = request.name.to_string();
        let counters = self.registry.counters_for(&tool);
        counters.record_call();
        let mut guard = CallGuard::start(tool, counters, self.slow_call);

        let outcome = AssertUnwindSafe(next.run(request)).catch_unwind().await;

        let result = match outcome {
            Ok(Ok(result)) => {
                if result.is_error == Some(true) {
                    guard.finish(Outcome::ErrorResult);
                } else {
                    guard.finish(Outcome::Success);
                }
                result
            }
            Ok(Err(err)) => {
                let tool_error = ToolError::from_boxed(err);
                tracing::warn!(
                    tool = %guard.tool,
                    kind = %tool_error.kind,
                    recoverable = tool_error.recoverable,
                    "tool handler failed: {}",
                    tool_error.message
                );
                guard.finish(Outcome::Failure(tool_error.kind));
                tool_error.into()
            }
            Err(payload) => {
                let description = panic_message(&*payload);
                tracing::error!(tool = %guard.tool, "tool handler panicked: {}", description);
                let tool_error =
                    ToolError::internal(format!("panic in {}: {}", guard.tool, description));
                guard.finish(Outcome::Panic);
                tool_error.into()
            }
        };

        Ok(result)
    }
}

/// How a single invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    /// The handler returned a result flagged as an error.
    ErrorResult,
    /// The handler returned `Err`, normalized to this kind.
    Failure(ErrorKind),
    Panic,
}

impl Outcome {
    fn is_error(&self) -> bool {
        !matches!(self, Outcome::Success)
    }
}

/// Records duration and errors when dropped, so bookkeeping happens exactly
/// once on every exit path, including a caller dropping the call future
/// mid-flight.
struct CallGuard {
    tool: String,
    counters: Arc<ToolCounters>,
    started: Instant,
    slow_call: Option<Duration>,
    outcome: Option<Outcome>,
}

impl CallGuard {
    fn start(tool: String, counters: Arc<ToolCounters>, slow_call: Option<Duration>) -> Self {
        Self {
            tool,
            counters,
            started: Instant::now(),
            slow_call,
            outcome: None,
        }
    }

    fn finish(&mut self, outcome: Outcome) {
        self.outcome = Some(outcome);
    }
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed();
        self.counters.record_duration(elapsed);

        match self.outcome {
            Some(outcome) => {
                if outcome.is_error() {
                    self.counters.record_error();
                }
                tracing::debug!(
                    tool = %self.tool,
                    elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                    outcome = ?outcome,
                    "tool call finished"
                );
            }
            None => {
                tracing::debug!(
                    tool = %self.tool,
                    elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                    "tool call dropped before completion"
                );
            }
        }

        if let Some(threshold) = self.slow_call {
            if elapsed > threshold {
                tracing::warn!(
                    tool = %self.tool,
                    elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                    threshold_ms = threshold.as_secs_f64() * 1000.0,
                    "slow tool call"
                );
            }
        }
    }
}

/// Renders a panic payload the way `panic!` messages are usually written.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

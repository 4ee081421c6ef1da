//! Handler and interceptor traits, and the pipeline that chains them.
//!
//! A [`Pipeline`] is an ordered list of [`Interceptor`] stages. Each stage
//! receives the request and a [`Next`] handle for the remaining stages plus
//! the tool handler, so whatever a stage does around `next.run(..)` (timing,
//! panic containment) is scoped to that stage alone.

use async_trait::async_trait;
use rmcp::model::{CallToolRequestParam, CallToolResult};
use std::future::Future;
use std::sync::Arc;

use crate::error::BoxError;

/// What a tool handler produces: a result (possibly flagged as an error
/// result) or a reported failure.
pub type HandlerResult = Result<CallToolResult, BoxError>;

/// A named unit of invocable server logic.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, request: CallToolRequestParam) -> HandlerResult;
}

#[async_trait]
impl<F, Fut> ToolHandler for F
where
    F: Fn(CallToolRequestParam) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn call(&self, request: CallToolRequestParam) -> HandlerResult {
        (self)(request).await
    }
}

/// One stage of the middleware chain.
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Handles `request`, usually by delegating to `next.run(request)`.
    async fn intercept(&self, request: CallToolRequestParam, next: Next<'_>) -> HandlerResult;
}

/// The remainder of the chain after the current stage.
pub struct Next<'a> {
    stages: &'a [Arc<dyn Interceptor>],
    handler: &'a dyn ToolHandler,
}

impl<'a> Next<'a> {
    /// Runs the remaining stages and finally the handler.
    pub async fn run(self, request: CallToolRequestParam) -> HandlerResult {
        match self.stages.split_first() {
            Some((stage, rest)) => {
                let next = Next {
                    stages: rest,
                    handler: self.handler,
                };
                stage.intercept(request, next).await
            }
            None => self.handler.call(request).await,
        }
    }
}

/// Ordered interceptor stages; the first stage is outermost.
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Interceptor>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage inside all previously added ones.
    pub fn with_stage(mut self, stage: impl Interceptor + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    pub fn push(&mut self, stage: Arc<dyn Interceptor>) {
        self.stages.push(stage);
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs `request` through every stage and then `handler`.
    pub async fn dispatch(
        &self,
        handler: &dyn ToolHandler,
        request: CallToolRequestParam,
    ) -> HandlerResult {
        Next {
            stages: &self.stages,
            handler,
        }
        .run(request)
        .await
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages.len())
            .finish()
    }
}

/// Builds a request for `name` with no arguments.
pub fn tool_request(name: impl Into<String>) -> CallToolRequestParam {
    let name: String = name.into();
    CallToolRequestParam {
        name: name.into(),
        arguments: None,
    }
}

use async_trait::async_trait;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::{AgentError, AgentResult};
use crate::models::content::Content;
use crate::models::tool::{Tool, ToolCall};

/// Whether a tool may run alongside other calls to itself within one round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Concurrency {
    /// Calls to this tool are run one at a time, in request order
    #[default]
    Exclusive,
    /// The tool documents that concurrent calls to itself are safe
    Shared,
}

/// Core trait for something that executes a tool call on behalf of the model
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Execute the tool with the model supplied arguments
    async fn call(&self, arguments: Value) -> AgentResult<Content>;

    /// Handlers are assumed unsafe to run concurrently with themselves unless they say otherwise
    fn concurrency(&self) -> Concurrency {
        Concurrency::Exclusive
    }
}

/// Adapts a plain synchronous function into a ToolHandler
///
/// The function runs on tokio's blocking pool, so a slow call can still be
/// cut off by the tool timeout and does not stall other calls of the round.
pub struct FnHandler<F> {
    func: Arc<F>,
    concurrency: Concurrency,
}

impl<F> FnHandler<F>
where
    F: Fn(Value) -> AgentResult<Content> + Send + Sync + 'static,
{
    pub fn new(func: F) -> Self {
        Self {
            func: Arc::new(func),
            concurrency: Concurrency::Exclusive,
        }
    }

    pub fn shared(func: F) -> Self {
        Self {
            func: Arc::new(func),
            concurrency: Concurrency::Shared,
        }
    }
}

#[async_trait]
impl<F> ToolHandler for FnHandler<F>
where
    F: Fn(Value) -> AgentResult<Content> + Send + Sync + 'static,
{
    async fn call(&self, arguments: Value) -> AgentResult<Content> {
        let func = Arc::clone(&self.func);
        tokio::task::spawn_blocking(move || func(arguments))
            .await
            .map_err(|e| {
                if e.is_panic() {
                    AgentError::ExecutionError(format!(
                        "Tool panicked: {}",
                        panic_message(e.into_panic().as_ref())
                    ))
                } else {
                    AgentError::Internal(format!("Tool task was cancelled: {}", e))
                }
            })?
    }

    fn concurrency(&self) -> Concurrency {
        self.concurrency
    }
}

/// Best effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// The tools offered to the model, each paired with the handler that runs it
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool spec together with its handler. Names must be unique.
    pub fn register<H>(&mut self, tool: Tool, handler: H) -> AgentResult<()>
    where
        H: ToolHandler + 'static,
    {
        if self.handlers.contains_key(&tool.name) {
            return Err(AgentError::Internal(format!(
                "Duplicate tool name: {}",
                tool.name
            )));
        }
        self.handlers.insert(tool.name.clone(), Arc::new(handler));
        self.tools.push(tool);
        Ok(())
    }

    /// Builder flavored version of register
    pub fn with_tool<H>(mut self, tool: Tool, handler: H) -> AgentResult<Self>
    where
        H: ToolHandler + 'static,
    {
        self.register(tool, handler)?;
        Ok(self)
    }

    /// The tool specs in registration order, as offered to the model
    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Check that every spec has a handler and vice versa
    pub fn validate(&self) -> AgentResult<()> {
        if self.tools.len() != self.handlers.len() {
            return Err(AgentError::Internal(format!(
                "Registry has {} tool specs but {} handlers",
                self.tools.len(),
                self.handlers.len()
            )));
        }
        for tool in &self.tools {
            if !self.handlers.contains_key(&tool.name) {
                return Err(AgentError::ToolNotFound(tool.name.clone()));
            }
        }
        Ok(())
    }

    /// Concurrency of the named tool, exclusive for unknown names
    pub fn concurrency(&self, name: &str) -> Concurrency {
        self.handlers
            .get(name)
            .map(|h| h.concurrency())
            .unwrap_or_default()
    }

    /// Dispatch a single tool call to its handler
    pub async fn dispatch(&self, call: &ToolCall) -> AgentResult<Content> {
        let handler = self
            .handlers
            .get(&call.name)
            .ok_or_else(|| AgentError::ToolNotFound(call.name.clone()))?;

        if !call.arguments.is_object() {
            return Err(AgentError::InvalidParameters(format!(
                "Arguments for {} must be a JSON object, got: {}",
                call.name,
                call.arguments_string()
            )));
        }

        handler.call(call.arguments.clone()).await
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools)
            .finish()
    }
}

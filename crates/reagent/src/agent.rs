use futures::future::join_all;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::errors::{AgentError, AgentResult, RunError};
use crate::models::content::Content;
use crate::models::conversation::Conversation;
use crate::models::message::{Message, ToolRequest};
use crate::providers::base::{Provider, Usage};
use crate::registry::{panic_message, Concurrency, ToolRegistry};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// Knobs for a single agent. `max_iterations` has no default and must be at least 1.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// Upper bound on model calls per run
    pub max_iterations: usize,
    pub system_prompt: Option<String>,
    /// Run the calls of one round concurrently instead of one after another
    pub parallel_tool_calls: bool,
    pub model_timeout: Option<Duration>,
    pub tool_timeout: Option<Duration>,
}

impl AgentConfig {
    pub fn new(max_iterations: usize) -> Self {
        Self {
            max_iterations,
            system_prompt: None,
            parallel_tool_calls: false,
            model_timeout: None,
            tool_timeout: None,
        }
    }

    pub fn with_system_prompt<S: Into<String>>(mut self, system_prompt: S) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_parallel_tool_calls(mut self, parallel: bool) -> Self {
        self.parallel_tool_calls = parallel;
        self
    }

    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = Some(timeout);
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = Some(timeout);
        self
    }

    pub fn system_prompt(&self) -> &str {
        self.system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }
}

/// How a run ended when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The model answered without requesting any tools
    Completed,
    /// Every round asked for tools; the answer is a fixed notice
    IterationLimit,
}

/// Everything a caller gets back from [`Agent::run`]
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub final_text: String,
    pub rounds_used: usize,
    pub status: RunStatus,
    /// The full conversation, starting with the system and user messages
    pub messages: Vec<Message>,
    pub usage: Usage,
}

impl RunOutcome {
    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

enum LoopState {
    AwaitingModel,
    ExecutingTools(Vec<ToolRequest>),
    Done(String),
    DoneIterationLimit,
}

/// Text returned in place of an answer when the round budget runs out
pub fn iteration_limit_text(max_iterations: usize) -> String {
    format!(
        "Incomplete answer: reached the maximum of {} iterations without a final answer.",
        max_iterations
    )
}

/// Agent drives a model through rounds of tool calls until it produces an answer
///
/// An agent holds no per-run state, so one instance can serve many concurrent
/// calls to [`Agent::run`].
pub struct Agent {
    provider: Box<dyn Provider>,
    registry: ToolRegistry,
    config: AgentConfig,
}

impl Agent {
    pub fn new(provider: Box<dyn Provider>, registry: ToolRegistry, config: AgentConfig) -> Self {
        Self {
            provider,
            registry,
            config,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn validate(&self) -> Result<(), RunError> {
        if self.config.max_iterations == 0 {
            return Err(RunError::InvalidConfiguration(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        self.registry
            .validate()
            .map_err(|e| RunError::InvalidConfiguration(e.to_string()))
    }

    /// Answer a single query, calling tools as the model requests them
    ///
    /// Tool failures are handed back to the model as results. Only a failing
    /// model call ends the run with an error; running out of rounds does not.
    pub async fn run(&self, query: &str) -> Result<RunOutcome, RunError> {
        self.validate()?;

        let max_iterations = self.config.max_iterations;
        let mut conversation = Conversation::seeded(self.config.system_prompt(), query);
        let mut usage = Usage::default();
        let mut rounds = 0;
        let mut state = LoopState::AwaitingModel;

        loop {
            state = match state {
                LoopState::AwaitingModel if rounds == max_iterations => {
                    LoopState::DoneIterationLimit
                }
                LoopState::AwaitingModel => {
                    rounds += 1;
                    info!(round = rounds, messages = conversation.len(), "requesting model response");

                    let (response, round_usage) =
                        self.complete(rounds, conversation.messages()).await?;
                    usage.accumulate(&round_usage);

                    let requests: Vec<ToolRequest> =
                        response.tool_requests().into_iter().cloned().collect();
                    let text = response.text();
                    conversation.push(response);

                    if requests.is_empty() {
                        LoopState::Done(text)
                    } else {
                        LoopState::ExecutingTools(requests)
                    }
                }
                LoopState::ExecutingTools(requests) => {
                    let results = self.execute_tools(&requests).await;
                    for (request, result) in requests.iter().zip(results) {
                        conversation.push(Message::tool().with_tool_response(&request.id, result));
                    }
                    LoopState::AwaitingModel
                }
                LoopState::Done(final_text) => {
                    info!(rounds, "run completed");
                    return Ok(RunOutcome {
                        final_text,
                        rounds_used: rounds,
                        status: RunStatus::Completed,
                        messages: conversation.into_messages(),
                        usage,
                    });
                }
                LoopState::DoneIterationLimit => {
                    warn!(rounds, "run stopped at the iteration limit");
                    return Ok(RunOutcome {
                        final_text: iteration_limit_text(max_iterations),
                        rounds_used: rounds,
                        status: RunStatus::IterationLimit,
                        messages: conversation.into_messages(),
                        usage,
                    });
                }
            };
        }
    }

    async fn complete(&self, round: usize, messages: &[Message]) -> Result<(Message, Usage), RunError> {
        let call = self.provider.complete(messages, self.registry.tools());
        let result = match self.config.model_timeout {
            Some(timeout) => tokio::time::timeout(timeout, call)
                .await
                .map_err(|_| RunError::ModelTimeout { round, timeout })?,
            None => call.await,
        };
        result.map_err(|e| RunError::from_provider(round, e))
    }

    /// Execute every request of a round, returning results in request order
    async fn execute_tools(&self, requests: &[ToolRequest]) -> Vec<AgentResult<Content>> {
        if !self.config.parallel_tool_calls {
            let mut results = Vec::with_capacity(requests.len());
            for request in requests {
                results.push(self.execute_tool(request).await);
            }
            return results;
        }

        // Group by tool so exclusive tools never overlap with themselves
        let mut groups: Vec<(Concurrency, Vec<usize>)> = Vec::new();
        let mut group_by_name: HashMap<&str, usize> = HashMap::new();
        for (index, request) in requests.iter().enumerate() {
            let name = request.tool_call.name.as_str();
            let group = *group_by_name.entry(name).or_insert_with(|| {
                groups.push((self.registry.concurrency(name), Vec::new()));
                groups.len() - 1
            });
            groups[group].1.push(index);
        }

        let group_futures = groups.iter().map(|(concurrency, indices)| async move {
            match concurrency {
                Concurrency::Exclusive => {
                    let mut results = Vec::with_capacity(indices.len());
                    for &index in indices {
                        results.push((index, self.execute_tool(&requests[index]).await));
                    }
                    results
                }
                Concurrency::Shared => {
                    join_all(indices.iter().map(|&index| async move {
                        (index, self.execute_tool(&requests[index]).await)
                    }))
                    .await
                }
            }
        });

        let mut slots: Vec<Option<AgentResult<Content>>> = requests.iter().map(|_| None).collect();
        for (index, result) in join_all(group_futures).await.into_iter().flatten() {
            slots[index] = Some(result);
        }
        slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    Err(AgentError::Internal("Tool call produced no result".to_string()))
                })
            })
            .collect()
    }

    async fn execute_tool(&self, request: &ToolRequest) -> AgentResult<Content> {
        let call = &request.tool_call;
        debug!(id = %request.id, tool = %call.name, arguments = %call.arguments, "executing tool");

        // A panicking handler fails only its own call
        let dispatch = AssertUnwindSafe(self.registry.dispatch(call))
            .catch_unwind()
            .map(|result| {
                result.unwrap_or_else(|payload| {
                    Err(AgentError::ExecutionError(format!(
                        "Tool panicked: {}",
                        panic_message(payload.as_ref())
                    )))
                })
            });
        let result = match self.config.tool_timeout {
            Some(timeout) => tokio::time::timeout(timeout, dispatch)
                .await
                .unwrap_or(Err(AgentError::Timeout(timeout))),
            None => dispatch.await,
        };

        if let Err(error) = &result {
            warn!(id = %request.id, tool = %call.name, %error, "tool call failed");
        }
        result
    }
}

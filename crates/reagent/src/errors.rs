use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::providers::errors::ProviderError;

/// Failures of a single tool call.
///
/// These never abort a run: the loop wraps them into the tool result so the
/// model can see what went wrong and adapt.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum AgentError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool execution failed: {0}")]
    ExecutionError(String),

    #[error("Tool timed out after {0:?}")]
    Timeout(Duration),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AgentResult<T> = Result<T, AgentError>;

/// Failures that end a run without an answer.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Invalid agent configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Model call failed in round {round}: {source}")]
    ModelCall {
        round: usize,
        #[source]
        source: ProviderError,
    },

    #[error("Model call timed out in round {round} after {timeout:?}")]
    ModelTimeout { round: usize, timeout: Duration },

    #[error("Model returned a response that could not be interpreted in round {round}: {message}")]
    MalformedResponse { round: usize, message: String },
}

impl RunError {
    pub(crate) fn from_provider(round: usize, error: ProviderError) -> Self {
        match error {
            ProviderError::MalformedResponse(message) => RunError::MalformedResponse { round, message },
            source => RunError::ModelCall { round, source },
        }
    }
}

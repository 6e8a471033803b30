//! Workflow error taxonomy

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or running a state machine
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The definition document could not be read
    #[error("failed to read definition {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed or incomplete definition document
    #[error("invalid definition document: {0}")]
    Parse(String),

    /// A referenced state name does not exist
    #[error("state '{name}' not found in definition")]
    UnknownState { name: String },

    /// A state lacks a required transition or carries a malformed block
    #[error("wrong format in state '{state}': {reason}")]
    DefinitionFormat { state: String, reason: String },

    /// The invoker failed and no catch rule applied
    #[error("invocation of '{state}' failed: {source}")]
    Invocation {
        state: String,
        #[source]
        source: anyhow::Error,
    },

    /// No choice rule matched the run input
    #[error("no choice in state '{state}' matches input '{input}'")]
    NoMatchingChoice { state: String, input: String },

    /// The configured step ceiling was reached
    #[error("step limit of {limit} reached before state '{state}'")]
    StepLimitExceeded { limit: u64, state: String },

    /// The run was cancelled between steps
    #[error("run cancelled before state '{state}'")]
    Cancelled { state: String },

    /// The output sink rejected a response
    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl WorkflowError {
    pub(crate) fn definition_format(state: &str, reason: impl Into<String>) -> Self {
        WorkflowError::DefinitionFormat {
            state: state.to_string(),
            reason: reason.into(),
        }
    }

    /// Name of the state the error was raised at, when known
    pub fn state(&self) -> Option<&str> {
        match self {
            WorkflowError::UnknownState { name } => Some(name),
            WorkflowError::DefinitionFormat { state, .. }
            | WorkflowError::Invocation { state, .. }
            | WorkflowError::NoMatchingChoice { state, .. }
            | WorkflowError::StepLimitExceeded { state, .. }
            | WorkflowError::Cancelled { state } => Some(state),
            WorkflowError::Io { .. } | WorkflowError::Parse(_) | WorkflowError::Output(_) => None,
        }
    }
}

//! Transition policies applied by the engine at each step
//!
//! Only the first catch rule is ever consulted and its `ErrorEquals` is not
//! matched. Choices are first-match on the run input.

use crate::models::workflow::{CatchRule, ChoiceRule, ChoiceState, StateDefinition, TaskState};
use crate::workflow::error::WorkflowError;
use bytes::Bytes;

/// What a completed Task state asks the engine to do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The run is complete
    End,
    /// Continue with the named state
    Next(String),
}

/// A state that invokes its function before choosing a successor
#[derive(Debug, Clone, Copy)]
pub enum InvokingState<'a> {
    Task(&'a TaskState),
    Choice(&'a ChoiceState),
}

/// Whether reaching this state ends the run
///
/// A Fail state terminates successfully; callers learn about it through the
/// run report rather than an error.
pub fn is_terminal_fail(state: &StateDefinition) -> bool {
    matches!(state, StateDefinition::Fail(_))
}

/// The invoking form of a state, `None` when reaching it ends the run
pub fn invoking_state(state: &StateDefinition) -> Option<InvokingState<'_>> {
    match state {
        StateDefinition::Task(task) => Some(InvokingState::Task(task)),
        StateDefinition::Choice(choice) => Some(InvokingState::Choice(choice)),
        StateDefinition::Fail(_) => None,
    }
}

/// Pick the payload for the upcoming invocation
///
/// States with `ResultPath` consume the previous response, all others the
/// original run input.
pub fn select_payload(state: &StateDefinition, original_input: &Bytes, last_response: &Bytes) -> Bytes {
    if state.has_result_path() {
        last_response.clone()
    } else {
        original_input.clone()
    }
}

/// Recovery target after a failed invocation
///
/// Returns `Ok(None)` when the state declares no `Catch` block. Any error
/// matches; only the first rule is considered.
pub fn resolve_catch<'a>(
    state_name: &str,
    rules: Option<&'a [CatchRule]>,
) -> Result<Option<&'a str>, WorkflowError> {
    let Some(rules) = rules else {
        return Ok(None);
    };

    rules
        .first()
        .map(|rule| Some(rule.next.as_str()))
        .ok_or_else(|| WorkflowError::definition_format(state_name, "Catch has no rules"))
}

/// Branch target of a Choice state for the given comparison input
pub fn resolve_choice<'a>(
    state_name: &str,
    choices: Option<&'a [ChoiceRule]>,
    input: &str,
) -> Result<&'a str, WorkflowError> {
    let choices = choices
        .ok_or_else(|| WorkflowError::definition_format(state_name, "Choice has no Choices"))?;

    choices
        .iter()
        .find(|rule| rule.match_value == input)
        .map(|rule| rule.next.as_str())
        .ok_or_else(|| WorkflowError::NoMatchingChoice {
            state: state_name.to_string(),
            input: input.to_string(),
        })
}

/// Successor of a Task state after a successful invocation
///
/// `End` wins over `Next` when both are present.
pub fn resolve_task_next(state_name: &str, task: &TaskState) -> Result<TaskOutcome, WorkflowError> {
    if task.is_end() {
        return Ok(TaskOutcome::End);
    }

    match task.next.as_deref() {
        Some(next) if !next.is_empty() => Ok(TaskOutcome::Next(next.to_string())),
        _ => Err(WorkflowError::definition_format(
            state_name,
            "Task needs either End or Next",
        )),
    }
}

/// Comparison input for Choice states: the run input without trailing newlines
pub fn comparison_input(original_input: &[u8]) -> String {
    String::from_utf8_lossy(original_input)
        .trim_end_matches('\n')
        .to_string()
}

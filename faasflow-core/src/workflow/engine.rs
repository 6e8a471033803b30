//! State machine execution engine

use crate::models::workflow::{
    InvocationParams, RunReport, StateDefinition, StateMachineDefinition, StateTransition,
    Termination, TransitionType,
};
use crate::services::logging::log_recovered_failure;
use crate::workflow::error::WorkflowError;
use crate::workflow::executor::FunctionInvoker;
use crate::workflow::output::{OutputChunk, OutputSink};
use crate::workflow::policy::{self, InvokingState, TaskOutcome};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Optional guards checked once at the top of every step
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Maximum number of states evaluated before the run is aborted
    pub max_steps: Option<u64>,
    /// Cooperative cancellation signal
    pub cancellation: Option<CancellationToken>,
}

/// Per-run state threaded through every step
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    current_state: String,
    original_input: Bytes,
    last_response: Bytes,
    params: InvocationParams,
}

impl ExecutionContext {
    /// Start a run at `start_state`; the last response starts as the input
    pub fn new(start_state: String, input: Bytes, params: InvocationParams) -> Self {
        Self {
            current_state: start_state,
            last_response: input.clone(),
            original_input: input,
            params,
        }
    }

    pub fn current_state(&self) -> &str {
        &self.current_state
    }

    pub fn original_input(&self) -> &Bytes {
        &self.original_input
    }

    pub fn last_response(&self) -> &Bytes {
        &self.last_response
    }

    pub fn params(&self) -> &InvocationParams {
        &self.params
    }
}

/// State machine execution engine
pub struct StateMachineEngine {
    /// Workflow definition
    definition: StateMachineDefinition,
    /// Function invoker
    invoker: Arc<dyn FunctionInvoker>,
    /// Run guards
    options: RunOptions,
}

impl StateMachineEngine {
    /// Create new state machine engine
    pub fn new(definition: StateMachineDefinition, invoker: Arc<dyn FunctionInvoker>) -> Self {
        Self {
            definition,
            invoker,
            options: RunOptions::default(),
        }
    }

    /// Attach run guards
    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn definition(&self) -> &StateMachineDefinition {
        &self.definition
    }

    /// Execute the state machine from its start state to a terminal state
    ///
    /// Every successful response is handed to `sink` before the next state
    /// runs. Reaching a Fail state returns `Ok` with `Termination::Fail`.
    pub async fn execute(
        &self,
        input: Bytes,
        params: InvocationParams,
        sink: &mut dyn OutputSink,
    ) -> Result<RunReport, WorkflowError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let comparison_input = policy::comparison_input(&input);
        let mut context = ExecutionContext::new(self.definition.start_state.clone(), input, params);

        let mut transitions = vec![StateTransition {
            from_state: None,
            to_state: context.current_state.clone(),
            transition_type: TransitionType::Initial,
            timestamp: started_at,
            duration_ms: None,
        }];
        let mut steps: u64 = 0;
        let mut sequence: u64 = 0;

        tracing::info!(run_id = %run_id, start = %context.current_state, "Starting run");

        loop {
            self.check_guards(steps, &context.current_state)?;

            let state_name = context.current_state.clone();
            let state = self.definition.state(&state_name).ok_or_else(|| {
                WorkflowError::UnknownState {
                    name: state_name.clone(),
                }
            })?;
            steps += 1;

            tracing::debug!(
                run_id = %run_id,
                state = %state_name,
                kind = state.type_name(),
                step = steps,
                "Evaluating state"
            );

            let Some(invoking) = policy::invoking_state(state) else {
                let termination = fail_termination(&state_name, state);
                return Ok(self.finish(run_id, started_at, steps, termination, transitions));
            };

            let payload =
                policy::select_payload(state, &context.original_input, &context.last_response);
            let step_start = Instant::now();
            let result = self
                .invoker
                .invoke(&state_name, payload, &context.params)
                .await;

            let (next_state, transition_type) = match result {
                Err(error) => match policy::resolve_catch(&state_name, state.catch_rules())? {
                    Some(next) => {
                        log_recovered_failure(&state_name, next, &format!("{:#}", error));
                        (next.to_string(), TransitionType::Catch)
                    }
                    None => {
                        return Err(WorkflowError::Invocation {
                            state: state_name,
                            source: error,
                        })
                    }
                },
                Ok(response) => {
                    context.last_response = response.clone();
                    sink.emit(OutputChunk::new(
                        run_id,
                        state_name.clone(),
                        sequence,
                        response,
                    ))?;
                    sequence += 1;

                    match invoking {
                        InvokingState::Choice(choice) => {
                            let next = policy::resolve_choice(
                                &state_name,
                                choice.choices.as_deref(),
                                &comparison_input,
                            )?;
                            (next.to_string(), TransitionType::Choice)
                        }
                        InvokingState::Task(task) => {
                            match policy::resolve_task_next(&state_name, task)? {
                                TaskOutcome::End => {
                                    tracing::info!(run_id = %run_id, state = %state_name, "Run completed");
                                    let termination = Termination::End { state: state_name };
                                    return Ok(self.finish(
                                        run_id,
                                        started_at,
                                        steps,
                                        termination,
                                        transitions,
                                    ));
                                }
                                TaskOutcome::Next(next) => (next, TransitionType::Next),
                            }
                        }
                    }
                }
            };

            transitions.push(StateTransition {
                from_state: Some(state_name.clone()),
                to_state: next_state.clone(),
                transition_type,
                timestamp: Utc::now(),
                duration_ms: Some(step_start.elapsed().as_millis() as u64),
            });

            tracing::info!(
                run_id = %run_id,
                from = %state_name,
                next = %next_state,
                "Transitioned to state"
            );

            context.current_state = next_state;
        }
    }

    fn check_guards(&self, steps: u64, state: &str) -> Result<(), WorkflowError> {
        if let Some(token) = &self.options.cancellation {
            if token.is_cancelled() {
                return Err(WorkflowError::Cancelled {
                    state: state.to_string(),
                });
            }
        }

        if let Some(limit) = self.options.max_steps {
            if steps >= limit {
                return Err(WorkflowError::StepLimitExceeded {
                    limit,
                    state: state.to_string(),
                });
            }
        }

        Ok(())
    }

    fn finish(
        &self,
        run_id: Uuid,
        started_at: DateTime<Utc>,
        steps: u64,
        termination: Termination,
        transitions: Vec<StateTransition>,
    ) -> RunReport {
        RunReport {
            run_id,
            started_at,
            completed_at: Utc::now(),
            steps,
            termination,
            transitions,
        }
    }
}

fn fail_termination(state_name: &str, state: &StateDefinition) -> Termination {
    let (error, cause) = match state {
        StateDefinition::Fail(fail) => (fail.error.clone(), fail.cause.clone()),
        _ => (None, None),
    };

    tracing::warn!(
        state = state_name,
        error = error.as_deref().unwrap_or(""),
        cause = cause.as_deref().unwrap_or(""),
        "Reached Fail state, ending run"
    );

    Termination::Fail {
        state: state_name.to_string(),
        error,
        cause,
    }
}

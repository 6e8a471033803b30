//! Whole-graph definition checks
//!
//! Running a definition never calls into this module; the loader stays
//! lenient and the engine reports problems when it reaches them. The
//! validator lets operators find those problems up front.

use crate::models::workflow::{StateDefinition, StateMachineDefinition};
use crate::workflow::policy;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};

/// Validation error type
#[derive(Debug, Clone, Serialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

/// Validation result
#[derive(Debug, Default, Serialize)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: String, message: String) {
        self.errors.push(ValidationError { field, message });
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }
}

/// Definition validator
pub struct WorkflowValidator;

impl WorkflowValidator {
    /// Validate a state machine definition
    pub fn validate_definition(definition: &StateMachineDefinition) -> ValidationResult {
        let mut result = ValidationResult::new();

        if definition.state(&definition.start_state).is_none() {
            result.add_error(
                "StartFunction".to_string(),
                format!(
                    "Start state '{}' not found in States",
                    definition.start_state
                ),
            );
        }

        for name in definition.state_names() {
            if let Some(state) = definition.state(name) {
                Self::validate_state(definition, name, state, &mut result);
            }
        }

        let reachable = Self::reachable_states(definition);

        let unreachable = definition
            .state_names()
            .into_iter()
            .filter(|name| !reachable.contains(*name));
        for name in unreachable {
            result.add_warning(format!(
                "State '{}' is unreachable from start state '{}'",
                name, definition.start_state
            ));
        }

        let terminal_reachable = reachable
            .iter()
            .any(|name| Self::is_terminal(definition.state(name)));
        if definition.state(&definition.start_state).is_some() && !terminal_reachable {
            result.add_warning(format!(
                "No End or Fail state is reachable from '{}'; runs will not terminate",
                definition.start_state
            ));
        }

        result
    }

    fn validate_state(
        definition: &StateMachineDefinition,
        name: &str,
        state: &StateDefinition,
        result: &mut ValidationResult,
    ) {
        let check_target = |field: String, target: &str, result: &mut ValidationResult| {
            if definition.state(target).is_none() {
                result.add_error(field, format!("Target state '{}' not found", target));
            }
        };

        if let Some(rules) = state.catch_rules() {
            if rules.is_empty() {
                result.add_error(
                    format!("States.{}.Catch", name),
                    "Catch must contain at least one rule".to_string(),
                );
            }
            if let Some(first) = rules.first() {
                check_target(format!("States.{}.Catch[0].Next", name), &first.next, result);
            }
            if rules.len() > 1 {
                result.add_warning(format!(
                    "State '{}': only the first of {} Catch rules is ever used",
                    name,
                    rules.len()
                ));
            }
        }

        match state {
            StateDefinition::Task(task) => {
                if !task.is_end() {
                    match task.next.as_deref() {
                        Some(next) if !next.is_empty() => {
                            check_target(format!("States.{}.Next", name), next, result)
                        }
                        _ => result.add_error(
                            format!("States.{}", name),
                            "Task needs either End or Next".to_string(),
                        ),
                    }
                } else if task.next.is_some() {
                    result.add_warning(format!(
                        "State '{}' declares both End and Next; Next is ignored",
                        name
                    ));
                }
            }
            StateDefinition::Choice(choice) => match choice.choices.as_deref() {
                None | Some([]) => result.add_error(
                    format!("States.{}.Choices", name),
                    "Choice must contain at least one rule".to_string(),
                ),
                Some(rules) => {
                    let mut seen = HashSet::new();
                    for (index, rule) in rules.iter().enumerate() {
                        check_target(
                            format!("States.{}.Choices[{}].Next", name, index),
                            &rule.next,
                            result,
                        );
                        if !seen.insert(rule.match_value.as_str()) {
                            result.add_warning(format!(
                                "State '{}': Choices[{}] repeats '{}' and can never match",
                                name, index, rule.match_value
                            ));
                        }
                    }
                }
            },
            StateDefinition::Fail(_) => {}
        }
    }

    fn is_terminal(state: Option<&StateDefinition>) -> bool {
        match state {
            Some(state) if policy::is_terminal_fail(state) => true,
            Some(StateDefinition::Task(task)) => task.is_end(),
            _ => false,
        }
    }

    /// States reachable from the start state, following every transition kind
    fn reachable_states(definition: &StateMachineDefinition) -> HashSet<String> {
        let mut reachable = HashSet::new();
        let mut queue = VecDeque::new();

        if definition.state(&definition.start_state).is_some() {
            queue.push_back(definition.start_state.clone());
            reachable.insert(definition.start_state.clone());
        }

        while let Some(name) = queue.pop_front() {
            if let Some(state) = definition.state(&name) {
                for target in state.targets() {
                    if definition.state(target).is_some() && reachable.insert(target.to_string())
                    {
                        queue.push_back(target.to_string());
                    }
                }
            }
        }

        reachable
    }
}

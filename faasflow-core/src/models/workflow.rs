//! Workflow definition and run data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Default function gateway address
pub const DEFAULT_GATEWAY: &str = "http://127.0.0.1:8080";
/// Default request content type
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";
/// Default HTTP method used for invocations
pub const DEFAULT_HTTP_METHOD: &str = "POST";

/// State machine definition - the graph of named states for one run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateMachineDefinition {
    /// Name of the first state to execute
    #[serde(rename = "StartFunction")]
    pub start_state: String,
    /// Map of state name to state definition
    #[serde(rename = "States")]
    pub states: HashMap<String, StateDefinition>,
    /// Free-form description
    #[serde(rename = "Comment", default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl StateMachineDefinition {
    /// Look up a state by name
    pub fn state(&self, name: &str) -> Option<&StateDefinition> {
        self.states.get(name)
    }

    /// State names in sorted order
    pub fn state_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.states.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Individual state definition, tagged by its `Type` field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "Type")]
pub enum StateDefinition {
    /// Invokes the function named after the state, then follows `Next`/`End`
    Task(TaskState),
    /// Invokes the function, then branches on the original run input
    Choice(ChoiceState),
    /// Ends the run
    Fail(FailState),
}

impl StateDefinition {
    /// Name of the state type as written in the document
    pub fn type_name(&self) -> &'static str {
        match self {
            StateDefinition::Task(_) => "Task",
            StateDefinition::Choice(_) => "Choice",
            StateDefinition::Fail(_) => "Fail",
        }
    }

    /// Whether the state declares a `ResultPath` (any value, including null)
    pub fn has_result_path(&self) -> bool {
        match self {
            StateDefinition::Task(task) => task.result_path.is_some(),
            StateDefinition::Choice(choice) => choice.result_path.is_some(),
            StateDefinition::Fail(_) => false,
        }
    }

    /// Declared catch rules, `None` when the `Catch` field is absent
    pub fn catch_rules(&self) -> Option<&[CatchRule]> {
        match self {
            StateDefinition::Task(task) => task.catch.as_deref(),
            StateDefinition::Choice(choice) => choice.catch.as_deref(),
            StateDefinition::Fail(_) => None,
        }
    }

    /// Every state name this state can transition to
    pub fn targets(&self) -> Vec<&str> {
        let mut targets = Vec::new();
        if let Some(rules) = self.catch_rules() {
            targets.extend(rules.iter().map(|rule| rule.next.as_str()));
        }
        match self {
            StateDefinition::Task(task) => targets.extend(task.next.as_deref()),
            StateDefinition::Choice(choice) => {
                if let Some(rules) = &choice.choices {
                    targets.extend(rules.iter().map(|rule| rule.next.as_str()));
                }
            }
            StateDefinition::Fail(_) => {}
        }
        targets
    }
}

/// `Task` state fields
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct TaskState {
    /// Successor state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    /// Terminates the run when present, whatever its value
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub end: Option<Value>,
    /// Feeds the previous response to this state's invocation when present
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub result_path: Option<Value>,
    /// Recovery rules applied when the invocation fails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catch: Option<Vec<CatchRule>>,
    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl TaskState {
    /// Whether the `End` field is present
    pub fn is_end(&self) -> bool {
        self.end.is_some()
    }
}

/// `Choice` state fields
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ChoiceState {
    /// Ordered branch rules, first match wins
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<ChoiceRule>>,
    /// Feeds the previous response to this state's invocation when present
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub result_path: Option<Value>,
    /// Recovery rules applied when the invocation fails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catch: Option<Vec<CatchRule>>,
    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// `Fail` state fields
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct FailState {
    /// Error name reported in the run outcome
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Human-readable cause reported in the run outcome
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Recovery rule of a `Catch` block
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct CatchRule {
    /// Error names this rule is meant for; parsed but never matched against
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub error_equals: Vec<String>,
    /// State to continue with after a failed invocation
    pub next: String,
}

/// Branch rule of a `Choice` state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChoiceRule {
    /// Literal compared against the trimmed run input
    #[serde(rename = "StringEquals")]
    pub match_value: String,
    /// State to continue with when the literal matches
    #[serde(rename = "Next")]
    pub next: String,
}

/// Records a field by presence: any value, `null` included, becomes `Some`
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Invocation parameters, fixed once at run start
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvocationParams {
    /// Function gateway base URL
    pub gateway: String,
    /// Request content type
    pub content_type: String,
    /// Query parameters as `key=value`
    #[serde(default)]
    pub query: Vec<String>,
    /// Request headers as `key=value`
    #[serde(default)]
    pub headers: Vec<String>,
    /// Use the asynchronous invocation endpoint
    #[serde(default)]
    pub is_async: bool,
    /// HTTP method
    pub http_method: String,
    /// Skip TLS certificate verification
    #[serde(default)]
    pub tls_insecure: bool,
    /// Function namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl Default for InvocationParams {
    fn default() -> Self {
        Self {
            gateway: DEFAULT_GATEWAY.to_string(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            query: Vec::new(),
            headers: Vec::new(),
            is_async: false,
            http_method: DEFAULT_HTTP_METHOD.to_string(),
            tls_insecure: false,
            namespace: None,
        }
    }
}

/// How a run ended without error
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Termination {
    /// A Task state with `End` completed
    End { state: String },
    /// A Fail state was reached; the run still returns successfully
    Fail {
        state: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cause: Option<String>,
    },
}

impl Termination {
    /// Name of the state the run stopped at
    pub fn state(&self) -> &str {
        match self {
            Termination::End { state } | Termination::Fail { state, .. } => state,
        }
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, Termination::Fail { .. })
    }
}

/// Reason for state transition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransitionType {
    /// Entering the start state
    Initial,
    /// Task completed and followed `Next`
    Next,
    /// Choice rule matched the run input
    Choice,
    /// Invocation failed and a catch rule redirected the run
    Catch,
}

/// State transition record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    /// Previous state name (None for the start state)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_state: Option<String>,
    /// New state name
    pub to_state: String,
    /// Reason for transition
    pub transition_type: TransitionType,
    /// When transition occurred
    pub timestamp: DateTime<Utc>,
    /// Time spent in from_state (milliseconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// Summary of a completed run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique run identifier
    pub run_id: Uuid,
    /// When the run began
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub completed_at: DateTime<Utc>,
    /// Number of states evaluated
    pub steps: u64,
    /// How the run ended
    pub termination: Termination,
    /// Every transition taken, in order
    pub transitions: Vec<StateTransition>,
}

impl RunReport {
    /// Names of the states visited, in order
    pub fn visited_states(&self) -> Vec<&str> {
        self.transitions
            .iter()
            .map(|transition| transition.to_state.as_str())
            .collect()
    }
}

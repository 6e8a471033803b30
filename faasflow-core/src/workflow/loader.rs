//! Definition document loading

use crate::models::workflow::StateMachineDefinition;
use crate::workflow::error::WorkflowError;
use std::path::Path;

/// Document syntax of a definition file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Pick the syntax from the file extension, JSON unless `.yaml`/`.yml`
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                DocumentFormat::Yaml
            }
            _ => DocumentFormat::Json,
        }
    }
}

/// Read and parse a definition document from disk
pub fn load_definition(path: impl AsRef<Path>) -> Result<StateMachineDefinition, WorkflowError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| WorkflowError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(path = %path.display(), "Loading state machine definition");
    parse_definition(&content, DocumentFormat::from_path(path))
}

/// Parse a definition document and resolve its start state
///
/// Only the structure is checked here. Dangling `Next`/`Catch`/`Choices`
/// targets and missing `End`/`Next` surface when the run reaches them.
pub fn parse_definition(
    content: &str,
    format: DocumentFormat,
) -> Result<StateMachineDefinition, WorkflowError> {
    let definition: StateMachineDefinition = match format {
        DocumentFormat::Json => {
            serde_json::from_str(content).map_err(|e| WorkflowError::Parse(e.to_string()))?
        }
        DocumentFormat::Yaml => {
            serde_yaml::from_str(content).map_err(|e| WorkflowError::Parse(e.to_string()))?
        }
    };

    if definition.state(&definition.start_state).is_none() {
        return Err(WorkflowError::UnknownState {
            name: definition.start_state.clone(),
        });
    }

    Ok(definition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::workflow::StateDefinition;
    use tempfile::tempdir;

    const TWO_STEP: &str = r#"{
        "StartFunction": "A",
        "States": {
            "A": {"Type": "Task", "Next": "B"},
            "B": {"Type": "Task", "End": true}
        }
    }"#;

    #[test]
    fn test_parse_valid_document() {
        let definition = parse_definition(TWO_STEP, DocumentFormat::Json).unwrap();
        assert_eq!(definition.start_state, "A");
        assert_eq!(definition.states.len(), 2);
        assert!(matches!(
            definition.state("B"),
            Some(StateDefinition::Task(task)) if task.is_end()
        ));
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = parse_definition("{\"StartFunction\": ", DocumentFormat::Json).unwrap_err();
        assert!(matches!(err, WorkflowError::Parse(_)));
    }

    #[test]
    fn test_missing_top_level_fields_are_parse_errors() {
        let err = parse_definition(r#"{"States": {}}"#, DocumentFormat::Json).unwrap_err();
        assert!(matches!(err, WorkflowError::Parse(ref msg) if msg.contains("StartFunction")));

        let err = parse_definition(r#"{"StartFunction": "A"}"#, DocumentFormat::Json).unwrap_err();
        assert!(matches!(err, WorkflowError::Parse(ref msg) if msg.contains("States")));
    }

    #[test]
    fn test_absent_start_state_fails_at_load() {
        let err = parse_definition(
            r#"{"StartFunction": "missing", "States": {"A": {"Type": "Fail"}}}"#,
            DocumentFormat::Json,
        )
        .unwrap_err();
        assert!(matches!(err, WorkflowError::UnknownState { ref name } if name == "missing"));
    }

    #[test]
    fn test_dangling_references_are_accepted() {
        let definition = parse_definition(
            r#"{"StartFunction": "A", "States": {"A": {"Type": "Task", "Next": "nowhere"}}}"#,
            DocumentFormat::Json,
        )
        .unwrap();
        assert!(definition.state("nowhere").is_none());
    }

    #[test]
    fn test_yaml_document() {
        let yaml = r#"
StartFunction: check
States:
  check:
    Type: Choice
    Choices:
      - StringEquals: "yes"
        Next: done
  done:
    Type: Task
    End: true
"#;
        let definition = parse_definition(yaml, DocumentFormat::Yaml).unwrap();
        assert_eq!(definition.start_state, "check");
        assert_eq!(definition.state("check").unwrap().type_name(), "Choice");
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(DocumentFormat::from_path(Path::new("flow.json")), DocumentFormat::Json);
        assert_eq!(DocumentFormat::from_path(Path::new("flow.YML")), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::from_path(Path::new("flow")), DocumentFormat::Json);
    }

    #[test]
    fn test_load_definition_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("saga.json");
        std::fs::write(&path, TWO_STEP).unwrap();

        let definition = load_definition(&path).unwrap();
        assert_eq!(definition.start_state, "A");
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = load_definition(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, WorkflowError::Io { .. }));
    }
}

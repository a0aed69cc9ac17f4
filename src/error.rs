use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Whether an issue is about the shape of the input or about a dangling reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Structure,
    Reference,
}

/// One violated field. `field` is a path into the offending document, e.g. `phases[1].days[3].exercises[0].reps`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn structure(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: IssueKind::Structure,
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn reference(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: IssueKind::Reference,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation failed with {} issue(s):\n{}", .0.len(), render_issues(.0))]
    Validation(Vec<ValidationIssue>),

    #[error("unknown progression model `{0}`")]
    UnknownModel(String),

    #[error("unknown exercise `{id}`{}", did_you_mean(.suggestion))]
    UnknownExercise {
        id: String,
        suggestion: Option<String>,
    },

    #[error("unknown heart-rate zone `{0}`")]
    UnknownZone(String),

    #[error("malformed {format} document: {message}")]
    Malformed {
        format: &'static str,
        message: String,
    },
}

impl EngineError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![ValidationIssue::structure(field, message)])
    }

    /// Every issue carried by a validation failure; empty for reference errors.
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            Self::Validation(issues) => issues,
            _ => &[],
        }
    }
}

fn did_you_mean(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map(|s| format!(" (did you mean `{s}`?)"))
        .unwrap_or_default()
}

fn render_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("  - {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Soft problems that do not stop materialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    UnresolvedSubstitution {
        phase: String,
        day: u8,
        exercise_id: String,
    },
}

impl Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnresolvedSubstitution {
                phase,
                day,
                exercise_id,
            } => write!(
                f,
                "no usable substitute for `{}` (phase `{}`, day {}) – slot left unresolved",
                exercise_id, phase, day
            ),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_lists_every_issue() {
        let err = EngineError::Validation(vec![
            ValidationIssue::structure("phases[0].end_week", "ends before it starts"),
            ValidationIssue::reference("phases[1].model", "unknown model `zigzag`"),
        ]);
        let msg = err.to_string();
        assert!(msg.starts_with("validation failed with 2 issue(s)"));
        assert!(msg.contains("phases[0].end_week"));
        assert!(msg.contains("phases[1].model"));
        assert_eq!(err.issues().len(), 2);
    }

    #[test]
    fn unknown_exercise_mentions_suggestion() {
        let err = EngineError::UnknownExercise {
            id: "bakSquat".into(),
            suggestion: Some("backSquat".into()),
        };
        assert_eq!(
            err.to_string(),
            "unknown exercise `bakSquat` (did you mean `backSquat`?)"
        );
        assert!(err.issues().is_empty());
    }
}

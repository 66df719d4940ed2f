use serde::Serialize;
use tally_analytics_funnels::FunnelError;
use thiserror::Error;

use crate::draft::StepId;
use crate::keywords::KeywordError;

/// Metadata field that must be filled before saving
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingField {
    Name,
    TargetAudience,
    BusinessGoal,
    Steps,
}

impl MissingField {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissingField::Name => "name",
            MissingField::TargetAudience => "target_audience",
            MissingField::BusinessGoal => "business_goal",
            MissingField::Steps => "steps",
        }
    }
}

fn join_fields(fields: &[MissingField]) -> String {
    fields
        .iter()
        .map(MissingField::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required fields: {}", join_fields(.0))]
    MissingFields(Vec<MissingField>),

    #[error("step type must not be empty")]
    EmptyStepType,

    #[error("{field} must not be empty")]
    BlankValue { field: &'static str },

    #[error("ad settings only apply to ad_click steps, not '{step_type}'")]
    AdFieldsNotSupported { step_type: String },

    #[error(transparent)]
    Keyword(#[from] KeywordError),

    #[error("a funnel can have at most {max} steps")]
    StepLimitExceeded { max: usize },

    #[error("no step at position {position}, the funnel has {len} steps")]
    NoStepAtPosition { position: usize, len: usize },

    #[error("cannot move step to position {target_index}, the funnel has {len} steps")]
    InvalidReorder { target_index: usize, len: usize },
}

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("step {0} not found")]
    StepNotFound(StepId),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to store funnel: {0}")]
    Persistence(#[from] FunnelError),
}

impl From<KeywordError> for EditorError {
    fn from(error: KeywordError) -> Self {
        EditorError::Validation(ValidationError::Keyword(error))
    }
}

impl EditorError {
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            EditorError::Validation(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_message_lists_all() {
        let err = ValidationError::MissingFields(vec![
            MissingField::TargetAudience,
            MissingField::BusinessGoal,
        ]);
        assert_eq!(
            err.to_string(),
            "missing required fields: target_audience, business_goal"
        );
    }
}

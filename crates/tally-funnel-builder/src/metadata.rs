use serde::{Deserialize, Serialize};

use crate::error::{MissingField, ValidationError};

/// Funnel-level details collected alongside the steps
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicMetadata {
    pub name: String,
    pub description: Option<String>,
    pub target_audience: Option<String>,
    pub business_goal: Option<String>,
    /// Whole currency units; optional
    pub budget: Option<u64>,
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).unwrap_or_default().is_empty()
}

impl BasicMetadata {
    /// Fields that are absent or blank, in form order.
    pub fn missing_fields(&self) -> Vec<MissingField> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push(MissingField::Name);
        }
        if is_blank(&self.target_audience) {
            missing.push(MissingField::TargetAudience);
        }
        if is_blank(&self.business_goal) {
            missing.push(MissingField::BusinessGoal);
        }
        missing
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::MissingFields(missing))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_reports_blank_fields() {
        let metadata = BasicMetadata {
            name: "Launch".to_string(),
            target_audience: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(
            metadata.validate(),
            Err(ValidationError::MissingFields(vec![
                MissingField::TargetAudience,
                MissingField::BusinessGoal
            ]))
        );

        let complete = BasicMetadata {
            target_audience: Some("Founders".to_string()),
            business_goal: Some("Revenue".to_string()),
            ..metadata
        };
        assert_eq!(complete.validate(), Ok(()));
    }
}

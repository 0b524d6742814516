use crate::FormError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Value object: Form ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormId(pub String);

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Represents a parsed and validated multi-step form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormDefinition {
    /// ID of the form
    pub id: FormId,

    /// Human-readable name of the form
    pub name: String,

    /// The steps in this form, in display order
    pub steps: Vec<StepDefinition>,

    /// Whether an OTP must be sent before the form can be submitted
    #[serde(default)]
    pub requires_otp: bool,

    /// Fields that select what the OTP authorises (e.g. a stop/revoke
    /// `mode`). Changing one discards any code already sent.
    #[serde(default)]
    pub otp_reset_fields: Vec<String>,
}

/// Represents one screen of a form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    /// 0-based position of the step
    pub index: usize,

    /// Title shown above the step
    pub title: String,

    /// Fields whose rules must pass before leaving this step
    pub fields: Vec<String>,
}

impl StepDefinition {
    /// Create a step definition
    pub fn new<I, S>(index: usize, title: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            index,
            title: title.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

impl FormDefinition {
    /// Create a form definition from titled field groups; indices are
    /// assigned in order.
    pub fn new<I, T, F, S>(id: impl Into<String>, name: impl Into<String>, steps: I) -> Self
    where
        I: IntoIterator<Item = (T, F)>,
        T: Into<String>,
        F: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: FormId(id.into()),
            name: name.into(),
            steps: steps
                .into_iter()
                .enumerate()
                .map(|(index, (title, fields))| StepDefinition::new(index, title, fields))
                .collect(),
            requires_otp: false,
            otp_reset_fields: Vec::new(),
        }
    }

    /// Mark the form as requiring an OTP before submission
    pub fn with_otp(mut self) -> Self {
        self.requires_otp = true;
        self
    }

    /// Reset the OTP session whenever one of `fields` changes
    pub fn with_otp_reset_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.otp_reset_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Number of steps
    #[inline]
    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    /// Look up a step by index
    #[inline]
    pub fn step(&self, index: usize) -> Option<&StepDefinition> {
        self.steps.get(index)
    }

    /// Validate the form definition
    pub fn validate(&self) -> Result<(), FormError> {
        if self.steps.is_empty() {
            return Err(FormError::InvalidDefinition(format!(
                "Form {} must have at least one step",
                self.id
            )));
        }

        // Indices are positional: 0..n with no gaps
        for (position, step) in self.steps.iter().enumerate() {
            if step.index != position {
                return Err(FormError::InvalidDefinition(format!(
                    "Step '{}' has index {} but is at position {}",
                    step.title, step.index, position
                )));
            }

            let mut seen = HashSet::new();
            for field in &step.fields {
                if !seen.insert(field.as_str()) {
                    return Err(FormError::InvalidDefinition(format!(
                        "Duplicate field '{}' in step {}",
                        field, step.index
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop_payment() -> FormDefinition {
        FormDefinition::new(
            "stop-payment",
            "Stop Payment Order",
            vec![
                ("Account", vec!["accountNumber", "mode"]),
                ("Cheque", vec!["chequeNumber", "amount"]),
                ("Confirm", vec!["otpCode"]),
            ],
        )
        .with_otp()
    }

    #[test]
    fn test_form_definition_creation() {
        let definition = stop_payment();

        assert_eq!(definition.id, FormId("stop-payment".to_string()));
        assert_eq!(definition.total_steps(), 3);
        assert!(definition.requires_otp);
        assert_eq!(definition.steps[1].index, 1);
        assert_eq!(definition.steps[1].fields, vec!["chequeNumber", "amount"]);
        assert!(definition.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_steps() {
        let definition = FormDefinition::new(
            "empty",
            "Empty",
            Vec::<(&str, Vec<&str>)>::new(),
        );

        match definition.validate() {
            Err(FormError::InvalidDefinition(msg)) => {
                assert!(msg.contains("at least one step"));
            }
            other => panic!("Expected InvalidDefinition, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_index_gap() {
        let mut definition = stop_payment();
        definition.steps[2].index = 5;

        match definition.validate() {
            Err(FormError::InvalidDefinition(msg)) => {
                assert!(msg.contains("index 5"));
            }
            other => panic!("Expected InvalidDefinition, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_duplicate_field_in_step() {
        let definition = FormDefinition::new(
            "dup",
            "Duplicate",
            vec![("Only", vec!["amount", "amount"])],
        );

        match definition.validate() {
            Err(FormError::InvalidDefinition(msg)) => {
                assert!(msg.contains("Duplicate field 'amount'"));
            }
            other => panic!("Expected InvalidDefinition, got {:?}", other),
        }
    }

    #[test]
    fn test_definition_serialization() {
        let definition = stop_payment();
        let serialized = serde_json::to_string(&definition).unwrap();
        let deserialized: FormDefinition = serde_json::from_str(&serialized).unwrap();

        assert_eq!(deserialized.id, definition.id);
        assert_eq!(deserialized.steps, definition.steps);
        assert!(deserialized.requires_otp);
    }
}

//! Per-step validation dispatch
//!
//! A [`ValidationRuleSet`] maps field names to pure rule functions. The
//! [`ValidatorDispatch`] runs the rules for the fields a step declares and
//! folds the results into a fresh [`ErrorMap`]. Error maps are never merged
//! across passes, so an edit can't leave a stale error behind.

use crate::domain::form_definition::StepDefinition;
use crate::domain::form_state::FormData;
use crate::types::FieldValue;
use crate::FormError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// A validation rule: `(value, whole form) -> error message`.
///
/// `value` is `None` when the field is absent. Rules only read.
pub type Rule<D> = Arc<dyn Fn(Option<&FieldValue>, &D) -> Option<String> + Send + Sync>;

/// Field name to error message; a missing key means the field is valid
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorMap(BTreeMap<String, String>);

impl ErrorMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Fields in name order
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Union with another map; entries from `other` win on conflict
    pub fn extend(&mut self, other: ErrorMap) {
        self.0.extend(other.0);
    }
}

impl fmt::Display for ErrorMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
        f.write_str(&parts.join("; "))
    }
}

/// Named rules for one business form
pub struct ValidationRuleSet<D: FormData> {
    rules: HashMap<String, Rule<D>>,
}

impl<D: FormData> ValidationRuleSet<D> {
    /// Create an empty rule set; every field is valid
    pub fn new() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Register (or replace) the rule for a field
    pub fn rule(mut self, field: impl Into<String>, rule: Rule<D>) -> Self {
        self.rules.insert(field.into(), rule);
        self
    }

    /// Register a rule from a plain closure
    pub fn rule_fn<F>(self, field: impl Into<String>, f: F) -> Self
    where
        F: Fn(Option<&FieldValue>, &D) -> Option<String> + Send + Sync + 'static,
    {
        self.rule(field, Arc::new(f))
    }

    /// Look up a field's rule
    pub fn get(&self, field: &str) -> Option<&Rule<D>> {
        self.rules.get(field)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate one field against the form
    pub fn check(&self, field: &str, data: &D) -> Option<String> {
        // No rule means the field is optional
        let rule = self.rules.get(field)?;
        let value = data.field(field);
        rule(value.as_ref(), data)
    }
}

impl<D: FormData> Default for ValidationRuleSet<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: FormData> Clone for ValidationRuleSet<D> {
    fn clone(&self) -> Self {
        Self {
            rules: self.rules.clone(),
        }
    }
}

impl<D: FormData> fmt::Debug for ValidationRuleSet<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields: Vec<&String> = self.rules.keys().collect();
        fields.sort();
        f.debug_struct("ValidationRuleSet")
            .field("fields", &fields)
            .finish()
    }
}

/// Runs a rule set against the fields each step declares
pub struct ValidatorDispatch<D: FormData> {
    steps: Arc<[StepDefinition]>,
    rules: ValidationRuleSet<D>,
}

impl<D: FormData> ValidatorDispatch<D> {
    pub fn new(steps: impl Into<Arc<[StepDefinition]>>, rules: ValidationRuleSet<D>) -> Self {
        Self {
            steps: steps.into(),
            rules,
        }
    }

    /// Validate the fields declared by one step
    pub fn validate_step(&self, step_index: usize, data: &D) -> Result<ErrorMap, FormError> {
        let step = self
            .steps
            .get(step_index)
            .ok_or(FormError::StepOutOfRange(step_index))?;

        let mut errors = ErrorMap::new();
        for field in &step.fields {
            if let Some(message) = self.rules.check(field, data) {
                errors.insert(field.clone(), message);
            }
        }
        Ok(errors)
    }

    /// Validate every step; the last-mile guard before submission
    pub fn validate_all(&self, data: &D) -> ErrorMap {
        let mut errors = ErrorMap::new();
        for step in self.steps.iter() {
            for field in &step.fields {
                if let Some(message) = self.rules.check(field, data) {
                    errors.insert(field.clone(), message);
                }
            }
        }
        errors
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}

impl<D: FormData> fmt::Debug for ValidatorDispatch<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorDispatch")
            .field("steps", &self.steps.len())
            .field("rules", &self.rules)
            .finish()
    }
}

use crate::types::FieldValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Shape of the data a form session owns.
///
/// The engine only reads fields by name (for validation) and applies
/// patches; everything else about the shape belongs to the business form.
pub trait FormData: Clone + Debug + Send + Sync + 'static {
    /// Partial update applied by [`FormData::merge`]
    type Patch: Send + 'static;

    /// Current value of a named field, if present
    fn field(&self, name: &str) -> Option<FieldValue>;

    /// Shallow-merge a patch; last write wins per field
    fn merge(&mut self, patch: Self::Patch);
}

/// Default form data: an ordered map of field name to value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormState {
    fields: BTreeMap<String, FieldValue>,
}

impl FormState {
    /// Create an empty form state
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Set a single field
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Borrow a field
    #[inline]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Remove a field, returning its old value
    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    /// Number of fields held
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when no fields are held
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate fields in name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }
}

impl FormData for FormState {
    type Patch = FormState;

    fn field(&self, name: &str) -> Option<FieldValue> {
        self.fields.get(name).cloned()
    }

    fn merge(&mut self, patch: FormState) {
        self.fields.extend(patch.fields);
    }
}

impl<K, V> FromIterator<(K, V)> for FormState
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_is_shallow_and_keeps_other_fields() {
        let mut state = FormState::new().with("a", 1i64);
        state.merge(FormState::new().with("b", 2i64));

        assert_eq!(state.get("a"), Some(&FieldValue::Number(1.0)));
        assert_eq!(state.get("b"), Some(&FieldValue::Number(2.0)));
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn test_merge_last_write_wins() {
        let mut state = FormState::new().with("mode", "spo");
        state.merge(FormState::new().with("mode", "rspo"));
        state.merge(FormState::new().with("mode", "spo"));

        assert_eq!(state.field("mode"), Some(FieldValue::from("spo")));
    }

    #[test]
    fn test_from_iterator() {
        let state: FormState = vec![("x", "1"), ("y", "2")].into_iter().collect();
        assert_eq!(state.len(), 2);
        assert_eq!(state.get("y").and_then(FieldValue::as_str), Some("2"));
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let state = FormState::new()
            .with("accountNumber", "1000123456")
            .with("amount", 250.0)
            .with("urgent", false);

        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            json!({"accountNumber": "1000123456", "amount": 250.0, "urgent": false})
        );
    }
}

//! Reusable rule constructors
//!
//! Only [`required`] and [`must_accept`] reject blank input. Every other rule
//! passes blank values so optional fields compose with `required` through
//! [`all_of`].

use crate::domain::form_state::FormData;
use crate::domain::validation::Rule;
use crate::types::{is_missing, FieldValue};
use crate::FormError;
use regex::Regex;
use std::sync::Arc;

fn msg(message: impl Into<String>) -> Arc<str> {
    Arc::from(message.into())
}

/// Absent or blank values fail
pub fn required<D: FormData>(message: impl Into<String>) -> Rule<D> {
    let message = msg(message);
    Arc::new(move |value, _| is_missing(value).then(|| message.to_string()))
}

/// A checkbox that must be ticked
pub fn must_accept<D: FormData>(message: impl Into<String>) -> Rule<D> {
    let message = msg(message);
    Arc::new(move |value, _| {
        let accepted = value.and_then(FieldValue::as_flag).unwrap_or(false);
        (!accepted).then(|| message.to_string())
    })
}

/// Numeric and strictly greater than zero
pub fn positive_number<D: FormData>(message: impl Into<String>) -> Rule<D> {
    let message = msg(message);
    Arc::new(move |value, _| {
        if is_missing(value) {
            return None;
        }
        match value.and_then(FieldValue::as_number) {
            Some(n) if n > 0.0 => None,
            _ => Some(message.to_string()),
        }
    })
}

/// Text of at least `min` characters
pub fn min_length<D: FormData>(min: usize, message: impl Into<String>) -> Rule<D> {
    let message = msg(message);
    Arc::new(move |value, _| {
        let text = value.filter(|v| !v.is_blank())?.to_string();
        (text.trim().chars().count() < min).then(|| message.to_string())
    })
}

/// Text of at most `max` characters
pub fn max_length<D: FormData>(max: usize, message: impl Into<String>) -> Rule<D> {
    let message = msg(message);
    Arc::new(move |value, _| {
        let text = value.filter(|v| !v.is_blank())?.to_string();
        (text.trim().chars().count() > max).then(|| message.to_string())
    })
}

/// ASCII digits only, e.g. account or cheque numbers
pub fn digits_only<D: FormData>(message: impl Into<String>) -> Rule<D> {
    let message = msg(message);
    Arc::new(move |value, _| {
        let text = value.filter(|v| !v.is_blank())?.to_string();
        (!text.trim().chars().all(|c| c.is_ascii_digit())).then(|| message.to_string())
    })
}

/// Phone number: optional leading `+`, then 9 to 15 digits
pub fn phone_number<D: FormData>(message: impl Into<String>) -> Rule<D> {
    let message = msg(message);
    Arc::new(move |value, _| {
        let text = value.filter(|v| !v.is_blank())?.to_string();
        let digits = text.trim().strip_prefix('+').unwrap_or(text.trim());
        let valid = (9..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit());
        (!valid).then(|| message.to_string())
    })
}

/// Value must be one of the listed options
pub fn one_of<D, I, S>(options: I, message: impl Into<String>) -> Rule<D>
where
    D: FormData,
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let options: Vec<String> = options.into_iter().map(Into::into).collect();
    let message = msg(message);
    Arc::new(move |value, _| {
        let text = value.filter(|v| !v.is_blank())?.to_string();
        (!options.iter().any(|o| o == text.trim())).then(|| message.to_string())
    })
}

/// Whole value must match a regular expression
pub fn pattern<D: FormData>(pattern: &str, message: impl Into<String>) -> Result<Rule<D>, FormError> {
    let anchored = format!("^(?:{})$", pattern);
    let re = Regex::new(&anchored)
        .map_err(|e| FormError::Configuration(format!("Invalid rule pattern '{}': {}", pattern, e)))?;
    let message = msg(message);
    Ok(Arc::new(move |value, _| {
        let text = value.filter(|v| !v.is_blank())?.to_string();
        (!re.is_match(text.trim())).then(|| message.to_string())
    }))
}

/// Value must equal another field, e.g. a confirmation entry
pub fn equals_field<D: FormData>(other: impl Into<String>, message: impl Into<String>) -> Rule<D> {
    let other = other.into();
    let message = msg(message);
    Arc::new(move |value, form: &D| {
        let value = value.filter(|v| !v.is_blank())?;
        (form.field(&other).as_ref() != Some(value)).then(|| message.to_string())
    })
}

/// Apply `rule` only while `field` equals `expected`
pub fn when<D: FormData>(
    field: impl Into<String>,
    expected: impl Into<FieldValue>,
    rule: Rule<D>,
) -> Rule<D> {
    let field = field.into();
    let expected = expected.into();
    Arc::new(move |value, form: &D| {
        if form.field(&field).as_ref() == Some(&expected) {
            rule(value, form)
        } else {
            None
        }
    })
}

/// First failing rule wins
pub fn all_of<D: FormData>(rules: Vec<Rule<D>>) -> Rule<D> {
    Arc::new(move |value, form: &D| rules.iter().find_map(|rule| rule(value, form)))
}

//! Per-property validation rules and the error collection they feed.

use crate::change_set::input::FieldValue;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

pub const BLANK_MESSAGE: &str = "can't be blank";
pub const INVALID_MESSAGE: &str = "is invalid";

/// Declarative rule evaluated against one raw field value.
///
/// Only `Presence` fails on an absent value; the other rules check present
/// values and leave absence to `Presence`.
#[derive(Debug, Clone)]
pub enum ValidationRule {
    /// Fails on missing, null, `false`, blank text or an all-blank list.
    Presence,
    /// Every text member must have at most this many characters.
    MaxLength(usize),
    /// Every text member must match the pattern.
    Format(Regex),
}

impl ValidationRule {
    /// Returns the failure message, or `None` when the rule passes.
    pub fn check(&self, raw: Option<&FieldValue>) -> Option<String> {
        match self {
            Self::Presence => match raw {
                Some(value) if !value.is_blank() => None,
                _ => Some(BLANK_MESSAGE.to_string()),
            },
            Self::MaxLength(max) => {
                let too_long = text_members(raw)
                    .iter()
                    .any(|text| text.chars().count() > *max);
                too_long.then(|| format!("is too long (maximum is {max} characters)"))
            }
            Self::Format(pattern) => {
                let mismatch = text_members(raw)
                    .iter()
                    .any(|text| !pattern.is_match(text));
                mismatch.then(|| INVALID_MESSAGE.to_string())
            }
        }
    }
}

fn text_members(raw: Option<&FieldValue>) -> Vec<String> {
    match raw {
        None => Vec::new(),
        Some(FieldValue::List(items)) => items.iter().filter_map(FieldValue::as_text).collect(),
        Some(value) => value.as_text().into_iter().collect(),
    }
}

/// Field -> messages produced by the last validation.
///
/// Serializes as a plain `{"field": ["message", ...]}` object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of fields with at least one message.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Messages for one field; empty when the field passed.
    pub fn get(&self, field: &str) -> &[String] {
        self.fields
            .get(field)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields
            .iter()
            .map(|(field, messages)| (field.as_str(), messages.as_slice()))
    }

    /// Human-readable sentences, e.g. `Title can't be blank`.
    pub fn full_messages(&self) -> Vec<String> {
        self.fields
            .iter()
            .flat_map(|(field, messages)| {
                let label = humanize(field);
                messages
                    .iter()
                    .map(move |message| format!("{label} {message}"))
            })
            .collect()
    }

    pub(crate) fn add(&mut self, field: &str, message: String) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message);
    }

    pub(crate) fn clear(&mut self) {
        self.fields.clear();
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_messages().join(", "))
    }
}

fn humanize(field: &str) -> String {
    let spaced = field.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::{ValidationErrors, ValidationRule, BLANK_MESSAGE};
    use crate::change_set::input::FieldValue;
    use regex::Regex;

    #[test]
    fn presence_fails_on_missing_and_blank() {
        let rule = ValidationRule::Presence;
        assert_eq!(rule.check(None).as_deref(), Some(BLANK_MESSAGE));
        assert!(rule.check(Some(&FieldValue::from(" "))).is_some());
        assert!(rule.check(Some(&FieldValue::from("T"))).is_none());
    }

    #[test]
    fn max_length_checks_each_list_member() {
        let rule = ValidationRule::MaxLength(3);
        assert!(rule.check(None).is_none());
        assert!(rule.check(Some(&FieldValue::from(vec!["abc", "de"]))).is_none());
        assert_eq!(
            rule.check(Some(&FieldValue::from(vec!["abc", "defg"])))
                .as_deref(),
            Some("is too long (maximum is 3 characters)")
        );
    }

    #[test]
    fn format_ignores_absent_values() {
        let rule = ValidationRule::Format(Regex::new(r"^\d+$").unwrap());
        assert!(rule.check(None).is_none());
        assert!(rule.check(Some(&FieldValue::from("12"))).is_none());
        assert!(rule.check(Some(&FieldValue::from("1a"))).is_some());
    }

    #[test]
    fn full_messages_humanize_field_names() {
        let mut errors = ValidationErrors::default();
        errors.add("alternate_ids", "is invalid".to_string());
        errors.add("title", BLANK_MESSAGE.to_string());
        assert_eq!(
            errors.full_messages(),
            vec!["Alternate ids is invalid", "Title can't be blank"]
        );
        assert_eq!(errors.get("series"), &[] as &[String]);
    }
}

//! Untrusted field input accepted by `ChangeSet::validate`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field name -> raw value mapping, typically decoded from a request body.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// One raw input value.
///
/// Deserializes from plain JSON (`null`, booleans, numbers, strings, arrays).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    List(Vec<FieldValue>),
}

impl FieldValue {
    /// Blank means missing-equivalent: null, `false`, whitespace-only text,
    /// or a list with no non-blank member.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Bool(value) => !value,
            Self::Number(_) => false,
            Self::Text(value) => value.trim().is_empty(),
            Self::List(items) => items.iter().all(FieldValue::is_blank),
        }
    }

    /// Text form of a single value; `None` for null and lists.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Null | Self::List(_) => None,
            Self::Bool(value) => Some(value.to_string()),
            Self::Number(value) => Some(value.to_string()),
            Self::Text(value) => Some(value.clone()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

/// Builds a `FieldMap` from `(name, value)` pairs.
pub fn field_map<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> FieldMap
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    pairs
        .into_iter()
        .map(|(name, value)| (name.into(), value.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{FieldMap, FieldValue};

    #[test]
    fn blankness_follows_form_semantics() {
        assert!(FieldValue::Null.is_blank());
        assert!(FieldValue::from("  \t").is_blank());
        assert!(FieldValue::from(false).is_blank());
        assert!(FieldValue::from(vec!["", " "]).is_blank());
        assert!(!FieldValue::from(vec!["", "x"]).is_blank());
        assert!(!FieldValue::from(0_i64).is_blank());
    }

    #[test]
    fn decodes_plain_json_objects() {
        let input: FieldMap = serde_json::from_value(serde_json::json!({
            "title": "Dune",
            "author": ["Frank Herbert"],
            "series": null,
            "admin": true,
            "edition": 2
        }))
        .unwrap();

        assert_eq!(input["title"], FieldValue::from("Dune"));
        assert_eq!(input["author"], FieldValue::from(vec!["Frank Herbert"]));
        assert_eq!(input["series"], FieldValue::Null);
        assert_eq!(input["admin"], FieldValue::Bool(true));
        assert_eq!(input["edition"].as_text().as_deref(), Some("2"));
    }
}

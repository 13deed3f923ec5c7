//! Attribute shapes and values.
//!
//! # Responsibility
//! - Define the closed set of attribute shapes a resource type may declare.
//! - Check values against their declared shape before they reach storage.
//!
//! # Invariants
//! - `OrderedSet` values keep insertion order and never hold duplicates.
//! - `IdSequence` values may repeat identifiers.

use crate::model::identifier::Identifier;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Declared storage shape of one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeShape {
    /// Optional single string.
    Scalar,
    /// Ordered, duplicate-free list of strings.
    OrderedSet,
    /// Ordered list of identifiers, used for has-many relations.
    IdSequence,
}

impl AttributeShape {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::OrderedSet => "ordered_set",
            Self::IdSequence => "id_sequence",
        }
    }

    /// Value a fresh resource starts with.
    pub fn empty_value(self) -> AttributeValue {
        match self {
            Self::Scalar => AttributeValue::Scalar(None),
            Self::OrderedSet => AttributeValue::OrderedSet(Vec::new()),
            Self::IdSequence => AttributeValue::Ids(Vec::new()),
        }
    }
}

/// One attribute declaration inside a resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDecl {
    pub name: &'static str,
    pub shape: AttributeShape,
}

impl AttributeDecl {
    pub const fn new(name: &'static str, shape: AttributeShape) -> Self {
        Self { name, shape }
    }
}

/// Stored attribute value.
///
/// Serialized with an explicit tag so stored payloads stay self-describing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", content = "value", rename_all = "snake_case")]
pub enum AttributeValue {
    Scalar(Option<String>),
    OrderedSet(Vec<String>),
    Ids(Vec<Identifier>),
}

impl AttributeValue {
    pub fn shape(&self) -> AttributeShape {
        match self {
            Self::Scalar(_) => AttributeShape::Scalar,
            Self::OrderedSet(_) => AttributeShape::OrderedSet,
            Self::Ids(_) => AttributeShape::IdSequence,
        }
    }
}

/// Value does not conform to its declared attribute shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    UnknownAttribute {
        resource_type: &'static str,
        attribute: String,
    },
    MissingAttribute {
        resource_type: &'static str,
        attribute: &'static str,
    },
    ShapeMismatch {
        attribute: &'static str,
        expected: AttributeShape,
        actual: AttributeShape,
    },
    DuplicateSetMember {
        attribute: &'static str,
        value: String,
    },
}

impl Display for ShapeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownAttribute {
                resource_type,
                attribute,
            } => write!(f, "{resource_type} has no attribute `{attribute}`"),
            Self::MissingAttribute {
                resource_type,
                attribute,
            } => write!(f, "{resource_type} is missing attribute `{attribute}`"),
            Self::ShapeMismatch {
                attribute,
                expected,
                actual,
            } => write!(
                f,
                "attribute `{attribute}` expects {} but got {}",
                expected.as_str(),
                actual.as_str()
            ),
            Self::DuplicateSetMember { attribute, value } => {
                write!(f, "attribute `{attribute}` holds duplicate member `{value}`")
            }
        }
    }
}

impl Error for ShapeError {}

/// Checks one value against its declaration.
pub fn check_shape(decl: &AttributeDecl, value: &AttributeValue) -> Result<(), ShapeError> {
    if value.shape() != decl.shape {
        return Err(ShapeError::ShapeMismatch {
            attribute: decl.name,
            expected: decl.shape,
            actual: value.shape(),
        });
    }

    if let AttributeValue::OrderedSet(members) = value {
        let mut seen = HashSet::with_capacity(members.len());
        for member in members {
            if !seen.insert(member.as_str()) {
                return Err(ShapeError::DuplicateSetMember {
                    attribute: decl.name,
                    value: member.clone(),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{check_shape, AttributeDecl, AttributeShape, AttributeValue, ShapeError};

    const TITLE: AttributeDecl = AttributeDecl::new("title", AttributeShape::OrderedSet);

    #[test]
    fn rejects_variant_mismatch() {
        let err = check_shape(&TITLE, &AttributeValue::Scalar(Some("x".into()))).unwrap_err();
        assert_eq!(
            err,
            ShapeError::ShapeMismatch {
                attribute: "title",
                expected: AttributeShape::OrderedSet,
                actual: AttributeShape::Scalar,
            }
        );
    }

    #[test]
    fn rejects_duplicate_set_members() {
        let value = AttributeValue::OrderedSet(vec!["a".into(), "b".into(), "a".into()]);
        assert!(matches!(
            check_shape(&TITLE, &value),
            Err(ShapeError::DuplicateSetMember { .. })
        ));
    }

    #[test]
    fn stored_form_is_tagged() {
        let value = AttributeValue::OrderedSet(vec!["Dune".into()]);
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["shape"], "ordered_set");
        assert_eq!(json["value"][0], "Dune");
    }
}

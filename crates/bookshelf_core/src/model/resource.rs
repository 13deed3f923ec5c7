//! Schema-typed resource record.
//!
//! # Responsibility
//! - Hold one value per declared attribute of a `ResourceType`.
//! - Keep identity state read-only for callers outside the crate.
//!
//! # Invariants
//! - The attribute set is fixed by the resource type; no ad hoc attributes.
//! - Every held value conforms to its declared shape.
//! - `id` is set iff the resource has been persisted.

use crate::model::attribute::{check_shape, AttributeDecl, AttributeValue, ShapeError};
use crate::model::identifier::Identifier;
use std::collections::BTreeMap;

/// Static schema for one kind of resource.
#[derive(Debug, PartialEq, Eq)]
pub struct ResourceType {
    pub name: &'static str,
    pub attributes: &'static [AttributeDecl],
}

impl ResourceType {
    /// Returns the declaration for `name`, if declared.
    pub fn attribute(&self, name: &str) -> Option<&'static AttributeDecl> {
        self.attributes.iter().find(|decl| decl.name == name)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|decl| decl.name == name)
    }
}

/// Identity-bearing domain record.
#[derive(Debug, Clone)]
pub struct Resource {
    resource_type: &'static ResourceType,
    id: Option<Identifier>,
    values: Vec<AttributeValue>,
}

impl Resource {
    /// Creates an unpersisted resource with every attribute empty.
    pub fn new(resource_type: &'static ResourceType) -> Self {
        Self {
            resource_type,
            id: None,
            values: resource_type
                .attributes
                .iter()
                .map(|decl| decl.shape.empty_value())
                .collect(),
        }
    }

    /// Rebuilds a persisted resource from backend data.
    ///
    /// Used by adapter implementations. Rejects unknown attributes, missing
    /// attributes and values that violate their declared shape.
    pub fn from_stored(
        resource_type: &'static ResourceType,
        id: Identifier,
        mut attributes: BTreeMap<String, AttributeValue>,
    ) -> Result<Self, ShapeError> {
        if let Some(unknown) = attributes
            .keys()
            .find(|name| resource_type.attribute(name).is_none())
        {
            return Err(ShapeError::UnknownAttribute {
                resource_type: resource_type.name,
                attribute: unknown.clone(),
            });
        }

        let mut values = Vec::with_capacity(resource_type.attributes.len());
        for decl in resource_type.attributes {
            let value = attributes
                .remove(decl.name)
                .ok_or(ShapeError::MissingAttribute {
                    resource_type: resource_type.name,
                    attribute: decl.name,
                })?;
            check_shape(decl, &value)?;
            values.push(value);
        }

        Ok(Self {
            resource_type,
            id: Some(id),
            values,
        })
    }

    pub fn resource_type(&self) -> &'static ResourceType {
        self.resource_type
    }

    pub fn id(&self) -> Option<&Identifier> {
        self.id.as_ref()
    }

    /// True iff an identifier has been assigned by a persister.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Returns the value of a declared attribute.
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.resource_type
            .position(name)
            .map(|index| &self.values[index])
    }

    /// Scalar accessor; `None` when unset or not a scalar attribute.
    pub fn scalar(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(AttributeValue::Scalar(value)) => value.as_deref(),
            _ => None,
        }
    }

    /// Ordered-set accessor; empty when not an ordered-set attribute.
    pub fn set_values(&self, name: &str) -> &[String] {
        match self.get(name) {
            Some(AttributeValue::OrderedSet(values)) => values.as_slice(),
            _ => &[],
        }
    }

    /// Identifier-sequence accessor; empty when not an id attribute.
    pub fn ids(&self, name: &str) -> &[Identifier] {
        match self.get(name) {
            Some(AttributeValue::Ids(ids)) => ids.as_slice(),
            _ => &[],
        }
    }

    /// Iterates declared attributes in declaration order.
    pub fn attributes(&self) -> impl Iterator<Item = (&'static str, &AttributeValue)> + '_ {
        self.resource_type
            .attributes
            .iter()
            .map(|decl| decl.name)
            .zip(self.values.iter())
    }

    /// Owned name -> value map, the form adapters store.
    pub fn attribute_map(&self) -> BTreeMap<String, AttributeValue> {
        self.attributes()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    /// Compares type and every declared attribute, ignoring identity.
    pub fn attributes_eq(&self, other: &Self) -> bool {
        self.resource_type.name == other.resource_type.name && self.values == other.values
    }

    /// Re-checks every held value against its declaration.
    pub fn validate(&self) -> Result<(), ShapeError> {
        for (decl, value) in self.resource_type.attributes.iter().zip(self.values.iter()) {
            check_shape(decl, value)?;
        }
        Ok(())
    }

    /// Writes one attribute after checking its shape.
    pub(crate) fn set(&mut self, name: &str, value: AttributeValue) -> Result<(), ShapeError> {
        let index =
            self.resource_type
                .position(name)
                .ok_or_else(|| ShapeError::UnknownAttribute {
                    resource_type: self.resource_type.name,
                    attribute: name.to_string(),
                })?;
        check_shape(&self.resource_type.attributes[index], &value)?;
        self.values[index] = value;
        Ok(())
    }
}

/// Persisted resources compare by type and identifier. Unpersisted resources
/// have no stable identity and are only equal to themselves.
impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        match (&self.id, &other.id) {
            (Some(left), Some(right)) => {
                self.resource_type.name == other.resource_type.name && left == right
            }
            _ => std::ptr::eq(self, other),
        }
    }
}

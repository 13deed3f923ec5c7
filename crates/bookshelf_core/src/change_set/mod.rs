//! Change-set engine: validate untrusted input, then sync it onto a resource.
//!
//! # Responsibility
//! - Restrict input to a fixed allowlist of permitted properties.
//! - Evaluate declared rules and report every failure per field.
//! - Coerce raw input into the declared attribute shape in one explicit step.
//!
//! # Invariants
//! - Unknown input fields are dropped, never written.
//! - `sync` only runs after the most recent `validate` succeeded.
//! - A change set never talks to a storage backend.

pub mod book;
pub mod input;
pub mod rules;

use crate::error::{AdapterError, AdapterResult};
use crate::model::attribute::{AttributeDecl, AttributeShape, AttributeValue};
use crate::model::identifier::Identifier;
use crate::model::resource::{Resource, ResourceType};
use input::{FieldMap, FieldValue};
use log::debug;
use rules::{ValidationErrors, ValidationRule};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Problems found while building a change-set definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    UndeclaredProperty {
        resource_type: &'static str,
        property: String,
    },
    RuleOnUnpermittedProperty(String),
}

impl Display for DefinitionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UndeclaredProperty {
                resource_type,
                property,
            } => write!(f, "{resource_type} does not declare property `{property}`"),
            Self::RuleOnUnpermittedProperty(property) => {
                write!(f, "rule declared for unpermitted property `{property}`")
            }
        }
    }
}

impl Error for DefinitionError {}

/// Raw value cannot be brought into the declared attribute shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoercionError {
    ExpectedSingleValue,
    NestedList,
    InvalidIdentifier,
}

impl CoercionError {
    /// Field-level message reported through `ValidationErrors`.
    pub fn message(&self) -> &'static str {
        match self {
            Self::ExpectedSingleValue => "must be a single value",
            Self::NestedList => "must not contain nested lists",
            Self::InvalidIdentifier => "contains an invalid identifier",
        }
    }
}

/// Converts one raw input value into the shape `decl` declares.
///
/// - Scalar: blank values and empty lists become unset; a one-item list
///   unwraps.
/// - Ordered set: a single value is wrapped; blank members are dropped and
///   duplicates keep their first position.
/// - Identifier sequence: as ordered set, but duplicates are kept.
pub fn coerce(decl: &AttributeDecl, raw: &FieldValue) -> Result<AttributeValue, CoercionError> {
    match decl.shape {
        AttributeShape::Scalar => match raw {
            FieldValue::List(items) => match items.as_slice() {
                [] => Ok(AttributeValue::Scalar(None)),
                [FieldValue::List(_)] => Err(CoercionError::NestedList),
                [single] => Ok(AttributeValue::Scalar(scalar_text(single))),
                _ => Err(CoercionError::ExpectedSingleValue),
            },
            other => Ok(AttributeValue::Scalar(scalar_text(other))),
        },
        AttributeShape::OrderedSet => {
            let mut members: Vec<String> = Vec::new();
            for text in non_blank_members(raw)? {
                if !members.contains(&text) {
                    members.push(text);
                }
            }
            Ok(AttributeValue::OrderedSet(members))
        }
        AttributeShape::IdSequence => {
            let ids = non_blank_members(raw)?
                .into_iter()
                .map(|text| Identifier::new(text).map_err(|_| CoercionError::InvalidIdentifier))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(AttributeValue::Ids(ids))
        }
    }
}

/// Blank values (including `false`) leave a scalar unset.
fn scalar_text(value: &FieldValue) -> Option<String> {
    if value.is_blank() {
        return None;
    }
    value.as_text()
}

fn non_blank_members(raw: &FieldValue) -> Result<Vec<String>, CoercionError> {
    let items = match raw {
        FieldValue::List(items) => items.as_slice(),
        single => std::slice::from_ref(single),
    };

    let mut members = Vec::with_capacity(items.len());
    for item in items {
        if matches!(item, FieldValue::List(_)) {
            return Err(CoercionError::NestedList);
        }
        if item.is_blank() {
            continue;
        }
        if let Some(text) = item.as_text() {
            members.push(text);
        }
    }
    Ok(members)
}

#[derive(Debug, Clone)]
struct PropertyDef {
    decl: &'static AttributeDecl,
    rules: Vec<ValidationRule>,
}

/// Fixed allowlist and rule set for one kind of change set.
///
/// Built once at startup; immutable afterwards.
#[derive(Debug, Clone)]
pub struct ChangeSetDefinition {
    resource_type: &'static ResourceType,
    properties: Vec<PropertyDef>,
}

impl ChangeSetDefinition {
    pub fn builder(resource_type: &'static ResourceType) -> ChangeSetDefinitionBuilder {
        ChangeSetDefinitionBuilder {
            resource_type,
            permitted: Vec::new(),
            rules: Vec::new(),
        }
    }

    pub fn resource_type(&self) -> &'static ResourceType {
        self.resource_type
    }

    /// Permitted property names in declaration order.
    pub fn permitted(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.properties.iter().map(|property| property.decl.name)
    }

    pub fn is_permitted(&self, name: &str) -> bool {
        self.properties
            .iter()
            .any(|property| property.decl.name == name)
    }
}

/// Collects permitted properties and rules before validation against the
/// resource type.
#[derive(Debug)]
pub struct ChangeSetDefinitionBuilder {
    resource_type: &'static ResourceType,
    permitted: Vec<String>,
    rules: Vec<(String, ValidationRule)>,
}

impl ChangeSetDefinitionBuilder {
    /// Adds one property to the allowlist.
    pub fn property(mut self, name: impl Into<String>) -> Self {
        self.permitted.push(name.into());
        self
    }

    /// Attaches one more rule to a permitted property.
    pub fn validates(mut self, name: impl Into<String>, rule: ValidationRule) -> Self {
        self.rules.push((name.into(), rule));
        self
    }

    pub fn build(self) -> Result<ChangeSetDefinition, DefinitionError> {
        let mut properties: Vec<PropertyDef> = Vec::with_capacity(self.permitted.len());
        for name in self.permitted {
            let decl = self.resource_type.attribute(&name).ok_or_else(|| {
                DefinitionError::UndeclaredProperty {
                    resource_type: self.resource_type.name,
                    property: name.clone(),
                }
            })?;
            if properties.iter().all(|property| property.decl.name != decl.name) {
                properties.push(PropertyDef {
                    decl,
                    rules: Vec::new(),
                });
            }
        }

        for (name, rule) in self.rules {
            let property = properties
                .iter_mut()
                .find(|property| property.decl.name == name)
                .ok_or(DefinitionError::RuleOnUnpermittedProperty(name))?;
            property.rules.push(rule);
        }

        Ok(ChangeSetDefinition {
            resource_type: self.resource_type,
            properties,
        })
    }
}

/// Request-scoped staging area between untrusted input and one resource.
#[derive(Debug)]
pub struct ChangeSet<'def> {
    definition: &'def ChangeSetDefinition,
    resource: Resource,
    pending: BTreeMap<&'static str, AttributeValue>,
    errors: ValidationErrors,
    last_valid: Option<bool>,
}

impl<'def> ChangeSet<'def> {
    /// Binds `resource` to `definition`.
    ///
    /// Fails with `Precondition` when the resource type differs from the one
    /// the definition was built for.
    pub fn new(definition: &'def ChangeSetDefinition, resource: Resource) -> AdapterResult<Self> {
        if resource.resource_type().name != definition.resource_type.name {
            return Err(AdapterError::Precondition(format!(
                "change set for {} cannot bind a {} resource",
                definition.resource_type.name,
                resource.resource_type().name
            )));
        }

        Ok(Self {
            definition,
            resource,
            pending: BTreeMap::new(),
            errors: ValidationErrors::default(),
            last_valid: None,
        })
    }

    /// Validates `input` against the permitted properties and their rules.
    ///
    /// Fields outside the allowlist are ignored. Present permitted fields are
    /// staged as pending edits whatever the outcome; `sync` is only unlocked
    /// when this returns `true`.
    pub fn validate(&mut self, input: &FieldMap) -> bool {
        self.pending.clear();
        self.errors.clear();

        for property in &self.definition.properties {
            let name = property.decl.name;
            let raw = input.get(name);

            for rule in &property.rules {
                if let Some(message) = rule.check(raw) {
                    self.errors.add(name, message);
                }
            }

            if let Some(raw) = raw {
                match coerce(property.decl, raw) {
                    Ok(value) => {
                        self.pending.insert(name, value);
                    }
                    Err(err) => self.errors.add(name, err.message().to_string()),
                }
            }
        }

        let ignored = input
            .keys()
            .filter(|key| !self.definition.is_permitted(key))
            .count();
        let valid = self.errors.is_empty();
        debug!(
            "event=change_set_validate module=change_set status={} resource_type={} fields={} ignored={} failed_fields={}",
            if valid { "ok" } else { "invalid" },
            self.definition.resource_type.name,
            input.len(),
            ignored,
            self.errors.len()
        );

        self.last_valid = Some(valid);
        valid
    }

    /// Writes pending edits onto the bound resource and returns it.
    ///
    /// # Errors
    /// - `Precondition` when `validate` has not run or last returned `false`.
    pub fn sync(&mut self) -> AdapterResult<Resource> {
        match self.last_valid {
            Some(true) => {}
            Some(false) => {
                return Err(AdapterError::Precondition(
                    "sync called after failed validation".to_string(),
                ))
            }
            None => {
                return Err(AdapterError::Precondition(
                    "sync called before validate".to_string(),
                ))
            }
        }

        let mut staged = self.resource.clone();
        for (name, value) in &self.pending {
            staged.set(name, value.clone()).map_err(|err| {
                AdapterError::Precondition(format!("pending edit violates shape: {err}"))
            })?;
        }
        self.resource = staged;

        debug!(
            "event=change_set_sync module=change_set status=ok resource_type={} edits={}",
            self.definition.resource_type.name,
            self.pending.len()
        );
        Ok(self.resource.clone())
    }

    /// Errors from the last validation; empty on success or before any run.
    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// The bound resource, including edits from any successful `sync`.
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn into_resource(self) -> Resource {
        self.resource
    }

    pub fn definition(&self) -> &'def ChangeSetDefinition {
        self.definition
    }
}

//! Resource model shared by change sets and storage adapters.
//!
//! # Responsibility
//! - Define identifiers, attribute shapes and schema-typed resources.
//! - Resolve stored type names back to their static schema.
//!
//! # Invariants
//! - Every resource type is declared statically; the catalog is closed.

pub mod attribute;
pub mod book;
pub mod identifier;
pub mod resource;

use resource::ResourceType;

static RESOURCE_TYPES: &[&ResourceType] = &[&book::BOOK];

/// Looks up a known resource type by its stored name.
pub fn lookup_resource_type(name: &str) -> Option<&'static ResourceType> {
    RESOURCE_TYPES
        .iter()
        .copied()
        .find(|resource_type| resource_type.name == name)
}

//! Book resource type.
//!
//! # Invariants
//! - `title` and `author` are ordered sets; insertion order is display order.
//! - `alternate_ids` and `member_ids` reference other resources by identifier.

use crate::model::attribute::{AttributeDecl, AttributeShape};
use crate::model::resource::{Resource, ResourceType};

pub const ALTERNATE_IDS: &str = "alternate_ids";
pub const TITLE: &str = "title";
pub const AUTHOR: &str = "author";
pub const SERIES: &str = "series";
pub const MEMBER_IDS: &str = "member_ids";

/// Canonical book schema.
pub static BOOK: ResourceType = ResourceType {
    name: "Book",
    attributes: &[
        AttributeDecl::new(ALTERNATE_IDS, AttributeShape::IdSequence),
        AttributeDecl::new(TITLE, AttributeShape::OrderedSet),
        AttributeDecl::new(AUTHOR, AttributeShape::OrderedSet),
        AttributeDecl::new(SERIES, AttributeShape::Scalar),
        AttributeDecl::new(MEMBER_IDS, AttributeShape::IdSequence),
    ],
};

/// Creates an empty, unpersisted book.
pub fn new_book() -> Resource {
    Resource::new(&BOOK)
}

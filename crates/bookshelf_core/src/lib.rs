//! Resource persistence core for the bookshelf application.
//!
//! Untrusted input flows through a change set (validate, then sync) before a
//! persister stores it; reads go through a query service. Both halves sit
//! behind traits bound together in a `MetadataAdapter`.

pub mod adapter;
pub mod change_set;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod service;

pub use adapter::memory::{MemoryPersister, MemoryQueryService, MemoryStore};
pub use adapter::sqlite::{sqlite_metadata_adapter, SqlitePersister, SqliteQueryService};
pub use adapter::{Backend, Deadline, DynMetadataAdapter, MetadataAdapter, Persister, QueryService};
pub use change_set::book::BOOK_CHANGE_SET;
pub use change_set::input::{field_map, FieldMap, FieldValue};
pub use change_set::rules::{ValidationErrors, ValidationRule};
pub use change_set::{ChangeSet, ChangeSetDefinition, DefinitionError};
pub use config::{BackendConfig, ConfigError, CoreConfig};
pub use error::{AdapterError, AdapterResult, StorageFailure};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::attribute::{AttributeDecl, AttributeShape, AttributeValue, ShapeError};
pub use model::book::{new_book, BOOK};
pub use model::identifier::Identifier;
pub use model::resource::{Resource, ResourceType};
pub use service::book_service::{BookService, Submission};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}

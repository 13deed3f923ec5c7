//! Metadata adapter: the persister/query-service contract and its backends.
//!
//! # Responsibility
//! - Define the write (`Persister`) and read (`QueryService`) halves of a
//!   storage backend.
//! - Bind one pair into a `MetadataAdapter` injected into services.
//!
//! # Invariants
//! - Callers depend only on the traits, never on a concrete backend.
//! - Saving replaces the whole attribute set of the stored resource.
//! - Resources returned by a query service always conform to their schema.

pub mod memory;
pub mod sqlite;

use crate::config::{BackendConfig, CoreConfig};
use crate::db::{open_db, open_db_in_memory};
use crate::error::{AdapterError, AdapterResult};
use crate::model::identifier::Identifier;
use crate::model::resource::{Resource, ResourceType};
use log::info;
use memory::MemoryStore;
use rusqlite::Connection;
use std::time::{Duration, Instant};

/// Optional point in time after which a backend call gives up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// No deadline; calls may block on the backend.
    pub fn none() -> Self {
        Self(None)
    }

    pub fn after(timeout: Duration) -> Self {
        Self(Some(Instant::now() + timeout))
    }

    pub fn at(instant: Instant) -> Self {
        Self(Some(instant))
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    /// Time left, `None` when no deadline is set.
    pub fn remaining(&self) -> Option<Duration> {
        self.0
            .map(|instant| instant.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        self.0.is_some_and(|instant| Instant::now() >= instant)
    }

    /// Fails with `Timeout` when the deadline already passed.
    pub fn check(&self, operation: &'static str) -> AdapterResult<()> {
        if self.is_expired() {
            return Err(AdapterError::Timeout { operation });
        }
        Ok(())
    }
}

/// Write side of a storage backend.
pub trait Persister {
    /// Stores `resource` and returns the authoritative stored form.
    ///
    /// Unpersisted resources get a fresh identifier; persisted ones are
    /// overwritten in place under their identifier.
    fn save_within(&self, resource: Resource, deadline: Deadline) -> AdapterResult<Resource>;

    /// Removes `resource`; its identifier must no longer resolve afterwards.
    fn delete_within(&self, resource: &Resource, deadline: Deadline) -> AdapterResult<()>;

    fn save(&self, resource: Resource) -> AdapterResult<Resource> {
        self.save_within(resource, Deadline::none())
    }

    fn delete(&self, resource: &Resource) -> AdapterResult<()> {
        self.delete_within(resource, Deadline::none())
    }
}

/// Read side of a storage backend.
pub trait QueryService {
    fn find_by_id_within(&self, id: &Identifier, deadline: Deadline) -> AdapterResult<Resource>;

    /// All resources of one type in a stable, backend-defined order.
    fn find_all_of_model_within(
        &self,
        resource_type: &'static ResourceType,
        deadline: Deadline,
    ) -> AdapterResult<Vec<Resource>>;

    fn count_all_of_model_within(
        &self,
        resource_type: &'static ResourceType,
        deadline: Deadline,
    ) -> AdapterResult<usize> {
        self.find_all_of_model_within(resource_type, deadline)
            .map(|resources| resources.len())
    }

    fn find_by_id(&self, id: &Identifier) -> AdapterResult<Resource> {
        self.find_by_id_within(id, Deadline::none())
    }

    fn find_all_of_model(
        &self,
        resource_type: &'static ResourceType,
    ) -> AdapterResult<Vec<Resource>> {
        self.find_all_of_model_within(resource_type, Deadline::none())
    }

    fn count_all_of_model(&self, resource_type: &'static ResourceType) -> AdapterResult<usize> {
        self.count_all_of_model_within(resource_type, Deadline::none())
    }
}

impl<T: Persister + ?Sized> Persister for Box<T> {
    fn save_within(&self, resource: Resource, deadline: Deadline) -> AdapterResult<Resource> {
        (**self).save_within(resource, deadline)
    }

    fn delete_within(&self, resource: &Resource, deadline: Deadline) -> AdapterResult<()> {
        (**self).delete_within(resource, deadline)
    }
}

impl<T: QueryService + ?Sized> QueryService for Box<T> {
    fn find_by_id_within(&self, id: &Identifier, deadline: Deadline) -> AdapterResult<Resource> {
        (**self).find_by_id_within(id, deadline)
    }

    fn find_all_of_model_within(
        &self,
        resource_type: &'static ResourceType,
        deadline: Deadline,
    ) -> AdapterResult<Vec<Resource>> {
        (**self).find_all_of_model_within(resource_type, deadline)
    }

    fn count_all_of_model_within(
        &self,
        resource_type: &'static ResourceType,
        deadline: Deadline,
    ) -> AdapterResult<usize> {
        (**self).count_all_of_model_within(resource_type, deadline)
    }
}

/// The active storage binding: one persister and one query service over the
/// same backend, plus the per-call timeout applied by services.
pub struct MetadataAdapter<P, Q> {
    persister: P,
    query_service: Q,
    call_timeout: Option<Duration>,
}

/// Adapter whose backend is chosen at runtime.
pub type DynMetadataAdapter<'a> =
    MetadataAdapter<Box<dyn Persister + 'a>, Box<dyn QueryService + 'a>>;

impl<P: Persister, Q: QueryService> MetadataAdapter<P, Q> {
    pub fn new(persister: P, query_service: Q) -> Self {
        Self {
            persister,
            query_service,
            call_timeout: None,
        }
    }

    /// Applies `timeout` to every call issued through `deadline()`.
    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn persister(&self) -> &P {
        &self.persister
    }

    pub fn query_service(&self) -> &Q {
        &self.query_service
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout
    }

    /// Fresh deadline for one backend call.
    pub fn deadline(&self) -> Deadline {
        self.call_timeout.map_or_else(Deadline::none, Deadline::after)
    }
}

/// Backend resources opened from configuration.
///
/// Owns whatever the adapter borrows (the SQLite connection), so one value
/// lives for the whole process run.
pub enum Backend {
    Memory(MemoryStore),
    Sqlite(Connection),
}

impl Backend {
    /// Opens the backend named by `config`.
    pub fn open(config: &CoreConfig) -> AdapterResult<Self> {
        let backend = match &config.backend {
            BackendConfig::Memory => Self::Memory(MemoryStore::new()),
            BackendConfig::Sqlite { path: Some(path) } => Self::Sqlite(open_db(path)?),
            BackendConfig::Sqlite { path: None } => Self::Sqlite(open_db_in_memory()?),
        };
        info!(
            "event=backend_open module=adapter status=ok backend={}",
            backend.kind()
        );
        Ok(backend)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Sqlite(_) => "sqlite",
        }
    }

    /// Binds a metadata adapter over this backend.
    pub fn metadata_adapter(
        &self,
        call_timeout: Option<Duration>,
    ) -> AdapterResult<DynMetadataAdapter<'_>> {
        let (persister, query_service): (Box<dyn Persister + '_>, Box<dyn QueryService + '_>) =
            match self {
                Self::Memory(store) => (
                    Box::new(store.persister()),
                    Box::new(store.query_service()),
                ),
                Self::Sqlite(conn) => (
                    Box::new(sqlite::SqlitePersister::try_new(conn)?),
                    Box::new(sqlite::SqliteQueryService::try_new(conn)?),
                ),
            };
        Ok(MetadataAdapter::new(persister, query_service).with_call_timeout(call_timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::Deadline;
    use crate::error::AdapterError;
    use std::time::{Duration, Instant};

    #[test]
    fn unset_deadline_never_expires() {
        let deadline = Deadline::none();
        assert!(!deadline.is_expired());
        assert!(deadline.remaining().is_none());
        deadline.check("save").unwrap();
    }

    #[test]
    fn past_deadline_reports_timeout() {
        let deadline = Deadline::at(Instant::now() - Duration::from_millis(1));
        assert_eq!(deadline.remaining(), Some(Duration::ZERO));
        assert!(matches!(
            deadline.check("find_by_id"),
            Err(AdapterError::Timeout {
                operation: "find_by_id"
            })
        ));
    }
}

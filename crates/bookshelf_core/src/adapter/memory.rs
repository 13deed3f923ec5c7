//! In-memory reference adapter.
//!
//! # Responsibility
//! - Provide a backend with the full persister/query-service contract for
//!   tests and local runs.
//!
//! # Invariants
//! - Records are kept in their stored (name -> value) form and rebuilt
//!   through `Resource::from_stored` on every read.
//! - `find_all_of_model` returns records in first-insert order.
//! - State is guarded by a mutex; sequential use is the expected pattern.

use crate::adapter::{Deadline, MetadataAdapter, Persister, QueryService};
use crate::error::{AdapterError, AdapterResult, StorageFailure};
use crate::model::attribute::AttributeValue;
use crate::model::identifier::Identifier;
use crate::model::lookup_resource_type;
use crate::model::resource::{Resource, ResourceType};
use log::debug;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct StoredRecord {
    resource_type: String,
    sequence: u64,
    attributes: BTreeMap<String, AttributeValue>,
}

#[derive(Debug, Default)]
struct MemoryState {
    records: HashMap<Identifier, StoredRecord>,
    next_sequence: u64,
    offline_reason: Option<String>,
}

/// Shared in-memory storage handed to one persister/query-service pair.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn persister(&self) -> MemoryPersister {
        MemoryPersister {
            store: self.clone(),
        }
    }

    pub fn query_service(&self) -> MemoryQueryService {
        MemoryQueryService {
            store: self.clone(),
        }
    }

    /// Adapter bound to this store.
    pub fn metadata_adapter(&self) -> MetadataAdapter<MemoryPersister, MemoryQueryService> {
        MetadataAdapter::new(self.persister(), self.query_service())
    }

    /// Number of stored records across all types.
    ///
    /// A poisoned lock surfaces as `StorageFailure::Unavailable`.
    pub fn record_count(&self) -> AdapterResult<usize> {
        Ok(self.lock()?.records.len())
    }

    /// Makes every subsequent call fail with `StorageFailure::Unavailable`
    /// until cleared with `None`.
    pub fn set_offline(&self, reason: Option<&str>) -> AdapterResult<()> {
        self.lock()?.offline_reason = reason.map(str::to_string);
        Ok(())
    }

    /// Writes a stored record as-is, bypassing shape checks.
    ///
    /// Used to seed fixtures, including deliberately malformed ones.
    pub fn insert_raw(
        &self,
        resource_type: &str,
        id: Identifier,
        attributes: BTreeMap<String, AttributeValue>,
    ) -> AdapterResult<()> {
        let mut state = self.lock()?;
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.records.insert(
            id,
            StoredRecord {
                resource_type: resource_type.to_string(),
                sequence,
                attributes,
            },
        );
        Ok(())
    }

    fn lock(&self) -> AdapterResult<MutexGuard<'_, MemoryState>> {
        self.state.lock().map_err(|_| {
            AdapterError::Storage(StorageFailure::Unavailable(
                "memory store lock poisoned".to_string(),
            ))
        })
    }

    /// Locks state after the deadline and offline checks every call shares.
    fn enter(
        &self,
        operation: &'static str,
        deadline: Deadline,
    ) -> AdapterResult<MutexGuard<'_, MemoryState>> {
        deadline.check(operation)?;
        let state = self.lock()?;
        if let Some(reason) = &state.offline_reason {
            return Err(AdapterError::Storage(StorageFailure::Unavailable(
                reason.clone(),
            )));
        }
        Ok(state)
    }
}

/// Write half of the in-memory adapter.
#[derive(Debug, Clone)]
pub struct MemoryPersister {
    store: MemoryStore,
}

impl Persister for MemoryPersister {
    fn save_within(&self, resource: Resource, deadline: Deadline) -> AdapterResult<Resource> {
        resource
            .validate()
            .map_err(|err| AdapterError::Storage(StorageFailure::SchemaMismatch(err)))?;

        let mut state = self.store.enter("save", deadline)?;
        let id = resource.id().cloned().unwrap_or_else(Identifier::generate);
        let resource_type = resource.resource_type();
        let attributes = resource.attribute_map();

        let sequence = match state.records.get(&id) {
            Some(existing) if existing.resource_type != resource_type.name => {
                return Err(AdapterError::Storage(StorageFailure::Constraint(format!(
                    "identifier {id} already holds a {}",
                    existing.resource_type
                ))));
            }
            Some(existing) => existing.sequence,
            None => {
                let sequence = state.next_sequence;
                state.next_sequence += 1;
                sequence
            }
        };

        state.records.insert(
            id.clone(),
            StoredRecord {
                resource_type: resource_type.name.to_string(),
                sequence,
                attributes: attributes.clone(),
            },
        );
        debug!(
            "event=resource_save module=adapter.memory status=ok resource_type={} id={}",
            resource_type.name, id
        );

        Resource::from_stored(resource_type, id, attributes)
            .map_err(|err| AdapterError::Storage(StorageFailure::SchemaMismatch(err)))
    }

    fn delete_within(&self, resource: &Resource, deadline: Deadline) -> AdapterResult<()> {
        let id = resource.id().ok_or_else(|| {
            AdapterError::Precondition("cannot delete an unpersisted resource".to_string())
        })?;

        let mut state = self.store.enter("delete", deadline)?;
        if state.records.remove(id).is_none() {
            return Err(AdapterError::NotFound { id: id.clone() });
        }
        debug!(
            "event=resource_delete module=adapter.memory status=ok resource_type={} id={}",
            resource.resource_type().name,
            id
        );
        Ok(())
    }
}

/// Read half of the in-memory adapter.
#[derive(Debug, Clone)]
pub struct MemoryQueryService {
    store: MemoryStore,
}

impl QueryService for MemoryQueryService {
    fn find_by_id_within(&self, id: &Identifier, deadline: Deadline) -> AdapterResult<Resource> {
        let state = self.store.enter("find_by_id", deadline)?;
        let record = state
            .records
            .get(id)
            .ok_or_else(|| AdapterError::NotFound { id: id.clone() })?;
        let resource_type = lookup_resource_type(&record.resource_type).ok_or_else(|| {
            AdapterError::CorruptData(format!(
                "unknown resource type `{}` for {id}",
                record.resource_type
            ))
        })?;
        rebuild(resource_type, id, record)
    }

    fn find_all_of_model_within(
        &self,
        resource_type: &'static ResourceType,
        deadline: Deadline,
    ) -> AdapterResult<Vec<Resource>> {
        let state = self.store.enter("find_all_of_model", deadline)?;
        let mut matching: Vec<(&Identifier, &StoredRecord)> = state
            .records
            .iter()
            .filter(|(_, record)| record.resource_type == resource_type.name)
            .collect();
        matching.sort_by_key(|(_, record)| record.sequence);

        matching
            .into_iter()
            .map(|(id, record)| rebuild(resource_type, id, record))
            .collect()
    }

    fn count_all_of_model_within(
        &self,
        resource_type: &'static ResourceType,
        deadline: Deadline,
    ) -> AdapterResult<usize> {
        let state = self.store.enter("count_all_of_model", deadline)?;
        Ok(state
            .records
            .values()
            .filter(|record| record.resource_type == resource_type.name)
            .count())
    }
}

fn rebuild(
    resource_type: &'static ResourceType,
    id: &Identifier,
    record: &StoredRecord,
) -> AdapterResult<Resource> {
    Resource::from_stored(resource_type, id.clone(), record.attributes.clone())
        .map_err(|err| AdapterError::CorruptData(format!("{} {id}: {err}", resource_type.name)))
}

#[cfg(test)]
mod tests {
    use super::MemoryStore;
    use crate::error::{AdapterError, StorageFailure};
    use crate::model::identifier::Identifier;

    #[test]
    fn record_count_reports_poisoned_lock() {
        let store = MemoryStore::new();
        store
            .insert_raw("Book", Identifier::generate(), Default::default())
            .unwrap();
        assert_eq!(store.record_count().unwrap(), 1);

        let shared = store.clone();
        let outcome = std::thread::spawn(move || {
            let _guard = shared.state.lock().unwrap();
            panic!("poison memory store");
        })
        .join();
        assert!(outcome.is_err());

        assert!(matches!(
            store.record_count(),
            Err(AdapterError::Storage(StorageFailure::Unavailable(_)))
        ));
    }
}

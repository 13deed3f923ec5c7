//! SQLite-backed persister and query service.
//!
//! # Responsibility
//! - Store resources as one row per identifier with a JSON attribute payload.
//! - Keep SQL details inside the adapter boundary.
//!
//! # Invariants
//! - Write paths call `Resource::validate()` before SQL mutations.
//! - Read paths reject payloads that do not match the declared schema
//!   (`CorruptData`) instead of masking them.
//! - Listing order is creation order, ties broken by rowid.

use crate::adapter::{Deadline, MetadataAdapter, Persister, QueryService};
use crate::db::migrations::{current_user_version, latest_version};
use crate::db::{DbError, DEFAULT_BUSY_TIMEOUT};
use crate::error::{AdapterError, AdapterResult, StorageFailure};
use crate::model::attribute::AttributeValue;
use crate::model::identifier::Identifier;
use crate::model::lookup_resource_type;
use crate::model::resource::{Resource, ResourceType};
use log::{debug, warn};
use rusqlite::{params, Connection, ErrorCode, Row};
use std::collections::BTreeMap;

const RESOURCES_TABLE: &str = "resources";

const RESOURCE_SELECT_SQL: &str = "SELECT
    id,
    resource_type,
    attributes
FROM resources";

/// Write half of the SQLite adapter.
pub struct SqlitePersister<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePersister<'conn> {
    /// Wraps a connection opened through `open_db`/`open_db_in_memory`.
    pub fn try_new(conn: &'conn Connection) -> AdapterResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

/// Read half of the SQLite adapter.
pub struct SqliteQueryService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteQueryService<'conn> {
    pub fn try_new(conn: &'conn Connection) -> AdapterResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

/// Adapter with both halves sharing `conn`.
pub fn sqlite_metadata_adapter(
    conn: &Connection,
) -> AdapterResult<MetadataAdapter<SqlitePersister<'_>, SqliteQueryService<'_>>> {
    Ok(MetadataAdapter::new(
        SqlitePersister::try_new(conn)?,
        SqliteQueryService::try_new(conn)?,
    ))
}

impl Persister for SqlitePersister<'_> {
    fn save_within(&self, resource: Resource, deadline: Deadline) -> AdapterResult<Resource> {
        resource
            .validate()
            .map_err(|err| AdapterError::Storage(StorageFailure::SchemaMismatch(err)))?;
        begin_call(self.conn, "save", deadline)?;

        let id = resource.id().cloned().unwrap_or_else(Identifier::generate);
        let resource_type = resource.resource_type();
        let attributes = resource.attribute_map();
        let payload = serde_json::to_string(&attributes)
            .map_err(|err| StorageFailure::Encode(err.to_string()))?;

        let changed = self
            .conn
            .execute(
                "INSERT INTO resources (id, resource_type, attributes)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE
                 SET
                    attributes = excluded.attributes,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE resources.resource_type = excluded.resource_type;",
                params![id.as_str(), resource_type.name, payload],
            )
            .map_err(|err| map_sqlite_error(err, "save", deadline))?;

        if changed == 0 {
            warn!(
                "event=resource_save module=adapter.sqlite status=error error_code=type_conflict resource_type={} id={}",
                resource_type.name, id
            );
            return Err(AdapterError::Storage(StorageFailure::Constraint(format!(
                "identifier {id} already holds a different resource type"
            ))));
        }

        debug!(
            "event=resource_save module=adapter.sqlite status=ok resource_type={} id={}",
            resource_type.name, id
        );
        Resource::from_stored(resource_type, id, attributes)
            .map_err(|err| AdapterError::Storage(StorageFailure::SchemaMismatch(err)))
    }

    fn delete_within(&self, resource: &Resource, deadline: Deadline) -> AdapterResult<()> {
        let id = resource.id().ok_or_else(|| {
            AdapterError::Precondition("cannot delete an unpersisted resource".to_string())
        })?;
        begin_call(self.conn, "delete", deadline)?;

        let changed = self
            .conn
            .execute("DELETE FROM resources WHERE id = ?1;", [id.as_str()])
            .map_err(|err| map_sqlite_error(err, "delete", deadline))?;
        if changed == 0 {
            return Err(AdapterError::NotFound { id: id.clone() });
        }

        debug!(
            "event=resource_delete module=adapter.sqlite status=ok resource_type={} id={}",
            resource.resource_type().name,
            id
        );
        Ok(())
    }
}

impl QueryService for SqliteQueryService<'_> {
    fn find_by_id_within(&self, id: &Identifier, deadline: Deadline) -> AdapterResult<Resource> {
        begin_call(self.conn, "find_by_id", deadline)?;
        let to_adapter = |err| map_sqlite_error(err, "find_by_id", deadline);

        let mut stmt = self
            .conn
            .prepare(&format!("{RESOURCE_SELECT_SQL} WHERE id = ?1;"))
            .map_err(to_adapter)?;
        let mut rows = stmt.query([id.as_str()]).map_err(to_adapter)?;
        match rows.next().map_err(to_adapter)? {
            Some(row) => parse_resource_row(row, None),
            None => Err(AdapterError::NotFound { id: id.clone() }),
        }
    }

    fn find_all_of_model_within(
        &self,
        resource_type: &'static ResourceType,
        deadline: Deadline,
    ) -> AdapterResult<Vec<Resource>> {
        begin_call(self.conn, "find_all_of_model", deadline)?;
        let to_adapter = |err| map_sqlite_error(err, "find_all_of_model", deadline);

        let mut stmt = self
            .conn
            .prepare(&format!(
                "{RESOURCE_SELECT_SQL}
                 WHERE resource_type = ?1
                 ORDER BY created_at ASC, rowid ASC;"
            ))
            .map_err(to_adapter)?;
        let mut rows = stmt.query([resource_type.name]).map_err(to_adapter)?;

        let mut resources = Vec::new();
        while let Some(row) = rows.next().map_err(to_adapter)? {
            resources.push(parse_resource_row(row, Some(resource_type))?);
        }
        Ok(resources)
    }

    fn count_all_of_model_within(
        &self,
        resource_type: &'static ResourceType,
        deadline: Deadline,
    ) -> AdapterResult<usize> {
        begin_call(self.conn, "count_all_of_model", deadline)?;
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM resources WHERE resource_type = ?1;",
                [resource_type.name],
                |row| row.get(0),
            )
            .map_err(|err| map_sqlite_error(err, "count_all_of_model", deadline))?;
        usize::try_from(count)
            .map_err(|_| AdapterError::CorruptData(format!("negative row count {count}")))
    }
}

fn ensure_schema_ready(conn: &Connection) -> AdapterResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(DbError::UninitializedConnection {
            expected_version,
            actual_version,
        }
        .into());
    }

    let exists: bool = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [RESOURCES_TABLE],
        |row| row.get(0),
    )?;
    if !exists {
        return Err(DbError::MissingRequiredTable(RESOURCES_TABLE).into());
    }

    Ok(())
}

/// Applies the deadline to the connection before one call.
fn begin_call(conn: &Connection, operation: &'static str, deadline: Deadline) -> AdapterResult<()> {
    deadline.check(operation)?;
    conn.busy_timeout(deadline.remaining().unwrap_or(DEFAULT_BUSY_TIMEOUT))?;
    Ok(())
}

fn map_sqlite_error(err: rusqlite::Error, operation: &'static str, deadline: Deadline) -> AdapterError {
    if deadline.is_set() {
        if let rusqlite::Error::SqliteFailure(failure, _) = &err {
            if matches!(
                failure.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
            ) {
                warn!("event=resource_call module=adapter.sqlite status=timeout operation={operation}");
                return AdapterError::Timeout { operation };
            }
        }
    }
    err.into()
}

fn parse_resource_row(
    row: &Row<'_>,
    expected_type: Option<&'static ResourceType>,
) -> AdapterResult<Resource> {
    let id_text = text_column(row, "id")?;
    let id = Identifier::new(&id_text).map_err(|_| {
        AdapterError::CorruptData(format!("invalid id value `{id_text}` in resources.id"))
    })?;

    let type_text = text_column(row, "resource_type")?;
    let resource_type = match expected_type {
        Some(expected) => expected,
        None => lookup_resource_type(&type_text).ok_or_else(|| {
            AdapterError::CorruptData(format!(
                "unknown resource type `{type_text}` in resources.resource_type"
            ))
        })?,
    };

    let payload = text_column(row, "attributes")?;
    let attributes: BTreeMap<String, AttributeValue> = serde_json::from_str(&payload)
        .map_err(|err| {
            AdapterError::CorruptData(format!("undecodable attributes for {id}: {err}"))
        })?;

    Resource::from_stored(resource_type, id.clone(), attributes)
        .map_err(|err| AdapterError::CorruptData(format!("{} {id}: {err}", resource_type.name)))
}

/// Reads a TEXT column; any other storage class is corrupt data.
fn text_column(row: &Row<'_>, column: &'static str) -> AdapterResult<String> {
    row.get::<_, String>(column).map_err(|err| match err {
        rusqlite::Error::InvalidColumnType(_, _, actual) => AdapterError::CorruptData(format!(
            "resources.{column} holds {actual} instead of text"
        )),
        rusqlite::Error::FromSqlConversionFailure(_, _, source) => {
            AdapterError::CorruptData(format!("resources.{column} is not valid text: {source}"))
        }
        other => other.into(),
    })
}

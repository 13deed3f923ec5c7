//! Error taxonomy for adapter and change-set operations.
//!
//! # Invariants
//! - Field validation failures are never represented here; they are returned
//!   as `ValidationErrors` data by the change set.
//! - Each failure kind maps to exactly one variant so callers can branch on it.

use crate::db::DbError;
use crate::model::attribute::ShapeError;
use crate::model::identifier::Identifier;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type AdapterResult<T> = Result<T, AdapterError>;

/// Failure surfaced by persisters, query services and change-set sync.
#[derive(Debug)]
pub enum AdapterError {
    /// Requested identifier does not resolve.
    NotFound { id: Identifier },
    /// Backend rejected or could not perform the operation.
    Storage(StorageFailure),
    /// Stored data does not match the declared resource shape.
    CorruptData(String),
    /// Call deadline expired before the backend answered.
    Timeout { operation: &'static str },
    /// Caller broke an operation precondition.
    Precondition(String),
}

/// Backend-level cause behind `AdapterError::Storage`.
#[derive(Debug)]
pub enum StorageFailure {
    Db(DbError),
    SchemaMismatch(ShapeError),
    /// Write conflicts with data already stored under the identifier.
    Constraint(String),
    Encode(String),
    Unavailable(String),
}

impl Display for AdapterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { id } => write!(f, "resource not found: {id}"),
            Self::Storage(failure) => write!(f, "storage failure: {failure}"),
            Self::CorruptData(message) => write!(f, "corrupt stored resource: {message}"),
            Self::Timeout { operation } => write!(f, "deadline exceeded during {operation}"),
            Self::Precondition(message) => write!(f, "precondition failed: {message}"),
        }
    }
}

impl Error for AdapterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(failure) => Some(failure),
            Self::NotFound { .. }
            | Self::CorruptData(_)
            | Self::Timeout { .. }
            | Self::Precondition(_) => None,
        }
    }
}

impl Display for StorageFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::SchemaMismatch(err) => write!(f, "schema mismatch: {err}"),
            Self::Constraint(message) => write!(f, "constraint violation: {message}"),
            Self::Encode(message) => write!(f, "failed to encode resource: {message}"),
            Self::Unavailable(message) => write!(f, "backend unavailable: {message}"),
        }
    }
}

impl Error for StorageFailure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::SchemaMismatch(err) => Some(err),
            Self::Constraint(_) | Self::Encode(_) | Self::Unavailable(_) => None,
        }
    }
}

impl From<StorageFailure> for AdapterError {
    fn from(value: StorageFailure) -> Self {
        Self::Storage(value)
    }
}

impl From<DbError> for AdapterError {
    fn from(value: DbError) -> Self {
        Self::Storage(StorageFailure::Db(value))
    }
}

impl From<rusqlite::Error> for AdapterError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(StorageFailure::Db(DbError::Sqlite(value)))
    }
}

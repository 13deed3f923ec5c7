//! Backend-portable resource identifier.
//!
//! # Responsibility
//! - Reference resources and express has-many relations without leaking
//!   backend keys.
//!
//! # Invariants
//! - An `Identifier` is never empty or whitespace-only.
//! - Identifiers are immutable once constructed.

use serde::{Deserialize, Deserializer, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Opaque, comparable resource key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Identifier(String);

/// Rejected identifier text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidIdentifier;

impl Display for InvalidIdentifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "identifier must not be blank")
    }
}

impl Error for InvalidIdentifier {}

impl Identifier {
    /// Wraps caller-provided text verbatim; only blank text is rejected.
    pub fn new(value: impl AsRef<str>) -> Result<Self, InvalidIdentifier> {
        let value = value.as_ref();
        if value.trim().is_empty() {
            return Err(InvalidIdentifier);
        }
        Ok(Self(value.to_string()))
    }

    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Identifier {
    type Err = InvalidIdentifier;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::new(value)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Identifier::new(raw).map_err(serde::de::Error::custom)
    }
}

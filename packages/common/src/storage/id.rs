use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::StorageError;

/// Identifier of a stored blob.
///
/// Generated as a UUIDv7 when a write is opened.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobId(Uuid);

impl BlobId {
    /// Allocate a fresh identifier.
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn into_uuid(self) -> Uuid {
        self.0
    }

    /// Parse the hyphenated or simple textual form.
    pub fn parse(s: &str) -> Result<Self, StorageError> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| StorageError::InvalidId(format!("{s:?}: {e}")))
    }

    /// Two hex characters used as the shard directory.
    ///
    /// Taken from the last byte: the leading bytes of a UUIDv7 are a
    /// timestamp and would put every recent blob in the same shard.
    pub fn shard_prefix(&self) -> String {
        hex::encode(&self.0.as_bytes()[15..])
    }
}

impl FromStr for BlobId {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobId({})", self.0)
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl Serialize for BlobId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for BlobId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

//! Storage listing (`/nodes/{node}/storage/`).

use super::{decode_envelope, null_as_default, DecodeError};
use serde::Deserialize;

/// A storage volume as reported by the upstream API.
///
/// Capacities are kept as reported; the upstream defines their unit and
/// negative values are passed through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DatastoreRecord {
    /// Storage identifier, unique within a node.
    #[serde(rename = "storage", deserialize_with = "null_as_default")]
    pub name: String,
    /// Whether the storage is currently active (1) or not (0).
    #[serde(deserialize_with = "null_as_default")]
    pub active: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub total: i64,
    #[serde(rename = "avail", deserialize_with = "null_as_default")]
    pub available: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub used: i64,
}

/// Decodes a storage listing payload.
pub fn decode_datastore_list(bytes: &[u8]) -> Result<Vec<DatastoreRecord>, DecodeError> {
    decode_envelope("datastore", bytes)
}

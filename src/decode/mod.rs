//! Upstream response decoding.
//!
//! The Proxmox API wraps every listing in a `{"data": [...]}` envelope.
//! This module turns those payloads into typed record sequences. Decoding
//! is deliberately lenient about record contents (missing or `null` fields default
//! to zero, unknown fields are ignored, values are never range-checked) and
//! strict about the envelope shape.

mod datastore;
mod vm;

pub use datastore::{decode_datastore_list, DatastoreRecord};
pub use vm::{decode_vm_list, VirtualMachineRecord};

use serde::de::{self, DeserializeOwned, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::marker::PhantomData;
use thiserror::Error;

/// Errors that can occur while decoding an upstream payload.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed {kind} payload: {source}")]
    Json {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// The `{"data": [...]}` envelope shared by all listing endpoints.
///
/// Only a JSON object is accepted at the top level. `data` is required,
/// but the upstream reports an empty node as `"data": null`, which decodes
/// to an empty list.
#[derive(Debug)]
struct Envelope<T> {
    data: Vec<T>,
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Envelope<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(EnvelopeVisitor(PhantomData))
    }
}

struct EnvelopeVisitor<T>(PhantomData<T>);

impl<'de, T: Deserialize<'de>> Visitor<'de> for EnvelopeVisitor<T> {
    type Value = Envelope<T>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object with a `data` array")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut data = None;
        while let Some(key) = map.next_key::<String>()? {
            if key == "data" {
                if data.is_some() {
                    return Err(de::Error::duplicate_field("data"));
                }
                data = Some(map.next_value::<Option<Vec<T>>>()?.unwrap_or_default());
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        let data = data.ok_or_else(|| de::Error::missing_field("data"))?;
        Ok(Envelope { data })
    }
}

fn decode_envelope<T: DeserializeOwned>(
    kind: &'static str,
    bytes: &[u8],
) -> Result<Vec<T>, DecodeError> {
    serde_json::from_slice::<Envelope<T>>(bytes)
        .map(|envelope| envelope.data)
        .map_err(|source| DecodeError::Json { kind, source })
}

/// Reads a record field, mapping JSON `null` to the field's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Item {
        id: u32,
    }

    #[test]
    fn test_envelope_requires_data() {
        let err = decode_envelope::<Item>("item", br#"{"items": []}"#).unwrap_err();
        assert!(err.to_string().contains("missing field `data`"));
    }

    #[test]
    fn test_envelope_null_data_is_empty() {
        let items = decode_envelope::<Item>("item", br#"{"data": null}"#).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_envelope_rejects_non_object() {
        assert!(decode_envelope::<Item>("item", b"[1, 2, 3]").is_err());
        assert!(decode_envelope::<Item>("item", b"\"data\"").is_err());
        assert!(decode_envelope::<Item>("item", br#"[[{"id": 1}]]"#).is_err());
    }

    #[test]
    fn test_envelope_ignores_other_keys() {
        let items =
            decode_envelope::<Item>("item", br#"{"meta": {"x": 1}, "data": [{"id": 7}]}"#)
                .unwrap();
        assert_eq!(items, vec![Item { id: 7 }]);
    }

    #[test]
    fn test_null_field_reads_as_default() {
        #[derive(Debug, Default, Deserialize, PartialEq)]
        #[serde(default)]
        struct Named {
            #[serde(deserialize_with = "null_as_default")]
            name: String,
            #[serde(deserialize_with = "null_as_default")]
            size: u64,
        }

        let payload = br#"{"data": [{"name": null, "size": 3}, {"size": null}]}"#;
        let items = decode_envelope::<Named>("item", payload).unwrap();
        assert_eq!(
            items,
            vec![
                Named { name: String::new(), size: 3 },
                Named::default(),
            ]
        );
    }

    #[test]
    fn test_error_names_payload_kind() {
        let err = decode_envelope::<Item>("item", b"{").unwrap_err();
        assert!(err.to_string().starts_with("malformed item payload"));
    }
}

//! Versioned account payload codec.
//!
//! Stored payloads are JSON objects carrying a `schema` field alongside the
//! [`AccountData`] body:
//!
//! ```text
//! {"schema": 1, "devices": [...], "identityKey": "...", ...}
//! ```
//!
//! Readers accept any schema up to [`PAYLOAD_SCHEMA_VERSION`] and ignore
//! unknown fields. Payloads written before the envelope existed have no
//! `schema` field and decode as schema 1.

use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

use crate::account::AccountData;

/// Schema version written by this build.
pub const PAYLOAD_SCHEMA_VERSION: u16 = 1;

/// Error type for codec operations.
#[derive(Debug, Snafu)]
pub enum CodecError {
    /// Encoding failed.
    #[snafu(display("Encoding failed: {source}"))]
    Encode {
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// Decoding failed.
    #[snafu(display("Decoding failed: {source}"))]
    Decode {
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// Payload was written by a newer schema than this build understands.
    #[snafu(display("Unsupported payload schema {found} (newest supported: {supported})"))]
    UnsupportedSchema {
        /// Schema found in the payload.
        found: u16,
        /// Newest schema this build reads.
        supported: u16,
    },
}

#[derive(Serialize)]
struct EnvelopeOut<'a> {
    schema: u16,
    #[serde(flatten)]
    data: &'a AccountData,
}

#[derive(Deserialize)]
struct EnvelopeHeader {
    #[serde(default = "legacy_schema")]
    schema: u16,
}

fn legacy_schema() -> u16 {
    1
}

/// Encodes an account payload with the current schema version.
///
/// # Errors
///
/// Returns `CodecError::Encode` if serialization fails.
pub fn encode_payload(data: &AccountData) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(&EnvelopeOut { schema: PAYLOAD_SCHEMA_VERSION, data }).context(EncodeSnafu)
}

/// Decodes an account payload.
///
/// # Errors
///
/// Returns `CodecError::Decode` for malformed JSON and
/// `CodecError::UnsupportedSchema` for payloads from a newer schema.
pub fn decode_payload(bytes: &[u8]) -> Result<AccountData, CodecError> {
    let header: EnvelopeHeader = serde_json::from_slice(bytes).context(DecodeSnafu)?;
    if header.schema > PAYLOAD_SCHEMA_VERSION {
        return UnsupportedSchemaSnafu { found: header.schema, supported: PAYLOAD_SCHEMA_VERSION }
            .fail();
    }
    serde_json::from_slice(bytes).context(DecodeSnafu)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::account::Device;

    #[test]
    fn test_payload_carries_schema_version() {
        let bytes = encode_payload(&AccountData::default()).expect("encode");
        let value: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(value["schema"], PAYLOAD_SCHEMA_VERSION);
        assert_eq!(value["inCds"], true);
    }

    #[test]
    fn test_roundtrip_with_devices() {
        let data = AccountData {
            devices: vec![Device::new(1), Device { name: Some("tablet".into()), ..Device::new(2) }],
            identity_key: Some("key".into()),
            unidentified_access_key: Some(vec![1, 2, 3]),
            ..AccountData::default()
        };
        let decoded = decode_payload(&encode_payload(&data).expect("encode")).expect("decode");
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_legacy_payload_without_schema_decodes() {
        let legacy = br#"{"devices":[{"id":1,"enabled":true}],"name":"n","inCds":false}"#;
        let decoded = decode_payload(legacy).expect("legacy payload");
        assert_eq!(decoded.devices.len(), 1);
        assert_eq!(decoded.profile_name.as_deref(), Some("n"));
        assert!(!decoded.discoverable_by_login);
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let payload = br#"{"schema":1,"devices":[],"futureField":{"x":1}}"#;
        assert!(decode_payload(payload).is_ok());
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let payload = br#"{"schema":9,"devices":[]}"#;
        let err = decode_payload(payload).unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedSchema { found: 9, supported: 1 }));
    }

    #[test]
    fn test_decode_malformed_input() {
        let err = decode_payload(&[0xFF, 0xFF]).unwrap_err();
        assert!(matches!(err, CodecError::Decode { .. }));
        assert!(err.to_string().starts_with("Decoding failed:"));
    }
}

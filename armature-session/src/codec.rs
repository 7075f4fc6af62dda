//! Encoding of session values into the record payload.

use crate::error::{SessionError, SessionResult};
use serde_json::Value;
use std::collections::HashMap;

/// In-memory session values.
pub type SessionValues = HashMap<String, Value>;

/// Converts session values to and from the string stored in a record.
pub trait ValueCodec: Send + Sync + std::fmt::Debug {
    /// Encode values for storage. An empty map must encode to an empty string.
    fn encode(&self, values: &SessionValues) -> SessionResult<String>;

    /// Decode a stored payload. An empty payload decodes to an empty map.
    fn decode(&self, payload: &str) -> SessionResult<SessionValues>;
}

/// JSON object codec backed by `serde_json`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl ValueCodec for JsonCodec {
    fn encode(&self, values: &SessionValues) -> SessionResult<String> {
        if values.is_empty() {
            return Ok(String::new());
        }

        serde_json::to_string(values).map_err(|e| SessionError::Serialization(e.to_string()))
    }

    fn decode(&self, payload: &str) -> SessionResult<SessionValues> {
        if payload.is_empty() {
            return Ok(SessionValues::new());
        }

        let values: Option<SessionValues> =
            serde_json::from_str(payload).map_err(|e| SessionError::Decode(e.to_string()))?;

        Ok(values.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_map_encodes_to_empty_string() {
        assert_eq!(JsonCodec.encode(&SessionValues::new()).unwrap(), "");
    }

    #[test]
    fn test_encode_nested_values() {
        let mut values = SessionValues::new();
        values.insert("cart".to_string(), json!({"items": [1, 2, 3], "total": 9.5}));

        let payload = JsonCodec.encode(&values).unwrap();
        assert_eq!(payload, r#"{"cart":{"items":[1,2,3],"total":9.5}}"#);
        assert_eq!(JsonCodec.decode(&payload).unwrap(), values);
    }

    #[test]
    fn test_empty_and_null_payloads_decode_to_empty_map() {
        assert!(JsonCodec.decode("").unwrap().is_empty());
        assert!(JsonCodec.decode("null").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_payload_is_decode_error() {
        assert!(JsonCodec.decode("{\"theme\":").unwrap_err().is_decode());
        assert!(JsonCodec.decode("[1, 2]").unwrap_err().is_decode());
        assert!(JsonCodec.decode("not json").unwrap_err().is_decode());
    }
}

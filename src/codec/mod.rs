//! Codec boundary between structured messages and frame payloads.
//!
//! Everything above this module deals in typed messages, everything below it
//! in opaque byte payloads. Messages are serialized as JSON; byte-string
//! fields travel base64-encoded (see [`base64_bytes`]).

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// Encode a message into a frame payload.
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(message)?)
}

/// Decode a frame payload into a message of the expected type.
pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(payload)?)
}

/// Serde adapter carrying `Vec<u8>` fields as standard base64 strings.
pub mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize bytes as a base64 string.
    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    /// Deserialize bytes from a base64 string.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Blob {
        #[serde(with = "base64_bytes")]
        data: Vec<u8>,
    }

    #[test]
    fn test_bytes_are_base64_on_the_wire() {
        let payload = encode(&Blob {
            data: b"hello".to_vec(),
        })
        .unwrap();
        assert_eq!(payload, br#"{"data":"aGVsbG8="}"#);

        let blob: Blob = decode(&payload).unwrap();
        assert_eq!(blob.data, b"hello");
    }

    #[test]
    fn test_empty_bytes_survive() {
        let payload = encode(&Blob { data: Vec::new() }).unwrap();
        let blob: Blob = decode(&payload).unwrap();
        assert!(blob.data.is_empty());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode::<Blob>(b"\xff\x00not json").is_err());
        assert!(decode::<Blob>(br#"{"data":"***"}"#).is_err());
    }
}

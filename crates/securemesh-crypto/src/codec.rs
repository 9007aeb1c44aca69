//! Value serialization to opaque byte blocks
//!
//! Uses bincode with fixed-width integers. Both ends of a connection must
//! run the same codec; there is no version negotiation.

use crate::error::{CryptoError, Result};
use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Upper bound on a single decoded value
pub const MAX_VALUE_SIZE: u64 = 16 * 1024 * 1024;

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_VALUE_SIZE)
        .reject_trailing_bytes()
}

/// Serialize a value into an opaque block
pub fn serialize<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    options()
        .serialize(value)
        .map_err(|e| CryptoError::Serialization(e.to_string()))
}

/// Deserialize a block produced by [`serialize`]
pub fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    options()
        .deserialize(bytes)
        .map_err(|e| CryptoError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Endpoint {
        host: String,
        port: u16,
    }

    #[test]
    fn test_primitives() {
        assert_eq!(deserialize::<String>(&serialize("pong").unwrap()).unwrap(), "pong");
        assert!(deserialize::<bool>(&serialize(&true).unwrap()).unwrap());
        assert_eq!(deserialize::<u16>(&serialize(&9000u16).unwrap()).unwrap(), 9000);
    }

    #[test]
    fn test_nested_map() {
        let mut peers = BTreeMap::new();
        peers.insert(
            "master".to_string(),
            Endpoint {
                host: "localhost".to_string(),
                port: 9000,
            },
        );
        peers.insert(
            "a1b2".to_string(),
            Endpoint {
                host: "10.0.0.7".to_string(),
                port: 41234,
            },
        );

        let bytes = serialize(&peers).unwrap();
        let decoded: BTreeMap<String, Endpoint> = deserialize(&bytes).unwrap();
        assert_eq!(decoded, peers);
    }

    #[test]
    fn test_truncated_input_fails() {
        let bytes = serialize("a longer string value").unwrap();
        assert!(matches!(
            deserialize::<String>(&bytes[..bytes.len() - 3]),
            Err(CryptoError::Serialization(_))
        ));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = serialize(&42u32).unwrap();
        bytes.push(0);
        assert!(deserialize::<u32>(&bytes).is_err());
    }

    #[test]
    fn test_oversized_length_prefix_rejected() {
        // Claims a u64::MAX-long string
        let bytes = [0xFFu8; 8];
        assert!(deserialize::<String>(&bytes).is_err());
    }
}

//! Solana public keys.
//!
//! A Solana address is the Base58 encoding of a raw 32-byte Ed25519 public
//! key. There is no hashing step; the key bytes are the address bytes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TettoError;

/// A 32-byte Solana public key.
///
/// Serializes as a Base58 address string, which is how every marketplace
/// and RPC payload carries keys on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pubkey(pub [u8; 32]);

impl Pubkey {
    /// Parse a Base58 address string into a key.
    pub fn from_base58(address: &str) -> Result<Self, TettoError> {
        let bytes = bs58::decode(address)
            .into_vec()
            .map_err(|e| TettoError::InvalidAddress(format!("base58 decode failed: {e}")))?;
        let arr: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            TettoError::InvalidAddress(format!("expected 32 bytes, got {}", v.len()))
        })?;
        Ok(Self(arr))
    }

    /// Base58 address string for this key.
    pub fn to_base58(&self) -> String {
        bs58::encode(&self.0).into_string()
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl FromStr for Pubkey {
    type Err = TettoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base58(s)
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pubkey({})", self.to_base58())
    }
}

impl Serialize for Pubkey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for Pubkey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Pubkey::from_base58(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_program_is_all_ones_string() {
        let zeros = Pubkey([0u8; 32]);
        assert_eq!(zeros.to_base58(), "11111111111111111111111111111111");
    }

    #[test]
    fn roundtrip_known_address() {
        let address = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
        let key = Pubkey::from_base58(address).unwrap();
        assert_eq!(key.to_base58(), address);
    }

    #[test]
    fn rejects_garbage() {
        assert!(Pubkey::from_base58("not-a-valid-address!!!").is_err());
    }

    #[test]
    fn rejects_wrong_length() {
        // "1" decodes to a single zero byte.
        let err = Pubkey::from_base58("1").unwrap_err();
        assert!(err.to_string().contains("expected 32 bytes"));
    }

    #[test]
    fn serde_as_base58_string() {
        let key = Pubkey::from_base58("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA").unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA\"");
        let back: Pubkey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }
}

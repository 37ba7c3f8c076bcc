//! 32-byte digest newtype.
//!
//! Every content-addressed record in the system (boxes, blocks, snapshot
//! versions) is keyed by one of these. The canonical text form is base58,
//! which is also the wire-JSON form.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Digest length in bytes.
pub const DIGEST_LENGTH: usize = 32;

/// A 32-byte digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Hash([u8; DIGEST_LENGTH]);

/// Box ids are digests of box content.
pub type BoxId = Hash;

/// Error parsing the base58 text form of a [`Hash`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HashParseError {
    #[error("invalid base58: {0}")]
    InvalidBase58(String),

    #[error("invalid digest length: {0} bytes, expected {DIGEST_LENGTH}")]
    InvalidLength(usize),
}

impl Hash {
    pub const fn new(bytes: [u8; DIGEST_LENGTH]) -> Self {
        Hash(bytes)
    }

    pub const fn zero() -> Self {
        Hash([0u8; DIGEST_LENGTH])
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LENGTH] {
        &self.0
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, HashParseError> {
        let arr: [u8; DIGEST_LENGTH] = bytes
            .try_into()
            .map_err(|_| HashParseError::InvalidLength(bytes.len()))?;
        Ok(Hash(arr))
    }
}

impl From<[u8; DIGEST_LENGTH]> for Hash {
    fn from(bytes: [u8; DIGEST_LENGTH]) -> Self {
        Hash(bytes)
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl FromStr for Hash {
    type Err = HashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| HashParseError::InvalidBase58(e.to_string()))?;
        Hash::from_slice(&bytes)
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base58_round_trip() {
        let h = Hash::new([0xab; 32]);
        let text = h.to_base58();
        let parsed: Hash = text.parse().unwrap();
        assert_eq!(h, parsed);
    }

    #[test]
    fn from_slice_rejects_wrong_length() {
        assert_eq!(
            Hash::from_slice(&[0u8; 31]),
            Err(HashParseError::InvalidLength(31))
        );
        assert!(Hash::from_slice(&[0u8; 32]).is_ok());
    }

    #[test]
    fn serde_uses_base58_string() {
        let h = Hash::new([7u8; 32]);
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{}\"", h.to_base58()));
        let back: Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(h, back);
    }
}

//! Ed25519 key and signature types.
//!
//! Raw 32/64-byte wrappers. Verification goes through `verify_strict` so
//! that malleable or small-order signatures are rejected. The wire form of
//! both types is a base58 string.

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::{Signature, VerifyingKey};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Ed25519 public key length in bytes.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Ed25519 signature length in bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// Error decoding a key or signature from its text form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("invalid base58: {0}")]
    InvalidBase58(String),

    #[error("invalid length: {actual} bytes, expected {expected}")]
    InvalidLength { expected: usize, actual: usize },
}

/// A 32-byte Ed25519 public key, acting as the single-key proposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PublicKey25519(pub [u8; PUBLIC_KEY_LENGTH]);

impl PublicKey25519 {
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.0
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }

    /// Verify `signature` over `message` under this key.
    ///
    /// Bytes that do not decode to a curve point verify nothing, so this
    /// returns `false` rather than a distinct error.
    pub fn verify(&self, message: &[u8], signature: &Signature25519) -> bool {
        match VerifyingKey::from_bytes(&self.0) {
            Ok(vk) => vk
                .verify_strict(message, &Signature::from_bytes(&signature.0))
                .is_ok(),
            Err(_) => false,
        }
    }
}

impl fmt::Display for PublicKey25519 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl FromStr for PublicKey25519 {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = decode_base58(s, PUBLIC_KEY_LENGTH)?;
        let mut arr = [0u8; PUBLIC_KEY_LENGTH];
        arr.copy_from_slice(&bytes);
        Ok(PublicKey25519(arr))
    }
}

impl Serialize for PublicKey25519 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for PublicKey25519 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// A 64-byte Ed25519 signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature25519(pub [u8; SIGNATURE_LENGTH]);

impl Signature25519 {
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.0
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

impl fmt::Display for Signature25519 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl FromStr for Signature25519 {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = decode_base58(s, SIGNATURE_LENGTH)?;
        let mut arr = [0u8; SIGNATURE_LENGTH];
        arr.copy_from_slice(&bytes);
        Ok(Signature25519(arr))
    }
}

impl Serialize for Signature25519 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for Signature25519 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

fn decode_base58(s: &str, expected: usize) -> Result<Vec<u8>, KeyError> {
    let bytes = bs58::decode(s)
        .into_vec()
        .map_err(|e| KeyError::InvalidBase58(e.to_string()))?;
    if bytes.len() != expected {
        return Err(KeyError::InvalidLength {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    fn keypair(seed: u8) -> (SigningKey, PublicKey25519) {
        // Deterministic secret key for tests (no RNG).
        let sk = SigningKey::from_bytes(&[seed; 32]);
        let pk = PublicKey25519(sk.verifying_key().to_bytes());
        (sk, pk)
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let (sk, pk) = keypair(7);
        let msg = b"box contents";
        let sig = Signature25519(sk.sign(msg).to_bytes());

        assert!(pk.verify(msg, &sig));
        assert!(!pk.verify(b"other contents", &sig));
    }

    #[test]
    fn any_flipped_signature_bit_fails() {
        let (sk, pk) = keypair(9);
        let msg = b"payload";
        let sig = sk.sign(msg).to_bytes();

        for byte in 0..SIGNATURE_LENGTH {
            for bit in 0..8 {
                let mut tampered = sig;
                tampered[byte] ^= 1 << bit;
                assert!(
                    !pk.verify(msg, &Signature25519(tampered)),
                    "flipping byte {byte} bit {bit} still verified"
                );
            }
        }
    }

    #[test]
    fn wrong_key_fails() {
        let (sk, _) = keypair(1);
        let (_, other_pk) = keypair(2);
        let sig = Signature25519(sk.sign(b"m").to_bytes());
        assert!(!other_pk.verify(b"m", &sig));
    }

    #[test]
    fn non_canonical_key_bytes_verify_nothing() {
        let bogus = PublicKey25519([0xff; 32]);
        let (sk, _) = keypair(3);
        let sig = Signature25519(sk.sign(b"m").to_bytes());
        assert!(!bogus.verify(b"m", &sig));
    }

    #[test]
    fn base58_text_round_trip() {
        let (_, pk) = keypair(4);
        let parsed: PublicKey25519 = pk.to_base58().parse().unwrap();
        assert_eq!(pk, parsed);

        let err = "3yZe7d".parse::<PublicKey25519>().unwrap_err();
        assert!(matches!(err, KeyError::InvalidLength { .. }));
    }
}

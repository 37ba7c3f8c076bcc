//! M-of-N threshold proposition.
//!
//! A box locked by `MofNProposition` opens when at least `m` of the supplied
//! signatures verify, each under a distinct key from the set. Contract boxes
//! produced by this engine always carry `(1, 3)`, but the general form is
//! kept for forward compatibility.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::keys::{PublicKey25519, Signature25519, PUBLIC_KEY_LENGTH};

/// Error constructing a threshold proposition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PropositionError {
    #[error("invalid threshold: m={m}, n={n}")]
    InvalidThreshold { m: u32, n: usize },
}

/// M-of-N locking predicate over a set of Ed25519 keys.
///
/// The key set is ordered (ascending byte order), which makes the canonical
/// encoding deterministic without an explicit sort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MofNProposition {
    m: u32,
    keys: BTreeSet<PublicKey25519>,
}

impl MofNProposition {
    /// Build a threshold proposition; requires `1 <= m <= |keys|`.
    pub fn new(
        m: u32,
        keys: impl IntoIterator<Item = PublicKey25519>,
    ) -> Result<Self, PropositionError> {
        let keys: BTreeSet<PublicKey25519> = keys.into_iter().collect();
        if m == 0 || m as usize > keys.len() {
            return Err(PropositionError::InvalidThreshold { m, n: keys.len() });
        }
        Ok(MofNProposition { m, keys })
    }

    pub fn threshold(&self) -> u32 {
        self.m
    }

    pub fn keys(&self) -> impl Iterator<Item = &PublicKey25519> {
        self.keys.iter()
    }

    pub fn contains(&self, key: &PublicKey25519) -> bool {
        self.keys.contains(key)
    }

    /// Canonical encoding: `u32_be(m) || u32_be(n) || n * pub(32)`,
    /// keys in ascending byte order.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + self.keys.len() * PUBLIC_KEY_LENGTH);
        out.extend_from_slice(&self.m.to_be_bytes());
        out.extend_from_slice(&(self.keys.len() as u32).to_be_bytes());
        for key in &self.keys {
            out.extend_from_slice(key.as_bytes());
        }
        out
    }

    /// True when at least `m` signatures verify, each under a distinct key.
    pub fn verify(&self, message: &[u8], signatures: &[Signature25519]) -> bool {
        let mut unused: BTreeSet<&PublicKey25519> = self.keys.iter().collect();
        let mut valid = 0u32;
        for signature in signatures {
            let matched = unused
                .iter()
                .find(|key| key.verify(message, signature))
                .copied();
            if let Some(key) = matched {
                unused.remove(key);
                valid += 1;
                if valid >= self.m {
                    return true;
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    fn keypair(seed: u8) -> (SigningKey, PublicKey25519) {
        let sk = SigningKey::from_bytes(&[seed; 32]);
        let pk = PublicKey25519(sk.verifying_key().to_bytes());
        (sk, pk)
    }

    #[test]
    fn one_of_three_accepts_any_member() {
        let (sk_a, pk_a) = keypair(1);
        let (sk_b, pk_b) = keypair(2);
        let (_, pk_c) = keypair(3);
        let prop = MofNProposition::new(1, [pk_a, pk_b, pk_c]).unwrap();

        let msg = b"method call";
        assert!(prop.verify(msg, &[Signature25519(sk_a.sign(msg).to_bytes())]));
        assert!(prop.verify(msg, &[Signature25519(sk_b.sign(msg).to_bytes())]));
    }

    #[test]
    fn outsider_signature_rejected() {
        let (_, pk_a) = keypair(1);
        let (_, pk_b) = keypair(2);
        let (_, pk_c) = keypair(3);
        let (sk_x, _) = keypair(9);
        let prop = MofNProposition::new(1, [pk_a, pk_b, pk_c]).unwrap();

        let msg = b"method call";
        assert!(!prop.verify(msg, &[Signature25519(sk_x.sign(msg).to_bytes())]));
    }

    #[test]
    fn threshold_requires_distinct_keys() {
        let (sk_a, pk_a) = keypair(1);
        let (_, pk_b) = keypair(2);
        let prop = MofNProposition::new(2, [pk_a, pk_b]).unwrap();

        let msg = b"two of two";
        let sig_a = Signature25519(sk_a.sign(msg).to_bytes());
        // The same valid signature twice only consumes one key.
        assert!(!prop.verify(msg, &[sig_a, sig_a]));
    }

    #[test]
    fn invalid_threshold_rejected() {
        let (_, pk) = keypair(1);
        assert!(matches!(
            MofNProposition::new(0, [pk]),
            Err(PropositionError::InvalidThreshold { m: 0, n: 1 })
        ));
        assert!(matches!(
            MofNProposition::new(2, [pk]),
            Err(PropositionError::InvalidThreshold { m: 2, n: 1 })
        ));
    }

    #[test]
    fn encoding_is_sorted_and_sized() {
        let (_, pk_a) = keypair(5);
        let (_, pk_b) = keypair(6);
        let (_, pk_c) = keypair(7);
        let prop = MofNProposition::new(1, [pk_c, pk_a, pk_b]).unwrap();

        let encoded = prop.encode();
        assert_eq!(encoded.len(), 8 + 3 * PUBLIC_KEY_LENGTH);
        assert_eq!(&encoded[0..4], &1u32.to_be_bytes());
        assert_eq!(&encoded[4..8], &3u32.to_be_bytes());

        // Insertion order must not matter.
        let again = MofNProposition::new(1, [pk_a, pk_b, pk_c]).unwrap();
        assert_eq!(encoded, again.encode());

        // Key blocks appear in ascending byte order.
        let blocks: Vec<&[u8]> = encoded[8..].chunks(PUBLIC_KEY_LENGTH).collect();
        let mut sorted = blocks.clone();
        sorted.sort();
        assert_eq!(blocks, sorted);
    }
}

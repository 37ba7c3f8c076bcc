//! Tresor cryptography package.
//!
//! Ed25519 keys and signatures, the protocol digest function, and the two
//! locking propositions used by the box model (single key and M-of-N).
//! Signing happens in the wallet; this crate only verifies.

pub mod hashing;
pub mod keys;
pub mod proposition;

pub use hashing::{digest, digest_parts};
pub use keys::{KeyError, PublicKey25519, Signature25519, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};
pub use proposition::{MofNProposition, PropositionError};

//! Scalar aliases shared across the workspace.
//!
//! These participate in consensus encodings; all of them serialize
//! big-endian where they enter a hash or the box codec.

/// Fungible token quantity (poly or arbit).
pub type Amount = u64;

/// Box nonce, part of id derivation.
pub type Nonce = u64;

/// Milliseconds since the UNIX epoch.
pub type Timestamp = u64;

//! Protocol digest function.
//!
//! Every id and signed message in the system is a Blake3-256 digest of
//! canonical bytes. Changing this function is a hard fork.

use lib_types::Hash;

/// Digest a single byte string.
pub fn digest(data: &[u8]) -> Hash {
    Hash::new(*blake3::hash(data).as_bytes())
}

/// Digest the concatenation of `parts` without materializing it.
pub fn digest_parts(parts: &[&[u8]]) -> Hash {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    Hash::new(*hasher.finalize().as_bytes())
}

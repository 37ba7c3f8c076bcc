//! Tresor box model.
//!
//! Boxes are the unit of state: UTXO-like records addressed by a content
//! hash. This crate owns the four box variants, their stable id derivation,
//! and the canonical byte codec the store persists.
//!
//! # Key Rules
//!
//! 1. **Ids are content hashes**: equality and store keys both derive from
//!    the canonical encoding, never from object identity.
//! 2. **One encoding**: every id computation goes through [`codec`]; there
//!    is no second serializer to drift.
//! 3. **Profiles are field-pinned**: a profile box id hashes `(key, field)`
//!    only, so one box can exist per pair regardless of value.

pub mod codec;
pub mod errors;
pub mod types;

pub use codec::{canonical_json, decode_box, encode_box};
pub use errors::{CodecError, CodecResult};
pub use types::{ArbitBox, ContractBox, PolyBox, ProfileBox, StateBox};

//! Tresor versioned box store.
//!
//! Sled is the only storage backend. The current box set, the undo
//! journal, the version index and the head pointer share one tree under
//! prefixed keys; a snapshot is just a named position in the journal, so
//! rolling back to any ancestor replays prior values without touching
//! untouched keys.
//!
//! # Guarantees
//!
//! - `update` is atomic: every key moves in one sled batch, flushed
//!   before returning. A crash mid-commit leaves the previous snapshot.
//! - `get` reads the latest committed snapshot.
//! - `rollback` to the current head is a no-op.

pub mod errors;
pub mod store;

pub use errors::{StoreError, StoreResult};
pub use store::{timestamp_key, VersionedBoxStore};

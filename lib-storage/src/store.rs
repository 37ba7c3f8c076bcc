//! Sled-backed versioned box store.
//!
//! Everything lives in a single tree under prefixed keys, so one
//! `apply_batch` moves the box set, the undo journal, the version index and
//! the head pointer together. Sled applies a batch atomically, which makes
//! a half-applied commit impossible.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sled::{Batch, Db, Tree};
use tracing::{debug, info};

use lib_crypto::digest;
use lib_types::{Hash, Timestamp};

use crate::errors::{StoreError, StoreResult};

const TREE_STATE: &str = "state";

// =============================================================================
// KEY LAYOUT (FIXED - DO NOT CHANGE)
// =============================================================================
// Prefixes are protocol-adjacent. Changing them orphans existing stores.
// =============================================================================

mod keys {
    use lib_types::Hash;

    pub const HEAD_SEQ: &[u8] = b"meta:head_seq";

    pub fn box_key(id: &Hash) -> Vec<u8> {
        let mut key = Vec::with_capacity(4 + 32);
        key.extend_from_slice(b"box:");
        key.extend_from_slice(id.as_bytes());
        key
    }

    pub fn undo_key(seq: u64) -> Vec<u8> {
        let mut key = Vec::with_capacity(5 + 8);
        key.extend_from_slice(b"undo:");
        key.extend_from_slice(&seq.to_be_bytes());
        key
    }

    pub fn version_key(version: &Hash) -> Vec<u8> {
        let mut key = Vec::with_capacity(4 + 32);
        key.extend_from_slice(b"ver:");
        key.extend_from_slice(version.as_bytes());
        key
    }
}

/// Key of the state-timestamp sentinel: `H("timestamp")`.
///
/// Every commit writes the block timestamp under this key, so the engine
/// can recover its clock from the box set alone after a restart.
pub fn timestamp_key() -> Hash {
    digest(b"timestamp")
}

/// Journal entry for one committed version: the prior value of every key
/// the commit touched. Restoring them in reverse commit order is rollback.
#[derive(Serialize, Deserialize)]
struct UndoRecord {
    version: [u8; 32],
    prior: Vec<(Vec<u8>, Option<Vec<u8>>)>,
}

/// Content-addressed box set with named snapshots and rollback.
///
/// One instance per node. Sled keeps point reads consistent from any
/// thread while the single writer commits.
pub struct VersionedBoxStore {
    db: Db,
    state: Tree,
}

impl std::fmt::Debug for VersionedBoxStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionedBoxStore")
            .field("head", &self.last_version_id().ok().flatten())
            .finish_non_exhaustive()
    }
}

impl VersionedBoxStore {
    /// Open or create a store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Self::from_db(sled::open(path)?)
    }

    /// Open a throwaway in-memory store (for tests).
    pub fn open_temporary() -> StoreResult<Self> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        let state = db.open_tree(TREE_STATE)?;
        Ok(VersionedBoxStore { db, state })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Point read against the latest committed snapshot.
    pub fn get(&self, id: &Hash) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.state.get(keys::box_key(id))?.map(|ivec| ivec.to_vec()))
    }

    pub fn contains(&self, id: &Hash) -> StoreResult<bool> {
        Ok(self.state.contains_key(keys::box_key(id))?)
    }

    /// Id of the latest committed snapshot, `None` for an empty store.
    pub fn last_version_id(&self) -> StoreResult<Option<Hash>> {
        let head = self.head_seq()?;
        if head == 0 {
            return Ok(None);
        }
        let record = self.undo_record(head)?;
        Ok(Some(Hash::new(record.version)))
    }

    /// The committed state timestamp, read from the sentinel key.
    pub fn state_timestamp(&self) -> StoreResult<Option<Timestamp>> {
        match self.state.get(keys::box_key(&timestamp_key()))? {
            Some(bytes) => {
                let arr: [u8; 8] = bytes.as_ref().try_into().map_err(|_| {
                    StoreError::CorruptedData("timestamp sentinel length".to_string())
                })?;
                Ok(Some(u64::from_be_bytes(arr)))
            }
            None => Ok(None),
        }
    }

    /// Whether `version` names a committed snapshot.
    pub fn knows_version(&self, version: &Hash) -> StoreResult<bool> {
        Ok(self.state.contains_key(keys::version_key(version))?)
    }

    // =========================================================================
    // Commits
    // =========================================================================

    /// Commit a new snapshot: remove `remove`, insert `append`, stamp the
    /// timestamp sentinel. Atomic; flushed before returning.
    pub fn update(
        &self,
        new_version: Hash,
        timestamp: Timestamp,
        remove: &[Hash],
        append: &[(Hash, Vec<u8>)],
    ) -> StoreResult<()> {
        if self.knows_version(&new_version)? {
            return Err(StoreError::VersionExists(new_version));
        }

        // Prior value of every key this commit touches, deduplicated.
        let mut prior: BTreeMap<Vec<u8>, Option<Vec<u8>>> = BTreeMap::new();
        let mut record_prior = |key: Vec<u8>| -> StoreResult<()> {
            let old = self.state.get(&key)?.map(|v| v.to_vec());
            prior.insert(key, old);
            Ok(())
        };
        for id in remove {
            record_prior(keys::box_key(id))?;
        }
        for (id, _) in append {
            record_prior(keys::box_key(id))?;
        }
        record_prior(keys::box_key(&timestamp_key()))?;

        let seq = self.head_seq()? + 1;
        let record = UndoRecord {
            version: *new_version.as_bytes(),
            prior: prior.into_iter().collect(),
        };
        let record_bytes =
            bincode::serialize(&record).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut batch = Batch::default();
        for id in remove {
            batch.remove(keys::box_key(id));
        }
        for (id, bytes) in append {
            batch.insert(keys::box_key(id), bytes.as_slice());
        }
        batch.insert(
            keys::box_key(&timestamp_key()),
            &timestamp.to_be_bytes()[..],
        );
        batch.insert(keys::undo_key(seq), record_bytes);
        batch.insert(keys::version_key(&new_version), &seq.to_be_bytes()[..]);
        batch.insert(keys::HEAD_SEQ, &seq.to_be_bytes()[..]);

        self.state.apply_batch(batch)?;
        self.db.flush()?;

        debug!(
            version = %new_version,
            removed = remove.len(),
            appended = append.len(),
            timestamp,
            "committed snapshot"
        );
        Ok(())
    }

    /// Discard every snapshot strictly after `version`. A no-op when
    /// `version` is already the head; an error when it is unknown.
    pub fn rollback(&self, version: Hash) -> StoreResult<()> {
        let target_seq = match self.state.get(keys::version_key(&version))? {
            Some(bytes) => read_seq(&bytes)?,
            None => return Err(StoreError::UnknownVersion(version)),
        };
        let head = self.head_seq()?;
        if head == target_seq {
            return Ok(());
        }

        // Restore newest-first: after the walk every key holds the value it
        // had at `version`.
        let mut batch = Batch::default();
        let mut discarded = 0usize;
        for seq in (target_seq + 1..=head).rev() {
            let record = self.undo_record(seq)?;
            for (key, old) in record.prior {
                match old {
                    Some(value) => batch.insert(key, value),
                    None => batch.remove(key),
                }
            }
            batch.remove(keys::undo_key(seq));
            batch.remove(keys::version_key(&Hash::new(record.version)));
            discarded += 1;
        }
        batch.insert(keys::HEAD_SEQ, &target_seq.to_be_bytes()[..]);

        self.state.apply_batch(batch)?;
        self.db.flush()?;

        info!(version = %version, discarded, "rolled back");
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn head_seq(&self) -> StoreResult<u64> {
        match self.state.get(keys::HEAD_SEQ)? {
            Some(bytes) => read_seq(&bytes),
            None => Ok(0),
        }
    }

    fn undo_record(&self, seq: u64) -> StoreResult<UndoRecord> {
        let bytes = self
            .state
            .get(keys::undo_key(seq))?
            .ok_or_else(|| StoreError::CorruptedData(format!("missing journal entry {seq}")))?;
        bincode::deserialize(&bytes).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

fn read_seq(bytes: &[u8]) -> StoreResult<u64> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StoreError::CorruptedData("sequence length".to_string()))?;
    Ok(u64::from_be_bytes(arr))
}

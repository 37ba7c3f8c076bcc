//! Confirmed blocks as handed over by the block layer.

use serde::{Deserialize, Serialize};

use lib_types::{Hash, Timestamp};

use crate::transaction::Transaction;

/// A confirmed block: ordering and identity are the block layer's problem,
/// admissibility is ours. The id doubles as the snapshot version the block
/// commits under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: Hash,
    pub timestamp: Timestamp,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(id: Hash, timestamp: Timestamp, transactions: Vec<Transaction>) -> Self {
        Block {
            id,
            timestamp,
            transactions,
        }
    }
}

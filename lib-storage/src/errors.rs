//! Store errors. All fatal; the state engine propagates them unchanged.

use thiserror::Error;

use lib_types::Hash;

/// Error during store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("journal serialization error: {0}")]
    Serialization(String),

    #[error("unknown version: {0}")]
    UnknownVersion(Hash),

    #[error("version already committed: {0}")]
    VersionExists(Hash),

    #[error("corrupted store data: {0}")]
    CorruptedData(String),
}

impl From<sled::Error> for StoreError {
    fn from(e: sled::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

//! Error taxonomy for block and transaction admission.
//!
//! Kinds, top to bottom: `Malformed` (bytes or shape), `Semantic`
//! (stateless invariants), `State` (checks against the committed
//! snapshot), `Store` (fatal I/O). Contract method failures surface as
//! `State`: authorization is validated before dispatch, so a method
//! refusing at apply time means the referenced state disagrees with the
//! transaction.

use thiserror::Error;

use lib_contracts::{ContractError, Role};
use lib_crypto::PublicKey25519;
use lib_storage::StoreError;
use lib_types::{Amount, BoxId, Timestamp};

/// Stateless invariant violations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SemanticError {
    #[error("signature count mismatch: {actual} signatures for {expected} signers")]
    SignatureCountMismatch { expected: usize, actual: usize },

    #[error("invalid signature at index {0}")]
    InvalidSignature(usize),

    #[error("contract proposition not satisfied")]
    PropositionUnsatisfied,

    #[error("transaction has no inputs")]
    EmptyInputs,

    #[error("transaction has no outputs")]
    EmptyOutputs,

    #[error("parties must be exactly the three roles, each once")]
    IncompleteParties,

    #[error("party keys must be pairwise distinct")]
    DuplicatePartyKey,

    #[error("invalid agreement: {0}")]
    InvalidAgreement(String),

    #[error("unknown contract method: {0:?}")]
    UnknownMethod(String),

    #[error("invalid method parameters: {0}")]
    InvalidParameters(String),

    #[error("unsupported profile field: {0:?}")]
    UnsupportedProfileField(String),

    #[error("invalid profile role value: {0:?}")]
    InvalidProfileRole(String),

    #[error("profile transaction carries no entries")]
    EmptyProfile,

    #[error("value arithmetic overflow")]
    Overflow,
}

/// Violations visible only against the committed snapshot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("referenced box not found: {0}")]
    BoxNotFound(BoxId),

    #[error("box {id} is not a {expected}")]
    WrongBoxType { id: BoxId, expected: &'static str },

    #[error("signature does not open box {0}")]
    UnlockFailed(BoxId),

    #[error("box {0} removed more than once in one block")]
    DoubleSpend(BoxId),

    #[error("produced box id collides with live state: {0}")]
    IdCollision(BoxId),

    #[error("poly conservation violated: inputs={inputs}, outputs={outputs}, fee={fee}")]
    ValueMismatch {
        inputs: Amount,
        outputs: Amount,
        fee: Amount,
    },

    #[error("no role profile registered for {0}")]
    MissingProfile(PublicKey25519),

    #[error("profile role mismatch: claimed {claimed}, registered {registered:?}")]
    RoleMismatch { claimed: Role, registered: String },

    #[error("profile already exists for field {0:?}")]
    ProfileExists(String),

    #[error("timestamp {timestamp} not ahead of state {state}")]
    TimestampNotAhead {
        timestamp: Timestamp,
        state: Timestamp,
    },

    #[error("state timestamp {state} not behind wall clock {now}")]
    TimestampInFuture { state: Timestamp, now: Timestamp },

    #[error("contract execution failed: {0}")]
    ContractExecution(#[from] ContractError),
}

/// Top-level engine error.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("malformed: {0}")]
    Malformed(String),

    #[error("semantically invalid: {0}")]
    Semantic(#[from] SemanticError),

    #[error("state invalid: {0}")]
    State(#[from] StateError),

    #[error("store failure: {0}")]
    Store(#[from] StoreError),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

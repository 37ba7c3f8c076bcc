//! Tresor blockchain package.
//!
//! The authority over state transitions: four transaction kinds with
//! canonical signing payloads, per-block delta derivation, and atomic
//! apply/rollback against the versioned box store. Networking, consensus
//! and the API surface live elsewhere; this crate accepts a confirmed
//! block and decides "apply, or reject and why".

pub mod block;
pub mod state;
pub mod transaction;
pub mod validation;

pub use block::Block;
pub use state::{StateChanges, StateEngine};
pub use transaction::{
    ContractCreation, ContractMethodExecution, PartyEntry, PolyTransfer, ProfileTransaction,
    Transaction, TransferInput, TransferOutput,
};
pub use validation::errors::{EngineError, EngineResult, SemanticError, StateError};

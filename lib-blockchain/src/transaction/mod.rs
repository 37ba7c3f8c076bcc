//! Transaction model.
//!
//! Four kinds, each owning its canonical `message_to_sign` and its
//! stateless checks. Bit-stability of the signing payloads is
//! consensus-relevant: a reordered field is a hard fork.
//!
//! The wire form is JSON with base58 keys, signatures and ids, tagged by
//! `txType`.

pub mod contract_creation;
pub mod contract_execution;
pub mod poly_transfer;
pub mod profile;

use serde::{Deserialize, Serialize};

use lib_contracts::Role;
use lib_crypto::PublicKey25519;
use lib_types::{Amount, Timestamp};

use crate::validation::errors::SemanticError;

pub use contract_creation::ContractCreation;
pub use contract_execution::ContractMethodExecution;
pub use poly_transfer::{PolyTransfer, TransferInput, TransferOutput};
pub use profile::ProfileTransaction;

/// A role claimed by a specific key, as carried in contract transactions.
/// The claim is checked against the registered profile during stateful
/// validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyEntry {
    pub role: Role,
    pub key: PublicKey25519,
}

/// The closed set of transaction kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "txType")]
pub enum Transaction {
    PolyTransfer(PolyTransfer),
    ContractCreation(ContractCreation),
    ContractMethodExecution(ContractMethodExecution),
    ProfileTransaction(ProfileTransaction),
}

impl Transaction {
    pub fn fee(&self) -> Amount {
        match self {
            Transaction::PolyTransfer(tx) => tx.fee,
            Transaction::ContractCreation(tx) => tx.fee,
            Transaction::ContractMethodExecution(tx) => tx.fee,
            Transaction::ProfileTransaction(tx) => tx.fee,
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        match self {
            Transaction::PolyTransfer(tx) => tx.timestamp,
            Transaction::ContractCreation(tx) => tx.timestamp,
            Transaction::ContractMethodExecution(tx) => tx.timestamp,
            Transaction::ProfileTransaction(tx) => tx.timestamp,
        }
    }

    /// The canonical signed payload for this transaction.
    pub fn message_to_sign(&self) -> Vec<u8> {
        match self {
            Transaction::PolyTransfer(tx) => tx.message_to_sign(),
            Transaction::ContractCreation(tx) => tx.message_to_sign(),
            Transaction::ContractMethodExecution(tx) => tx.message_to_sign(),
            Transaction::ProfileTransaction(tx) => tx.message_to_sign(),
        }
    }

    /// Stateless checks; usable for mempool admission.
    pub fn semantic_validate(&self) -> Result<(), SemanticError> {
        match self {
            Transaction::PolyTransfer(tx) => tx.semantic_validate(),
            Transaction::ContractCreation(tx) => tx.semantic_validate(),
            Transaction::ContractMethodExecution(tx) => tx.semantic_validate(),
            Transaction::ProfileTransaction(tx) => tx.semantic_validate(),
        }
    }
}

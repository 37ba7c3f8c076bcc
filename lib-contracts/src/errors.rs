//! Contract engine errors.
//!
//! A failed method call leaves the referenced contract box untouched; the
//! enclosing transaction surfaces these as its own failure.

use thiserror::Error;

use crate::role::Role;

/// Error raised by contract construction or method execution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    #[error("unknown contract method: {0:?}")]
    UnknownMethod(String),

    #[error("unknown role: {0:?}")]
    UnknownRole(String),

    #[error("caller is not a party to the contract")]
    NotAParty,

    #[error("method reserved for the {required}")]
    WrongParty { required: Role },

    #[error("contract status {0:?} does not accept deliveries")]
    ClosedStatus(String),

    #[error("delivery quantity must be positive")]
    ZeroQuantity,

    #[error("no pending delivery with id {0:?}")]
    UnknownDelivery(String),

    #[error("missing or mistyped parameter: {0}")]
    BadParameters(&'static str),

    #[error("malformed contract document: {0}")]
    MalformedDocument(String),

    #[error("malformed agreement: {0}")]
    MalformedAgreement(String),

    #[error("delivered quantity overflow")]
    Overflow,
}

/// Result type for contract operations.
pub type ContractResult<T> = Result<T, ContractError>;

//! Tresor contract engine.
//!
//! A contract binds three parties (Producer, Hub, Investor) to an
//! agreement and tracks fulfilment in a mutable `storage` document. The
//! engine is a closed dispatch table: five named methods, each with its own
//! parameter schema and caller rule. There is no reflective lookup, so the
//! callable surface is exactly the [`ContractMethod`] enum.
//!
//! Methods never touch the wall clock; the enclosing transaction's
//! timestamp is threaded in, which keeps replicas byte-identical.

pub mod agreement;
pub mod contract;
pub mod errors;
pub mod role;

pub use agreement::Agreement;
pub use contract::{Contract, ContractMethod, MethodOutcome, STATUS_INITIALIZED};
pub use errors::{ContractError, ContractResult};
pub use role::Role;

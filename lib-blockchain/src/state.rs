//! State transition engine.
//!
//! Single-writer: one thread of control runs `validate → changes → apply`
//! per block while readers take point reads against the committed
//! snapshot. Every transaction is validated against the *pre-block* state;
//! the block commits as one `(remove, append)` delta under its id, or not
//! at all.

use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use lib_boxes::{decode_box, encode_box, ContractBox, ProfileBox, StateBox};
use lib_contracts::{Contract, ContractMethod, MethodOutcome, Role};
use lib_crypto::PublicKey25519;
use lib_storage::VersionedBoxStore;
use lib_types::{Amount, BoxId, Hash, Timestamp};

use crate::block::Block;
use crate::transaction::{
    ContractCreation, ContractMethodExecution, PolyTransfer, ProfileTransaction, Transaction,
};
use crate::validation::errors::{EngineError, EngineResult, SemanticError, StateError};

/// The delta a block commits, plus the informational fee total
/// (miner reward is zero; fees are burned).
#[derive(Debug, Clone)]
pub struct StateChanges {
    pub remove: Vec<BoxId>,
    pub append: Vec<StateBox>,
    pub fee_sum: Amount,
}

/// Per-transaction delta, merged into [`StateChanges`] with block-level
/// conflict detection.
struct TxDelta {
    remove: Vec<BoxId>,
    append: Vec<StateBox>,
}

/// The authority over the box set: validates transactions, applies blocks
/// atomically, rolls back to ancestors.
#[derive(Debug)]
pub struct StateEngine {
    store: VersionedBoxStore,
    version: Option<Hash>,
    timestamp: Timestamp,
}

impl StateEngine {
    /// Resume from whatever the store last committed; an empty store
    /// starts at `(None, 0)`.
    pub fn open(store: VersionedBoxStore) -> EngineResult<Self> {
        let version = store.last_version_id()?;
        let timestamp = store.state_timestamp()?.unwrap_or(0);
        if let Some(version) = version {
            info!(%version, timestamp, "state engine resumed");
        }
        Ok(StateEngine {
            store,
            version,
            timestamp,
        })
    }

    pub fn version(&self) -> Option<Hash> {
        self.version
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    // =========================================================================
    // Queries (side-effect free)
    // =========================================================================

    /// Point read of a live box.
    pub fn closed_box(&self, id: &BoxId) -> EngineResult<Option<StateBox>> {
        self.fetch_box(id)
    }

    /// Stateless admission check, usable by the mempool.
    pub fn semantic_validity(&self, tx: &Transaction) -> EngineResult<()> {
        tx.semantic_validate().map_err(EngineError::from)
    }

    /// Full stateful check against the committed snapshot, without
    /// applying anything.
    pub fn validate(&self, tx: &Transaction) -> EngineResult<()> {
        self.validate_tx(tx).map(|_| ())
    }

    // =========================================================================
    // Block application
    // =========================================================================

    /// Validate every transaction in `block` against the pre-block
    /// snapshot and derive the delta it would commit.
    ///
    /// Block-level conflict rules: no box removed twice, no produced id
    /// re-creating a removed id or colliding with surviving state.
    pub fn changes(&self, block: &Block) -> EngineResult<StateChanges> {
        if block.timestamp <= self.timestamp {
            return Err(StateError::TimestampNotAhead {
                timestamp: block.timestamp,
                state: self.timestamp,
            }
            .into());
        }
        let now = wall_clock_ms();
        if self.timestamp >= now {
            return Err(StateError::TimestampInFuture {
                state: self.timestamp,
                now,
            }
            .into());
        }

        let mut removed: BTreeSet<BoxId> = BTreeSet::new();
        let mut remove: Vec<BoxId> = Vec::new();
        let mut appended: BTreeSet<BoxId> = BTreeSet::new();
        let mut append: Vec<StateBox> = Vec::new();
        let mut fee_sum: Amount = 0;

        for tx in &block.transactions {
            let delta = self.validate_tx(tx)?;
            for id in delta.remove {
                if !removed.insert(id) {
                    return Err(StateError::DoubleSpend(id).into());
                }
                remove.push(id);
            }
            for boxed in delta.append {
                if !appended.insert(boxed.id()) {
                    return Err(StateError::IdCollision(boxed.id()).into());
                }
                append.push(boxed);
            }
            fee_sum = fee_sum
                .checked_add(tx.fee())
                .ok_or(SemanticError::Overflow)?;
        }

        // A produced id may neither resurrect a removed box nor shadow a
        // surviving one.
        for id in &appended {
            if removed.contains(id) || self.store.contains(id)? {
                return Err(StateError::IdCollision(*id).into());
            }
        }

        Ok(StateChanges {
            remove,
            append,
            fee_sum,
        })
    }

    /// Apply a confirmed block: all-or-nothing commit under `block.id`.
    pub fn apply_block(&mut self, block: &Block) -> EngineResult<()> {
        let changes = match self.changes(block) {
            Ok(changes) => changes,
            Err(e) => {
                warn!(block = %block.id, error = %e, "rejecting block");
                return Err(e);
            }
        };

        let mut append = Vec::with_capacity(changes.append.len());
        for boxed in &changes.append {
            let bytes =
                encode_box(boxed).map_err(|e| EngineError::Malformed(e.to_string()))?;
            append.push((boxed.id(), bytes));
        }

        self.store
            .update(block.id, block.timestamp, &changes.remove, &append)?;
        self.version = Some(block.id);
        self.timestamp = block.timestamp;

        info!(
            block = %block.id,
            transactions = block.transactions.len(),
            removed = changes.remove.len(),
            appended = append.len(),
            fee_sum = changes.fee_sum,
            "applied block"
        );
        Ok(())
    }

    /// Replay the store to a prior snapshot and resume from its sentinel.
    pub fn rollback_to(&mut self, version: Hash) -> EngineResult<()> {
        self.store.rollback(version)?;
        self.version = self.store.last_version_id()?;
        self.timestamp = self.store.state_timestamp()?.unwrap_or(0);
        info!(%version, timestamp = self.timestamp, "state rolled back");
        Ok(())
    }

    // =========================================================================
    // Per-kind stateful validation
    // =========================================================================

    fn validate_tx(&self, tx: &Transaction) -> EngineResult<TxDelta> {
        tx.semantic_validate()?;
        match tx {
            Transaction::PolyTransfer(tx) => self.validate_poly_transfer(tx),
            Transaction::ContractCreation(tx) => self.validate_contract_creation(tx),
            Transaction::ContractMethodExecution(tx) => self.validate_contract_execution(tx),
            Transaction::ProfileTransaction(tx) => self.validate_profile(tx),
        }
    }

    /// Inputs must be live poly boxes, unlocked by the aligned signatures,
    /// and conservation is re-derived from committed values.
    fn validate_poly_transfer(&self, tx: &PolyTransfer) -> EngineResult<TxDelta> {
        let message = tx.message_to_sign();
        let input_ids = tx.input_ids();

        let mut input_total: Amount = 0;
        for (id, signature) in input_ids.iter().zip(&tx.signatures) {
            let boxed = self
                .fetch_box(id)?
                .ok_or(StateError::BoxNotFound(*id))?;
            let poly = match boxed {
                StateBox::Poly(poly) => poly,
                _ => {
                    return Err(StateError::WrongBoxType {
                        id: *id,
                        expected: "PolyBox",
                    }
                    .into())
                }
            };
            if !poly.proposition.verify(&message, signature) {
                return Err(StateError::UnlockFailed(*id).into());
            }
            input_total = input_total
                .checked_add(poly.value)
                .ok_or(SemanticError::Overflow)?;
        }

        let output_total: Amount = tx.to.iter().map(|output| output.value).sum();
        let required = output_total
            .checked_add(tx.fee)
            .ok_or(SemanticError::Overflow)?;
        if input_total != required {
            return Err(StateError::ValueMismatch {
                inputs: input_total,
                outputs: output_total,
                fee: tx.fee,
            }
            .into());
        }

        Ok(TxDelta {
            remove: input_ids,
            append: tx.new_boxes().into_iter().map(StateBox::Poly).collect(),
        })
    }

    /// Every party's claimed role must match its registered profile, the
    /// minted box id must be fresh, and the clock must advance.
    fn validate_contract_creation(&self, tx: &ContractCreation) -> EngineResult<TxDelta> {
        for party in &tx.parties {
            self.require_profile_role(&party.key, party.role)?;
        }
        self.check_clock(tx.timestamp)?;

        let boxed = tx.new_box()?;
        if self.store.contains(&boxed.id())? {
            return Err(StateError::IdCollision(boxed.id()).into());
        }

        Ok(TxDelta {
            remove: Vec::new(),
            append: vec![StateBox::Contract(boxed)],
        })
    }

    /// Resolve the contract from state, re-check both signatures against
    /// the stored proposition, pin the caller's role to its profile, then
    /// dispatch. A refusing method is a state error: authorization was
    /// supposed to hold.
    fn validate_contract_execution(
        &self,
        tx: &ContractMethodExecution,
    ) -> EngineResult<TxDelta> {
        let box_id = tx.contract_box.id();
        let boxed = self
            .fetch_box(&box_id)?
            .ok_or(StateError::BoxNotFound(box_id))?;
        let contract_box = match boxed {
            StateBox::Contract(contract_box) => contract_box,
            _ => {
                return Err(StateError::WrongBoxType {
                    id: box_id,
                    expected: "ContractBox",
                }
                .into())
            }
        };

        let message = tx.message_to_sign();
        if !contract_box.proposition.verify(&message, &tx.signatures[..1]) {
            return Err(StateError::UnlockFailed(box_id).into());
        }
        if !tx.party.key.verify(&message, &tx.signatures[1]) {
            return Err(StateError::UnlockFailed(box_id).into());
        }

        self.require_profile_role(&tx.party.key, tx.party.role)?;
        self.check_clock(tx.timestamp)?;

        let contract = Contract::from_box(&contract_box)
            .map_err(|e| EngineError::Malformed(e.to_string()))?;
        let method = ContractMethod::from_name(&tx.method)
            .map_err(|_| SemanticError::UnknownMethod(tx.method.clone()))?;
        let outcome = contract
            .execute(method, &tx.party.key, &tx.parameters, tx.timestamp)
            .map_err(StateError::ContractExecution)?;

        match outcome {
            MethodOutcome::Updated(updated) => {
                let replacement = ContractBox::new(
                    contract_box.proposition.clone(),
                    tx.replacement_nonce(),
                    updated.to_document(tx.timestamp),
                );
                Ok(TxDelta {
                    remove: vec![box_id],
                    append: vec![StateBox::Contract(replacement)],
                })
            }
            MethodOutcome::Query(result) => {
                // Pure query: the box survives untouched, the fee still
                // counts toward the block total.
                debug!(contract = %box_id, method = %tx.method, %result, "contract query");
                Ok(TxDelta {
                    remove: Vec::new(),
                    append: Vec::new(),
                })
            }
        }
    }

    /// No registered profile may be overwritten, whatever the new value.
    fn validate_profile(&self, tx: &ProfileTransaction) -> EngineResult<TxDelta> {
        for field in tx.key_values.keys() {
            let id = ProfileBox::id_for(&tx.from, field);
            if self.store.contains(&id)? {
                return Err(StateError::ProfileExists(field.clone()).into());
            }
        }
        Ok(TxDelta {
            remove: Vec::new(),
            append: tx.new_boxes().into_iter().map(StateBox::Profile).collect(),
        })
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn fetch_box(&self, id: &BoxId) -> EngineResult<Option<StateBox>> {
        match self.store.get(id)? {
            Some(bytes) => {
                let boxed = decode_box(&bytes)
                    .map_err(|e| EngineError::Malformed(format!("stored box {id}: {e}")))?;
                Ok(Some(boxed))
            }
            None => Ok(None),
        }
    }

    /// The claimed role must match the `role` profile registered for the
    /// key.
    fn require_profile_role(&self, key: &PublicKey25519, claimed: Role) -> EngineResult<()> {
        let id = ProfileBox::id_for(key, "role");
        let boxed = self
            .fetch_box(&id)?
            .ok_or(StateError::MissingProfile(*key))?;
        let profile = match boxed {
            StateBox::Profile(profile) => profile,
            _ => {
                return Err(StateError::WrongBoxType {
                    id,
                    expected: "ProfileBox",
                }
                .into())
            }
        };
        if profile.value != claimed.as_str() {
            return Err(StateError::RoleMismatch {
                claimed,
                registered: profile.value,
            }
            .into());
        }
        Ok(())
    }

    /// The transaction must be ahead of state, and state must be behind
    /// the wall clock.
    fn check_clock(&self, timestamp: Timestamp) -> EngineResult<()> {
        if timestamp <= self.timestamp {
            return Err(StateError::TimestampNotAhead {
                timestamp,
                state: self.timestamp,
            }
            .into());
        }
        let now = wall_clock_ms();
        if self.timestamp >= now {
            return Err(StateError::TimestampInFuture {
                state: self.timestamp,
                now,
            }
            .into());
        }
        Ok(())
    }
}

fn wall_clock_ms() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

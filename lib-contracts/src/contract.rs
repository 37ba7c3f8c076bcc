//! Contract object and method dispatch.
//!
//! Dispatch is an explicit match over [`ContractMethod`], so the
//! callable surface is closed. Every method first resolves the caller to a party;
//! mutating methods additionally pin the caller to a specific role.
//!
//! Mutations are pure: `execute` returns a new [`Contract`], and the state
//! engine decides whether to mint a replacement box from it.

use serde_json::{json, Map, Value};

use lib_boxes::{canonical_json, ContractBox};
use lib_crypto::{digest, PublicKey25519};
use lib_types::{BoxId, Timestamp};

use crate::errors::{ContractError, ContractResult};
use crate::role::Role;

/// Storage status a contract starts in.
pub const STATUS_INITIALIZED: &str = "initialized";

/// Statuses that no longer accept deliveries.
const CLOSED_STATUSES: [&str; 2] = ["expired", "complete"];

/// The five callable methods. Anything else fails before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractMethod {
    Complete,
    CurrentStatus,
    Deliver,
    ConfirmDelivery,
    CheckExpiration,
}

impl ContractMethod {
    pub fn from_name(name: &str) -> ContractResult<Self> {
        match name {
            "complete" => Ok(ContractMethod::Complete),
            "currentStatus" => Ok(ContractMethod::CurrentStatus),
            "deliver" => Ok(ContractMethod::Deliver),
            "confirmDelivery" => Ok(ContractMethod::ConfirmDelivery),
            "checkExpiration" => Ok(ContractMethod::CheckExpiration),
            other => Err(ContractError::UnknownMethod(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ContractMethod::Complete => "complete",
            ContractMethod::CurrentStatus => "currentStatus",
            ContractMethod::Deliver => "deliver",
            ContractMethod::ConfirmDelivery => "confirmDelivery",
            ContractMethod::CheckExpiration => "checkExpiration",
        }
    }
}

/// What a method call produced: a replacement contract, or a query result.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodOutcome {
    Updated(Contract),
    Query(Value),
}

/// A live contract, lifted out of its box for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct Contract {
    pub producer: PublicKey25519,
    pub hub: PublicKey25519,
    pub investor: PublicKey25519,
    pub agreement: Value,
    pub storage: Value,
    /// Id of the box this contract was read from.
    pub id: BoxId,
}

impl Contract {
    /// Lift a contract out of its box document.
    pub fn from_box(boxed: &ContractBox) -> ContractResult<Self> {
        let doc = boxed
            .value
            .as_object()
            .ok_or_else(|| malformed("contract value is not an object"))?;

        Ok(Contract {
            producer: party_key(doc, Role::Producer)?,
            hub: party_key(doc, Role::Hub)?,
            investor: party_key(doc, Role::Investor)?,
            agreement: field(doc, "agreement")?,
            storage: field(doc, "storage")?,
            id: boxed.id(),
        })
    }

    /// Render the box document for this contract.
    pub fn to_document(&self, last_updated: Timestamp) -> Value {
        json!({
            "producer": self.producer.to_base58(),
            "hub": self.hub.to_base58(),
            "investor": self.investor.to_base58(),
            "agreement": self.agreement,
            "storage": self.storage,
            "lastUpdated": last_updated,
        })
    }

    /// Which party a key belongs to, if any.
    pub fn role_of(&self, key: &PublicKey25519) -> Option<Role> {
        if *key == self.producer {
            Some(Role::Producer)
        } else if *key == self.hub {
            Some(Role::Hub)
        } else if *key == self.investor {
            Some(Role::Investor)
        } else {
            None
        }
    }

    /// Current storage status.
    pub fn status(&self) -> ContractResult<&str> {
        self.storage
            .get("status")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("storage.status missing"))
    }

    /// Execute one method. `timestamp` is the enclosing transaction's
    /// timestamp; no wall clock is consulted here.
    pub fn execute(
        &self,
        method: ContractMethod,
        caller: &PublicKey25519,
        parameters: &Value,
        timestamp: Timestamp,
    ) -> ContractResult<MethodOutcome> {
        let caller_role = self.role_of(caller).ok_or(ContractError::NotAParty)?;

        match method {
            ContractMethod::Complete => Ok(MethodOutcome::Updated(self.clone())),

            ContractMethod::CurrentStatus => {
                Ok(MethodOutcome::Query(Value::String(self.status()?.to_string())))
            }

            ContractMethod::Deliver => {
                require_role(caller_role, Role::Producer)?;
                let quantity = parameters
                    .get("quantity")
                    .and_then(Value::as_u64)
                    .ok_or(ContractError::BadParameters("quantity"))?;
                self.deliver(quantity, timestamp)
            }

            ContractMethod::ConfirmDelivery => {
                require_role(caller_role, Role::Hub)?;
                let delivery_id = parameters
                    .get("deliveryId")
                    .and_then(Value::as_str)
                    .ok_or(ContractError::BadParameters("deliveryId"))?;
                self.confirm_delivery(delivery_id)
            }

            ContractMethod::CheckExpiration => {
                let expiration = self
                    .agreement
                    .get("expirationTimestamp")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| {
                        ContractError::MalformedAgreement(
                            "missing expirationTimestamp".to_string(),
                        )
                    })?;
                Ok(MethodOutcome::Query(Value::Bool(timestamp > expiration)))
            }
        }
    }

    fn deliver(&self, quantity: u64, timestamp: Timestamp) -> ContractResult<MethodOutcome> {
        if quantity == 0 {
            return Err(ContractError::ZeroQuantity);
        }
        let status = self.status()?;
        if CLOSED_STATUSES.contains(&status) {
            return Err(ContractError::ClosedStatus(status.to_string()));
        }

        let mut updated = self.clone();
        let pending = pending_deliveries_mut(&mut updated.storage, true)?
            .ok_or_else(|| malformed("currentFulfillment is not an object"))?;

        // The delivery id fingerprints the queue as it would look with the
        // new entry appended id-less; computed before the real append.
        let mut probe = pending.clone();
        probe.push(json!({ "quantity": quantity, "timestamp": timestamp }));
        let delivery_id = bs58::encode(digest(&canonical_json(&Value::Array(probe))).as_bytes())
            .into_string();

        pending.push(json!({
            "id": delivery_id,
            "quantity": quantity,
            "timestamp": timestamp,
        }));
        Ok(MethodOutcome::Updated(updated))
    }

    fn confirm_delivery(&self, delivery_id: &str) -> ContractResult<MethodOutcome> {
        let mut updated = self.clone();

        let quantity = {
            let pending = pending_deliveries_mut(&mut updated.storage, false)?
                .ok_or_else(|| ContractError::UnknownDelivery(delivery_id.to_string()))?;
            let index = pending
                .iter()
                .position(|entry| entry.get("id").and_then(Value::as_str) == Some(delivery_id))
                .ok_or_else(|| ContractError::UnknownDelivery(delivery_id.to_string()))?;
            let entry = pending.remove(index);
            entry
                .get("quantity")
                .and_then(Value::as_u64)
                .ok_or_else(|| malformed("pending delivery without quantity"))?
        };

        let fulfillment = updated
            .storage
            .get_mut("currentFulfillment")
            .and_then(Value::as_object_mut)
            .ok_or_else(|| malformed("currentFulfillment is not an object"))?;
        let delivered = fulfillment
            .entry("deliveredQuantity")
            .or_insert_with(|| json!(0));
        let current = delivered
            .as_u64()
            .ok_or_else(|| malformed("deliveredQuantity is not an integer"))?;
        *delivered = json!(current.checked_add(quantity).ok_or(ContractError::Overflow)?);

        Ok(MethodOutcome::Updated(updated))
    }
}

/// Reach `storage.currentFulfillment.pendingDeliveries`, optionally
/// creating the intermediate objects. Returns `None` when absent and
/// `create` is false.
fn pending_deliveries_mut(
    storage: &mut Value,
    create: bool,
) -> ContractResult<Option<&mut Vec<Value>>> {
    let root = storage
        .as_object_mut()
        .ok_or_else(|| malformed("storage is not an object"))?;

    let fulfillment = if create {
        root.entry("currentFulfillment").or_insert_with(|| json!({}))
    } else {
        match root.get_mut("currentFulfillment") {
            Some(v) => v,
            None => return Ok(None),
        }
    };
    let fulfillment = fulfillment
        .as_object_mut()
        .ok_or_else(|| malformed("currentFulfillment is not an object"))?;

    let pending = if create {
        fulfillment
            .entry("pendingDeliveries")
            .or_insert_with(|| json!([]))
    } else {
        match fulfillment.get_mut("pendingDeliveries") {
            Some(v) => v,
            None => return Ok(None),
        }
    };
    pending
        .as_array_mut()
        .map(Some)
        .ok_or_else(|| malformed("pendingDeliveries is not an array"))
}

fn require_role(actual: Role, required: Role) -> ContractResult<()> {
    if actual == required {
        Ok(())
    } else {
        Err(ContractError::WrongParty { required })
    }
}

fn party_key(doc: &Map<String, Value>, role: Role) -> ContractResult<PublicKey25519> {
    doc.get(role.as_str())
        .and_then(Value::as_str)
        .ok_or_else(|| malformed(role.as_str()))?
        .parse()
        .map_err(|_| malformed("party key is not valid base58"))
}

fn field(doc: &Map<String, Value>, name: &'static str) -> ContractResult<Value> {
    doc.get(name)
        .cloned()
        .ok_or_else(|| malformed(name))
}

fn malformed(what: &str) -> ContractError {
    ContractError::MalformedDocument(what.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUCER: PublicKey25519 = PublicKey25519([1; 32]);
    const HUB: PublicKey25519 = PublicKey25519([2; 32]);
    const INVESTOR: PublicKey25519 = PublicKey25519([3; 32]);
    const OUTSIDER: PublicKey25519 = PublicKey25519([9; 32]);

    fn contract() -> Contract {
        Contract {
            producer: PRODUCER,
            hub: HUB,
            investor: INVESTOR,
            agreement: json!({"expirationTimestamp": 50_000_u64, "terms": {"pledge": 500}}),
            storage: json!({"status": STATUS_INITIALIZED}),
            id: BoxId::new([0xcc; 32]),
        }
    }

    fn updated(outcome: MethodOutcome) -> Contract {
        match outcome {
            MethodOutcome::Updated(c) => c,
            MethodOutcome::Query(v) => panic!("expected updated contract, got query {v}"),
        }
    }

    fn pending(contract: &Contract) -> Vec<Value> {
        contract.storage["currentFulfillment"]["pendingDeliveries"]
            .as_array()
            .cloned()
            .unwrap_or_default()
    }

    #[test]
    fn deliver_appends_pending_entry_with_stable_id() {
        let c = contract();
        let params = json!({"quantity": 5});

        let once = updated(c.execute(ContractMethod::Deliver, &PRODUCER, &params, 1_000).unwrap());
        let twice = updated(c.execute(ContractMethod::Deliver, &PRODUCER, &params, 1_000).unwrap());

        let entries = pending(&once);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["quantity"], 5);
        assert_eq!(entries[0]["timestamp"], 1_000);
        // Same queue, same call, same id.
        assert_eq!(entries[0]["id"], pending(&twice)[0]["id"]);

        // A different timestamp fingerprints differently.
        let later = updated(c.execute(ContractMethod::Deliver, &PRODUCER, &params, 2_000).unwrap());
        assert_ne!(entries[0]["id"], pending(&later)[0]["id"]);
    }

    #[test]
    fn confirm_delivery_moves_quantity() {
        let c = contract();
        let delivered =
            updated(c.execute(ContractMethod::Deliver, &PRODUCER, &json!({"quantity": 5}), 1_000).unwrap());
        let delivery_id = pending(&delivered)[0]["id"].as_str().unwrap().to_string();

        let confirmed = updated(
            delivered
                .execute(
                    ContractMethod::ConfirmDelivery,
                    &HUB,
                    &json!({"deliveryId": delivery_id}),
                    1_001,
                )
                .unwrap(),
        );

        assert!(pending(&confirmed).is_empty());
        assert_eq!(
            confirmed.storage["currentFulfillment"]["deliveredQuantity"],
            5
        );
    }

    #[test]
    fn confirm_delivery_accumulates() {
        let c = contract();
        let one = updated(c.execute(ContractMethod::Deliver, &PRODUCER, &json!({"quantity": 5}), 1_000).unwrap());
        let two = updated(one.execute(ContractMethod::Deliver, &PRODUCER, &json!({"quantity": 3}), 1_500).unwrap());

        let ids: Vec<String> = pending(&two)
            .iter()
            .map(|e| e["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids.len(), 2);

        let mut current = two;
        for id in &ids {
            current = updated(
                current
                    .execute(ContractMethod::ConfirmDelivery, &HUB, &json!({"deliveryId": id}), 2_000)
                    .unwrap(),
            );
        }
        assert_eq!(
            current.storage["currentFulfillment"]["deliveredQuantity"],
            8
        );
    }

    #[test]
    fn deliver_requires_producer() {
        let c = contract();
        let err = c
            .execute(ContractMethod::Deliver, &HUB, &json!({"quantity": 3}), 1_000)
            .unwrap_err();
        assert_eq!(err, ContractError::WrongParty { required: Role::Producer });
        // The source contract is untouched by a failed call.
        assert_eq!(c.storage, json!({"status": STATUS_INITIALIZED}));
    }

    #[test]
    fn confirm_requires_hub() {
        let c = contract();
        let err = c
            .execute(
                ContractMethod::ConfirmDelivery,
                &INVESTOR,
                &json!({"deliveryId": "x"}),
                1_000,
            )
            .unwrap_err();
        assert_eq!(err, ContractError::WrongParty { required: Role::Hub });
    }

    #[test]
    fn outsider_cannot_call_anything() {
        let c = contract();
        for method in [
            ContractMethod::Complete,
            ContractMethod::CurrentStatus,
            ContractMethod::Deliver,
            ContractMethod::ConfirmDelivery,
            ContractMethod::CheckExpiration,
        ] {
            assert_eq!(
                c.execute(method, &OUTSIDER, &json!({}), 1_000).unwrap_err(),
                ContractError::NotAParty
            );
        }
    }

    #[test]
    fn deliver_rejects_zero_and_closed_status() {
        let c = contract();
        assert_eq!(
            c.execute(ContractMethod::Deliver, &PRODUCER, &json!({"quantity": 0}), 1_000)
                .unwrap_err(),
            ContractError::ZeroQuantity
        );

        let mut expired = contract();
        expired.storage = json!({"status": "expired"});
        assert_eq!(
            expired
                .execute(ContractMethod::Deliver, &PRODUCER, &json!({"quantity": 1}), 1_000)
                .unwrap_err(),
            ContractError::ClosedStatus("expired".to_string())
        );
    }

    #[test]
    fn confirm_unknown_id_fails() {
        let c = contract();
        assert_eq!(
            c.execute(
                ContractMethod::ConfirmDelivery,
                &HUB,
                &json!({"deliveryId": "missing"}),
                1_000
            )
            .unwrap_err(),
            ContractError::UnknownDelivery("missing".to_string())
        );
    }

    #[test]
    fn queries_answer_without_mutation() {
        let c = contract();
        assert_eq!(
            c.execute(ContractMethod::CurrentStatus, &INVESTOR, &json!({}), 1_000)
                .unwrap(),
            MethodOutcome::Query(Value::String(STATUS_INITIALIZED.to_string()))
        );

        // Strictly-after semantics on expiration.
        assert_eq!(
            c.execute(ContractMethod::CheckExpiration, &HUB, &json!({}), 50_000)
                .unwrap(),
            MethodOutcome::Query(Value::Bool(false))
        );
        assert_eq!(
            c.execute(ContractMethod::CheckExpiration, &HUB, &json!({}), 50_001)
                .unwrap(),
            MethodOutcome::Query(Value::Bool(true))
        );
    }

    #[test]
    fn complete_returns_contract_unchanged() {
        let c = contract();
        assert_eq!(updated(c.execute(ContractMethod::Complete, &HUB, &json!({}), 1_000).unwrap()), c);
    }

    #[test]
    fn unknown_method_name_is_closed_out() {
        assert!(matches!(
            ContractMethod::from_name("selfDestruct"),
            Err(ContractError::UnknownMethod(_))
        ));
        for name in [
            "complete",
            "currentStatus",
            "deliver",
            "confirmDelivery",
            "checkExpiration",
        ] {
            assert_eq!(ContractMethod::from_name(name).unwrap().name(), name);
        }
    }

    #[test]
    fn box_document_round_trip() {
        let c = contract();
        let doc = c.to_document(7_777);
        assert_eq!(doc["lastUpdated"], 7_777);

        let boxed = lib_boxes::ContractBox::new(
            lib_crypto::MofNProposition::new(1, [PRODUCER, HUB, INVESTOR]).unwrap(),
            42,
            doc,
        );
        let lifted = Contract::from_box(&boxed).unwrap();
        assert_eq!(lifted.producer, c.producer);
        assert_eq!(lifted.hub, c.hub);
        assert_eq!(lifted.investor, c.investor);
        assert_eq!(lifted.agreement, c.agreement);
        assert_eq!(lifted.storage, c.storage);
        assert_eq!(lifted.id, boxed.id());
    }
}

//! Box variants and id derivation.
//!
//! Id formulas (all big-endian, `H` = Blake3-256):
//!
//! | Variant | Id |
//! |---------|----|
//! | Poly / Arbit | `H(pub || u64_be(nonce))` |
//! | Contract | `H(encode(prop) || u64_be(nonce) || canonical_json(value))` |
//! | Profile | `H(pub || utf8(field))`, value-independent on purpose |
//!
//! The profile formula pins one box per `(key, field)` pair: re-registering
//! the same field can only collide with itself.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use lib_crypto::{digest_parts, MofNProposition, PublicKey25519};
use lib_types::{Amount, BoxId, Nonce};

use crate::codec::canonical_json;

/// Fungible poly holding locked by a single key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolyBox {
    pub proposition: PublicKey25519,
    pub nonce: Nonce,
    pub value: Amount,
}

/// Fungible arbit holding locked by a single key.
///
/// No transaction kind spends or mints these; they enter state at genesis
/// only and are carried for codec completeness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArbitBox {
    pub proposition: PublicKey25519,
    pub nonce: Nonce,
    pub value: Amount,
}

/// A live three-party contract.
///
/// `value` is the semi-structured contract document: `producer`, `hub`,
/// `investor` (base58 keys), `agreement`, `storage`, `lastUpdated`. Its
/// canonical JSON bytes participate in the id, so the document is immutable
/// per box; method calls mint a replacement box with a fresh nonce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractBox {
    pub proposition: MofNProposition,
    pub nonce: Nonce,
    pub value: Value,
}

/// Role-keyed identity record: one per `(key, field)` pair, nonce fixed at 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileBox {
    pub proposition: PublicKey25519,
    pub value: String,
    pub field: String,
}

impl PolyBox {
    pub fn new(proposition: PublicKey25519, nonce: Nonce, value: Amount) -> Self {
        PolyBox {
            proposition,
            nonce,
            value,
        }
    }

    /// Id of a poly box without constructing it; transfer inputs are
    /// referenced this way.
    pub fn id_for(proposition: &PublicKey25519, nonce: Nonce) -> BoxId {
        digest_parts(&[proposition.as_bytes(), &nonce.to_be_bytes()])
    }

    pub fn id(&self) -> BoxId {
        Self::id_for(&self.proposition, self.nonce)
    }
}

impl ArbitBox {
    pub fn new(proposition: PublicKey25519, nonce: Nonce, value: Amount) -> Self {
        ArbitBox {
            proposition,
            nonce,
            value,
        }
    }

    pub fn id(&self) -> BoxId {
        digest_parts(&[self.proposition.as_bytes(), &self.nonce.to_be_bytes()])
    }
}

impl ContractBox {
    pub fn new(proposition: MofNProposition, nonce: Nonce, value: Value) -> Self {
        ContractBox {
            proposition,
            nonce,
            value,
        }
    }

    pub fn id(&self) -> BoxId {
        digest_parts(&[
            &self.proposition.encode(),
            &self.nonce.to_be_bytes(),
            &canonical_json(&self.value),
        ])
    }
}

impl ProfileBox {
    pub fn new(proposition: PublicKey25519, value: impl Into<String>, field: impl Into<String>) -> Self {
        ProfileBox {
            proposition,
            value: value.into(),
            field: field.into(),
        }
    }

    /// Id of the profile box holding `field` for `proposition`, whatever
    /// its value.
    pub fn id_for(proposition: &PublicKey25519, field: &str) -> BoxId {
        digest_parts(&[proposition.as_bytes(), field.as_bytes()])
    }

    pub fn id(&self) -> BoxId {
        Self::id_for(&self.proposition, &self.field)
    }
}

/// Sum of the four box variants, as stored and as served to the API layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "boxType")]
pub enum StateBox {
    #[serde(rename = "PolyBox")]
    Poly(PolyBox),
    #[serde(rename = "ArbitBox")]
    Arbit(ArbitBox),
    #[serde(rename = "ContractBox")]
    Contract(ContractBox),
    #[serde(rename = "ProfileBox")]
    Profile(ProfileBox),
}

impl StateBox {
    pub fn id(&self) -> BoxId {
        match self {
            StateBox::Poly(b) => b.id(),
            StateBox::Arbit(b) => b.id(),
            StateBox::Contract(b) => b.id(),
            StateBox::Profile(b) => b.id(),
        }
    }

    pub fn nonce(&self) -> Nonce {
        match self {
            StateBox::Poly(b) => b.nonce,
            StateBox::Arbit(b) => b.nonce,
            StateBox::Contract(b) => b.nonce,
            // Profile boxes carry no nonce on the wire; it is 0 by protocol.
            StateBox::Profile(_) => 0,
        }
    }

    pub fn type_tag(&self) -> &'static str {
        match self {
            StateBox::Poly(_) => "PolyBox",
            StateBox::Arbit(_) => "ArbitBox",
            StateBox::Contract(_) => "ContractBox",
            StateBox::Profile(_) => "ProfileBox",
        }
    }
}

impl From<PolyBox> for StateBox {
    fn from(b: PolyBox) -> Self {
        StateBox::Poly(b)
    }
}

impl From<ArbitBox> for StateBox {
    fn from(b: ArbitBox) -> Self {
        StateBox::Arbit(b)
    }
}

impl From<ContractBox> for StateBox {
    fn from(b: ContractBox) -> Self {
        StateBox::Contract(b)
    }
}

impl From<ProfileBox> for StateBox {
    fn from(b: ProfileBox) -> Self {
        StateBox::Profile(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(seed: u8) -> PublicKey25519 {
        PublicKey25519([seed; 32])
    }

    #[test]
    fn poly_id_is_stable_and_nonce_sensitive() {
        let a = PolyBox::new(key(1), 5, 100);
        let b = PolyBox::new(key(1), 5, 999);
        let c = PolyBox::new(key(1), 6, 100);

        // Value does not participate in the id; nonce does.
        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
        assert_eq!(a.id(), PolyBox::id_for(&key(1), 5));
    }

    #[test]
    fn profile_id_ignores_value() {
        let hub = ProfileBox::new(key(2), "hub", "role");
        let producer = ProfileBox::new(key(2), "producer", "role");
        let other_field = ProfileBox::new(key(2), "hub", "email");

        assert_eq!(hub.id(), producer.id());
        assert_ne!(hub.id(), other_field.id());
        assert_eq!(hub.id(), ProfileBox::id_for(&key(2), "role"));
    }

    #[test]
    fn contract_id_tracks_value_bytes() {
        let prop = MofNProposition::new(1, [key(1), key(2), key(3)]).unwrap();
        let a = ContractBox::new(prop.clone(), 7, json!({"storage": {"status": "initialized"}}));
        let b = ContractBox::new(prop, 7, json!({"storage": {"status": "expired"}}));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn contract_id_is_insertion_order_independent() {
        let prop = MofNProposition::new(1, [key(1), key(2), key(3)]).unwrap();
        let a: Value = serde_json::from_str(r#"{"x": 1, "a": 2}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"a": 2, "x": 1}"#).unwrap();
        assert_eq!(
            ContractBox::new(prop.clone(), 1, a).id(),
            ContractBox::new(prop, 1, b).id()
        );
    }

    #[test]
    fn wire_json_is_tagged_and_base58() {
        let boxed: StateBox = PolyBox::new(key(3), 1, 42).into();
        let v = serde_json::to_value(&boxed).unwrap();
        assert_eq!(v["boxType"], "PolyBox");
        assert_eq!(v["proposition"], key(3).to_base58());
        assert_eq!(v["value"], 42);

        let back: StateBox = serde_json::from_value(v).unwrap();
        assert_eq!(boxed, back);
    }
}

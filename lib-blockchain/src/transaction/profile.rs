//! Profile registration.
//!
//! Binds string facts to a public key. Today the only admissible field is
//! `role`, valued by one of the three contract roles; the closed field set
//! keeps the registry from becoming a free-form key-value dump.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use lib_boxes::{canonical_json, ProfileBox};
use lib_crypto::{PublicKey25519, Signature25519};
use lib_types::{Amount, Timestamp};

use crate::validation::errors::SemanticError;

/// Fields a profile transaction may set.
const ALLOWED_FIELDS: [&str; 1] = ["role"];

/// Values admissible for the `role` field.
const ROLE_VALUES: [&str; 3] = ["producer", "hub", "investor"];

/// Registration of one or more profile facts for `from`. The map is
/// ordered, which makes its canonical JSON (and so the signed payload)
/// deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileTransaction {
    pub from: PublicKey25519,
    pub signature: Signature25519,
    pub key_values: BTreeMap<String, String>,
    pub fee: Amount,
    pub timestamp: Timestamp,
}

impl ProfileTransaction {
    /// `u64_be(ts) || from || canonical_json(key_values)`.
    pub fn message_to_sign(&self) -> Vec<u8> {
        let kv = Value::Object(
            self.key_values
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        );
        let mut message = Vec::new();
        message.extend_from_slice(&self.timestamp.to_be_bytes());
        message.extend_from_slice(self.from.as_bytes());
        message.extend_from_slice(&canonical_json(&kv));
        message
    }

    /// One profile box per entry.
    pub fn new_boxes(&self) -> Vec<ProfileBox> {
        self.key_values
            .iter()
            .map(|(field, value)| ProfileBox::new(self.from, value.clone(), field.clone()))
            .collect()
    }

    /// Stateless checks: closed field set, closed role values, one valid
    /// signature from the registrant.
    pub fn semantic_validate(&self) -> Result<(), SemanticError> {
        if self.key_values.is_empty() {
            return Err(SemanticError::EmptyProfile);
        }
        for (field, value) in &self.key_values {
            if !ALLOWED_FIELDS.contains(&field.as_str()) {
                return Err(SemanticError::UnsupportedProfileField(field.clone()));
            }
            if field == "role" && !ROLE_VALUES.contains(&value.as_str()) {
                return Err(SemanticError::InvalidProfileRole(value.clone()));
            }
        }
        if !self.from.verify(&self.message_to_sign(), &self.signature) {
            return Err(SemanticError::InvalidSignature(0));
        }
        Ok(())
    }
}

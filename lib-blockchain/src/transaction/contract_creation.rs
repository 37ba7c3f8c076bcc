//! Contract creation.
//!
//! Three parties, one role each, all three signing the same payload. The
//! minted contract box is locked by a 1-of-3 proposition over the party
//! keys and starts with `storage.status = "initialized"`.

use serde::{Deserialize, Serialize};
use serde_json::json;

use lib_boxes::ContractBox;
use lib_contracts::{Agreement, Role};
use lib_crypto::{digest, digest_parts, MofNProposition, Signature25519};
use lib_types::{Amount, Timestamp};

use crate::transaction::poly_transfer::nonce_from_digest;
use crate::transaction::PartyEntry;
use crate::validation::errors::SemanticError;

/// Creation of a three-party contract. Signatures align with `parties`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractCreation {
    pub agreement: Agreement,
    pub parties: Vec<PartyEntry>,
    pub signatures: Vec<Signature25519>,
    pub fee: Amount,
    pub timestamp: Timestamp,
}

impl ContractCreation {
    /// `u64_be(ts) || encode(agreement) || concat(parties.key)`.
    pub fn message_to_sign(&self) -> Vec<u8> {
        let mut message = Vec::new();
        message.extend_from_slice(&self.timestamp.to_be_bytes());
        message.extend_from_slice(&self.agreement.encode());
        for party in &self.parties {
            message.extend_from_slice(party.key.as_bytes());
        }
        message
    }

    /// The key claiming `role`, when present.
    pub fn party_key(&self, role: Role) -> Option<&PartyEntry> {
        self.parties.iter().find(|party| party.role == role)
    }

    /// The contract box this creation mints.
    ///
    /// Nonce: `first8_be(H(encode(prop) || H(encode(agreement) ||
    /// concat(parties.key) || u64_be(ts) || u64_be(fee))))`.
    pub fn new_box(&self) -> Result<ContractBox, SemanticError> {
        let proposition =
            MofNProposition::new(1, self.parties.iter().map(|party| party.key))
                .map_err(|_| SemanticError::DuplicatePartyKey)?;
        if proposition.keys().count() != self.parties.len() {
            return Err(SemanticError::DuplicatePartyKey);
        }

        let mut fingerprint_input = self.agreement.encode();
        for party in &self.parties {
            fingerprint_input.extend_from_slice(party.key.as_bytes());
        }
        fingerprint_input.extend_from_slice(&self.timestamp.to_be_bytes());
        fingerprint_input.extend_from_slice(&self.fee.to_be_bytes());
        let fingerprint = digest(&fingerprint_input);

        let nonce_digest = digest_parts(&[&proposition.encode(), fingerprint.as_bytes()]);
        let nonce = nonce_from_digest(nonce_digest.as_bytes());

        let mut document = json!({
            "agreement": self.agreement.to_value(),
            "storage": { "status": lib_contracts::STATUS_INITIALIZED },
            "lastUpdated": self.timestamp,
        });
        for party in &self.parties {
            document[party.role.as_str()] = json!(party.key.to_base58());
        }

        Ok(ContractBox::new(proposition, nonce, document))
    }

    /// Stateless checks: exactly three parties covering the three roles,
    /// three valid signatures, a well-formed agreement.
    pub fn semantic_validate(&self) -> Result<(), SemanticError> {
        if self.parties.len() != 3 || self.signatures.len() != 3 {
            return Err(SemanticError::SignatureCountMismatch {
                expected: 3,
                actual: self.signatures.len(),
            });
        }

        let mut roles: Vec<Role> = self.parties.iter().map(|party| party.role).collect();
        roles.sort();
        roles.dedup();
        if roles.len() != 3 {
            return Err(SemanticError::IncompleteParties);
        }

        let distinct_keys = self
            .parties
            .iter()
            .map(|party| party.key)
            .collect::<std::collections::BTreeSet<_>>();
        if distinct_keys.len() != 3 {
            return Err(SemanticError::DuplicatePartyKey);
        }

        self.agreement
            .validate()
            .map_err(|e| SemanticError::InvalidAgreement(e.to_string()))?;

        let message = self.message_to_sign();
        for (index, (party, signature)) in self.parties.iter().zip(&self.signatures).enumerate() {
            if !party.key.verify(&message, signature) {
                return Err(SemanticError::InvalidSignature(index));
            }
        }
        Ok(())
    }
}

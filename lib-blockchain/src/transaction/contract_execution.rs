//! Contract method execution.
//!
//! Two signatures over `u64_be(ts)`: the first satisfies the contract's
//! 1-of-3 proposition (contract-side authorization), the second binds the
//! call to one specific party. Which party may call which method is the
//! contract engine's rule; whether the claimed role is real is checked
//! against the profile registry during stateful validation.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use lib_boxes::{canonical_json, ContractBox};
use lib_contracts::ContractMethod;
use lib_crypto::{digest_parts, Signature25519};
use lib_types::{Amount, Nonce, Timestamp};

use crate::transaction::poly_transfer::nonce_from_digest;
use crate::transaction::PartyEntry;
use crate::validation::errors::SemanticError;

/// A named method call against a live contract box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractMethodExecution {
    pub contract_box: ContractBox,
    pub party: PartyEntry,
    pub method: String,
    pub parameters: Value,
    pub signatures: Vec<Signature25519>,
    pub fee: Amount,
    pub timestamp: Timestamp,
}

impl ContractMethodExecution {
    /// `u64_be(ts)`. The call is authorized, not content-committed; the
    /// method fingerprint enters state through the replacement box nonce.
    pub fn message_to_sign(&self) -> Vec<u8> {
        self.timestamp.to_be_bytes().to_vec()
    }

    /// Nonce of the replacement contract box: the creation formula applied
    /// to the method-call fingerprint.
    ///
    /// `first8_be(H(encode(prop) || H(canonical_json({method, parameters})
    /// || old_id || u64_be(ts) || u64_be(fee))))`
    pub fn replacement_nonce(&self) -> Nonce {
        let call = json!({
            "method": self.method,
            "parameters": self.parameters,
        });
        let fingerprint = digest_parts(&[
            &canonical_json(&call),
            self.contract_box.id().as_bytes(),
            &self.timestamp.to_be_bytes(),
            &self.fee.to_be_bytes(),
        ]);
        let nonce_digest = digest_parts(&[
            &self.contract_box.proposition.encode(),
            fingerprint.as_bytes(),
        ]);
        nonce_from_digest(nonce_digest.as_bytes())
    }

    /// Stateless checks: two signatures with their distinct duties, a known
    /// method name, and parameters matching that method's schema.
    pub fn semantic_validate(&self) -> Result<(), SemanticError> {
        if self.signatures.len() != 2 {
            return Err(SemanticError::SignatureCountMismatch {
                expected: 2,
                actual: self.signatures.len(),
            });
        }

        let message = self.message_to_sign();
        if !self
            .contract_box
            .proposition
            .verify(&message, &self.signatures[..1])
        {
            return Err(SemanticError::PropositionUnsatisfied);
        }
        if !self.party.key.verify(&message, &self.signatures[1]) {
            return Err(SemanticError::InvalidSignature(1));
        }

        let method = ContractMethod::from_name(&self.method)
            .map_err(|_| SemanticError::UnknownMethod(self.method.clone()))?;
        validate_parameters(method, &self.parameters)
    }
}

/// Per-method parameter schema, switched explicitly.
fn validate_parameters(method: ContractMethod, parameters: &Value) -> Result<(), SemanticError> {
    match method {
        ContractMethod::Deliver => match parameters.get("quantity").and_then(Value::as_u64) {
            Some(0) => Err(SemanticError::InvalidParameters(
                "quantity must be positive".to_string(),
            )),
            Some(_) => Ok(()),
            None => Err(SemanticError::InvalidParameters(
                "deliver requires a numeric quantity".to_string(),
            )),
        },
        ContractMethod::ConfirmDelivery => {
            match parameters.get("deliveryId").and_then(Value::as_str) {
                Some(_) => Ok(()),
                None => Err(SemanticError::InvalidParameters(
                    "confirmDelivery requires a deliveryId string".to_string(),
                )),
            }
        }
        ContractMethod::Complete | ContractMethod::CurrentStatus | ContractMethod::CheckExpiration => {
            Ok(())
        }
    }
}

//! Static contract terms.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use lib_boxes::canonical_json;
use lib_types::Timestamp;

use crate::errors::{ContractError, ContractResult};

/// The immutable terms a contract is created with: a free-form `terms`
/// document (pledge, exchange rate, share and fulfilment curves) and the
/// expiration instant, in epoch milliseconds.
///
/// The canonical encoding participates in contract creation signatures and
/// in the minted box's nonce, so it goes through [`canonical_json`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agreement {
    pub terms: Value,
    pub expiration_timestamp: Timestamp,
}

impl Agreement {
    pub fn new(terms: Value, expiration_timestamp: Timestamp) -> Self {
        Agreement {
            terms,
            expiration_timestamp,
        }
    }

    /// Shape checks that do not need chain state.
    pub fn validate(&self) -> ContractResult<()> {
        if !self.terms.is_object() {
            return Err(ContractError::MalformedAgreement(
                "terms must be a json object".to_string(),
            ));
        }
        if self.expiration_timestamp == 0 {
            return Err(ContractError::MalformedAgreement(
                "expirationTimestamp must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// The agreement as it appears inside a contract box document.
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "terms": self.terms,
            "expirationTimestamp": self.expiration_timestamp,
        })
    }

    /// Canonical bytes, as signed and as hashed into box nonces.
    pub fn encode(&self) -> Vec<u8> {
        canonical_json(&self.to_value())
    }

    /// Read an agreement back out of a contract box document.
    pub fn from_value(value: &Value) -> ContractResult<Self> {
        let terms = value
            .get("terms")
            .cloned()
            .ok_or_else(|| ContractError::MalformedAgreement("missing terms".to_string()))?;
        let expiration_timestamp = value
            .get("expirationTimestamp")
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                ContractError::MalformedAgreement("missing expirationTimestamp".to_string())
            })?;
        Ok(Agreement {
            terms,
            expiration_timestamp,
        })
    }
}

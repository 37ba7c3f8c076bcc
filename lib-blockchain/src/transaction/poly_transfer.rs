//! Poly token transfer.
//!
//! Spends poly boxes by `(sender, nonce)` reference and mints one poly box
//! per recipient. Output nonces are derived from a hash of the signing
//! payload, so the produced ids are pinned by the transaction itself.

use serde::{Deserialize, Serialize};

use lib_boxes::PolyBox;
use lib_crypto::{digest, digest_parts, PublicKey25519, Signature25519};
use lib_types::{Amount, BoxId, Nonce, Timestamp};

use crate::validation::errors::SemanticError;

/// Reference to a poly box being spent: the holder key and box nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferInput {
    pub sender: PublicKey25519,
    pub nonce: Nonce,
}

/// A recipient and the amount it receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOutput {
    pub recipient: PublicKey25519,
    pub value: Amount,
}

/// Transfer of poly tokens; conservation against committed input values is
/// re-derived during stateful validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolyTransfer {
    pub from: Vec<TransferInput>,
    pub to: Vec<TransferOutput>,
    pub signatures: Vec<Signature25519>,
    pub fee: Amount,
    pub timestamp: Timestamp,
}

impl PolyTransfer {
    /// Ids of the boxes this transfer spends, in input order.
    pub fn input_ids(&self) -> Vec<BoxId> {
        self.from
            .iter()
            .map(|input| PolyBox::id_for(&input.sender, input.nonce))
            .collect()
    }

    /// `concat(to.recipient) || concat(input_ids) || u64_be(ts) || u64_be(fee)`.
    pub fn message_to_sign(&self) -> Vec<u8> {
        let mut message = Vec::new();
        for output in &self.to {
            message.extend_from_slice(output.recipient.as_bytes());
        }
        for id in self.input_ids() {
            message.extend_from_slice(id.as_bytes());
        }
        message.extend_from_slice(&self.timestamp.to_be_bytes());
        message.extend_from_slice(&self.fee.to_be_bytes());
        message
    }

    /// The poly boxes this transfer mints, one per recipient.
    ///
    /// Output nonce: `first8_be(H(recipient || H(message) || u32_be(i)))`,
    /// where `H(message)` is the nonce-free transaction fingerprint.
    pub fn new_boxes(&self) -> Vec<PolyBox> {
        let fingerprint = digest(&self.message_to_sign());
        self.to
            .iter()
            .enumerate()
            .map(|(index, output)| {
                let nonce_digest = digest_parts(&[
                    output.recipient.as_bytes(),
                    fingerprint.as_bytes(),
                    &(index as u32).to_be_bytes(),
                ]);
                let nonce = nonce_from_digest(nonce_digest.as_bytes());
                PolyBox::new(output.recipient, nonce, output.value)
            })
            .collect()
    }

    /// Stateless checks: signer/signature alignment and signature validity
    /// against the claimed senders. Input values live in state, so
    /// conservation is checked there.
    pub fn semantic_validate(&self) -> Result<(), SemanticError> {
        if self.from.is_empty() {
            return Err(SemanticError::EmptyInputs);
        }
        if self.to.is_empty() {
            return Err(SemanticError::EmptyOutputs);
        }
        if self.from.len() != self.signatures.len() {
            return Err(SemanticError::SignatureCountMismatch {
                expected: self.from.len(),
                actual: self.signatures.len(),
            });
        }

        // Output total must at least be representable.
        let mut total: Amount = 0;
        for output in &self.to {
            total = total
                .checked_add(output.value)
                .ok_or(SemanticError::Overflow)?;
        }
        total.checked_add(self.fee).ok_or(SemanticError::Overflow)?;

        let message = self.message_to_sign();
        for (index, (input, signature)) in self.from.iter().zip(&self.signatures).enumerate() {
            if !input.sender.verify(&message, signature) {
                return Err(SemanticError::InvalidSignature(index));
            }
        }
        Ok(())
    }
}

pub(crate) fn nonce_from_digest(digest: &[u8; 32]) -> Nonce {
    u64::from_be_bytes([
        digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    fn keypair(seed: u8) -> (SigningKey, PublicKey25519) {
        let sk = SigningKey::from_bytes(&[seed; 32]);
        let pk = PublicKey25519(sk.verifying_key().to_bytes());
        (sk, pk)
    }

    fn transfer(seed: u8) -> (SigningKey, PolyTransfer) {
        let (sk, pk) = keypair(seed);
        let (_, pk_to) = keypair(seed + 1);
        let mut tx = PolyTransfer {
            from: vec![TransferInput { sender: pk, nonce: 1 }],
            to: vec![
                TransferOutput { recipient: pk, value: 890 },
                TransferOutput { recipient: pk_to, value: 100 },
            ],
            signatures: vec![],
            fee: 10,
            timestamp: 1_000,
        };
        tx.signatures = vec![Signature25519(sk.sign(&tx.message_to_sign()).to_bytes())];
        (sk, tx)
    }

    #[test]
    fn message_layout_is_outputs_inputs_ts_fee() {
        let (_, tx) = transfer(1);
        let message = tx.message_to_sign();

        // 2 recipients, 1 input id, timestamp, fee.
        assert_eq!(message.len(), 2 * 32 + 32 + 8 + 8);
        assert_eq!(&message[0..32], tx.to[0].recipient.as_bytes());
        assert_eq!(&message[32..64], tx.to[1].recipient.as_bytes());
        assert_eq!(&message[64..96], tx.input_ids()[0].as_bytes());
        assert_eq!(&message[96..104], &1_000u64.to_be_bytes());
        assert_eq!(&message[104..112], &10u64.to_be_bytes());
    }

    #[test]
    fn message_is_deterministic_and_field_sensitive() {
        let (_, tx) = transfer(1);
        assert_eq!(tx.message_to_sign(), tx.message_to_sign());

        let mut bumped_fee = tx.clone();
        bumped_fee.fee += 1;
        assert_ne!(tx.message_to_sign(), bumped_fee.message_to_sign());

        let mut bumped_ts = tx.clone();
        bumped_ts.timestamp += 1;
        assert_ne!(tx.message_to_sign(), bumped_ts.message_to_sign());
    }

    #[test]
    fn semantic_accepts_well_signed_transfer() {
        let (_, tx) = transfer(1);
        tx.semantic_validate().unwrap();
    }

    #[test]
    fn any_signature_bit_flip_fails() {
        let (_, tx) = transfer(1);
        let sig = tx.signatures[0].0;
        for byte in [0usize, 17, 40, 63] {
            for bit in 0..8 {
                let mut tampered = tx.clone();
                tampered.signatures[0].0[byte] = sig[byte] ^ (1 << bit);
                assert_eq!(
                    tampered.semantic_validate(),
                    Err(SemanticError::InvalidSignature(0))
                );
            }
        }
    }

    #[test]
    fn signature_count_must_match_inputs() {
        let (_, mut tx) = transfer(1);
        tx.signatures.clear();
        assert_eq!(
            tx.semantic_validate(),
            Err(SemanticError::SignatureCountMismatch {
                expected: 1,
                actual: 0
            })
        );
    }

    #[test]
    fn empty_sides_rejected() {
        let (_, mut tx) = transfer(1);
        tx.to.clear();
        assert_eq!(tx.semantic_validate(), Err(SemanticError::EmptyOutputs));

        let (_, mut tx) = transfer(1);
        tx.from.clear();
        tx.signatures.clear();
        assert_eq!(tx.semantic_validate(), Err(SemanticError::EmptyInputs));
    }

    #[test]
    fn output_overflow_rejected() {
        let (sk, mut tx) = transfer(1);
        tx.to[0].value = u64::MAX;
        tx.to[1].value = 1;
        tx.signatures = vec![Signature25519(sk.sign(&tx.message_to_sign()).to_bytes())];
        assert_eq!(tx.semantic_validate(), Err(SemanticError::Overflow));
    }

    #[test]
    fn output_nonces_differ_per_index_and_recipient() {
        let (_, tx) = transfer(1);
        let boxes = tx.new_boxes();
        assert_eq!(boxes.len(), 2);
        assert_ne!(boxes[0].nonce, boxes[1].nonce);
        assert_ne!(boxes[0].id(), boxes[1].id());

        // Same transaction, same boxes.
        assert_eq!(boxes, tx.new_boxes());
    }

    #[test]
    fn new_box_ids_track_the_spent_inputs() {
        // Two transfers differing only in the input nonce must not mint
        // colliding boxes.
        let (sk, tx_a) = transfer(1);
        let mut tx_b = tx_a.clone();
        tx_b.from[0].nonce = 2;
        tx_b.signatures = vec![Signature25519(sk.sign(&tx_b.message_to_sign()).to_bytes())];

        let ids_a: Vec<BoxId> = tx_a.new_boxes().iter().map(PolyBox::id).collect();
        let ids_b: Vec<BoxId> = tx_b.new_boxes().iter().map(PolyBox::id).collect();
        assert!(ids_a.iter().all(|id| !ids_b.contains(id)));
    }
}

//! Canonical box codec.
//!
//! Frame: `u32_be(tag_len) || utf8(tag) || body`. Bodies are fixed-layout,
//! big-endian, with length-prefixed variable fields. Field order is
//! consensus-relevant; changing it is a hard fork.
//!
//! Contract values are JSON and their bytes participate in id derivation,
//! so everything routes through [`canonical_json`]: object keys sorted,
//! no insignificant whitespace.

use serde_json::Value;

use lib_crypto::{MofNProposition, PublicKey25519, PUBLIC_KEY_LENGTH};

use crate::errors::{CodecError, CodecResult};
use crate::types::{ArbitBox, ContractBox, PolyBox, ProfileBox, StateBox};

/// Render a JSON value to its canonical bytes.
///
/// `serde_json`'s default map is BTree-backed, so object keys come out
/// sorted at every nesting level, and `to_vec` emits no whitespace. Every
/// id computation that touches JSON must go through here.
pub fn canonical_json(value: &Value) -> Vec<u8> {
    serde_json::to_vec(value).expect("serializing serde_json::Value cannot fail")
}

// =============================================================================
// Cursor helpers
// =============================================================================

fn take<'a>(input: &mut &'a [u8], n: usize) -> CodecResult<&'a [u8]> {
    if input.len() < n {
        return Err(CodecError::UnexpectedEof);
    }
    let (head, rest) = input.split_at(n);
    *input = rest;
    Ok(head)
}

fn read_u32_be(input: &mut &[u8]) -> CodecResult<u32> {
    let b = take(input, 4)?;
    Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

fn read_u64_be(input: &mut &[u8]) -> CodecResult<u64> {
    let b = take(input, 8)?;
    Ok(u64::from_be_bytes([
        b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
    ]))
}

fn read_pubkey(input: &mut &[u8]) -> CodecResult<PublicKey25519> {
    let b = take(input, PUBLIC_KEY_LENGTH)?;
    let mut arr = [0u8; PUBLIC_KEY_LENGTH];
    arr.copy_from_slice(b);
    Ok(PublicKey25519(arr))
}

fn read_string(input: &mut &[u8], what: &'static str) -> CodecResult<String> {
    let len = read_u32_be(input)? as usize;
    let bytes = take(input, len)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8(what))
}

fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) -> CodecResult<()> {
    let len: u32 = bytes
        .len()
        .try_into()
        .map_err(|_| CodecError::LengthOverflow)?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(bytes);
    Ok(())
}

// =============================================================================
// Encoding
// =============================================================================

/// Encode a box to its canonical bytes.
pub fn encode_box(boxed: &StateBox) -> CodecResult<Vec<u8>> {
    let mut out = Vec::new();
    write_bytes(&mut out, boxed.type_tag().as_bytes())?;
    match boxed {
        StateBox::Poly(b) => {
            out.extend_from_slice(b.proposition.as_bytes());
            out.extend_from_slice(&b.nonce.to_be_bytes());
            out.extend_from_slice(&b.value.to_be_bytes());
        }
        StateBox::Arbit(b) => {
            out.extend_from_slice(b.proposition.as_bytes());
            out.extend_from_slice(&b.nonce.to_be_bytes());
            out.extend_from_slice(&b.value.to_be_bytes());
        }
        StateBox::Contract(b) => {
            out.extend_from_slice(&b.proposition.encode());
            out.extend_from_slice(&b.nonce.to_be_bytes());
            write_bytes(&mut out, &canonical_json(&b.value))?;
        }
        StateBox::Profile(b) => {
            // Nonce omitted; fixed at 0 by protocol.
            out.extend_from_slice(b.proposition.as_bytes());
            write_bytes(&mut out, b.value.as_bytes())?;
            write_bytes(&mut out, b.field.as_bytes())?;
        }
    }
    Ok(out)
}

// =============================================================================
// Parsing
// =============================================================================

/// Parse a box from its canonical bytes. Rejects trailing bytes.
pub fn decode_box(bytes: &[u8]) -> CodecResult<StateBox> {
    let mut input = bytes;
    let tag = read_string(&mut input, "type tag")?;

    let boxed = match tag.as_str() {
        "PolyBox" => {
            let proposition = read_pubkey(&mut input)?;
            let nonce = read_u64_be(&mut input)?;
            let value = read_u64_be(&mut input)?;
            StateBox::Poly(PolyBox::new(proposition, nonce, value))
        }
        "ArbitBox" => {
            let proposition = read_pubkey(&mut input)?;
            let nonce = read_u64_be(&mut input)?;
            let value = read_u64_be(&mut input)?;
            StateBox::Arbit(ArbitBox::new(proposition, nonce, value))
        }
        "ContractBox" => {
            let proposition = read_mofn(&mut input)?;
            let nonce = read_u64_be(&mut input)?;
            let json_len = read_u32_be(&mut input)? as usize;
            let json_bytes = take(&mut input, json_len)?;
            let value: Value = serde_json::from_slice(json_bytes)
                .map_err(|e| CodecError::InvalidJson(e.to_string()))?;
            StateBox::Contract(ContractBox::new(proposition, nonce, value))
        }
        "ProfileBox" => {
            let proposition = read_pubkey(&mut input)?;
            let value = read_string(&mut input, "profile value")?;
            let field = read_string(&mut input, "profile field")?;
            StateBox::Profile(ProfileBox::new(proposition, value, field))
        }
        _ => return Err(CodecError::UnknownTypeTag(tag)),
    };

    if !input.is_empty() {
        return Err(CodecError::TrailingBytes);
    }
    Ok(boxed)
}

fn read_mofn(input: &mut &[u8]) -> CodecResult<MofNProposition> {
    let m = read_u32_be(input)?;
    let n = read_u32_be(input)? as usize;
    let mut keys = Vec::with_capacity(n);
    for _ in 0..n {
        keys.push(read_pubkey(input)?);
    }
    let prop = MofNProposition::new(m, keys).map_err(|_| CodecError::InvalidProposition)?;
    // Duplicate keys would silently shrink the set; reject them instead.
    if prop.keys().count() != n {
        return Err(CodecError::InvalidProposition);
    }
    Ok(prop)
}

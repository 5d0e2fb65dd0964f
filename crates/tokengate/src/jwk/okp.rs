//! Edwards-curve JWK material.
//!
//! Only Ed25519 is supported. The `x` member is the RFC 8032 compressed
//! point: 32 bytes with the sign of the x-coordinate folded into the top
//! bit of the final byte.

use serde_json::{Map, Value};

use super::{VerificationKey, b64, required_b64, required_str, validate_alg_family};
use crate::algorithm::KeyFamily;
use crate::error::{Error, Result};

pub(super) fn decode(obj: &Map<String, Value>) -> Result<VerificationKey> {
    validate_alg_family(obj, KeyFamily::Edwards)?;
    let crv = required_str(obj, "crv")?;
    if crv != "Ed25519" {
        return Err(Error::InvalidKey(format!(
            "unsupported Edwards curve \"{crv}\""
        )));
    }
    let x = required_b64(obj, "x")?;
    let x: [u8; 32] = x
        .try_into()
        .map_err(|x: Vec<u8>| {
            Error::InvalidKey(format!("Ed25519 x must be 32 bytes, found {}", x.len()))
        })?;
    let key = ed25519_dalek::VerifyingKey::from_bytes(&x)
        .map_err(|err| Error::InvalidKey(format!("invalid Ed25519 point: {err}")))?;
    Ok(VerificationKey::Ed25519(key))
}

pub(super) fn encode(key: &ed25519_dalek::VerifyingKey) -> Map<String, Value> {
    let mut obj = Map::new();
    obj.insert("kty".to_string(), Value::String("OKP".to_string()));
    obj.insert("crv".to_string(), Value::String("Ed25519".to_string()));
    obj.insert("x".to_string(), b64(key.as_bytes()));
    obj
}

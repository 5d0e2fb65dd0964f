//! RSA JWK material: `n` and `e` as unsigned big-endian magnitudes.

use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPublicKey};
use serde_json::{Map, Value};

use super::{VerificationKey, b64, required_b64, validate_alg_family};
use crate::algorithm::KeyFamily;
use crate::error::{Error, Result};

pub(super) fn decode(obj: &Map<String, Value>) -> Result<VerificationKey> {
    validate_alg_family(obj, KeyFamily::Rsa)?;
    let n = required_b64(obj, "n")?;
    let e = required_b64(obj, "e")?;
    let key = RsaPublicKey::new(BigUint::from_bytes_be(&n), BigUint::from_bytes_be(&e))
        .map_err(|err| Error::InvalidKey(format!("invalid RSA public key: {err}")))?;
    Ok(VerificationKey::Rsa(key))
}

pub(super) fn encode(key: &RsaPublicKey) -> Map<String, Value> {
    let mut obj = Map::new();
    obj.insert("kty".to_string(), Value::String("RSA".to_string()));
    obj.insert("n".to_string(), b64(&key.n().to_bytes_be()));
    obj.insert("e".to_string(), b64(&key.e().to_bytes_be()));
    obj
}

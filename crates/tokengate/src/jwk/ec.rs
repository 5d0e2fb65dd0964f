//! Elliptic-curve JWK material.
//!
//! JWK names the NIST curves `P-256`, `P-384` and `P-521`; other curve
//! names pass through untranslated, which lets a document spell
//! `secp256k1` directly. Coordinates are fixed-width unsigned big-endian
//! at the field size, so short values are left-padded before the point
//! is reconstructed.

use serde_json::{Map, Value};

use super::{VerificationKey, b64, required_b64, required_str, validate_alg_family};
use crate::algorithm::KeyFamily;
use crate::error::{Error, Result};

const SECP256R1_OID: &str = "1.2.840.10045.3.1.7";
const SECP384R1_OID: &str = "1.3.132.0.34";
const SECP521R1_OID: &str = "1.3.132.0.35";
const SECP256K1_OID: &str = "1.3.132.0.10";

fn jwk_curve_to_sec1(crv: &str) -> &str {
    match crv {
        "P-256" => "secp256r1",
        "P-384" => "secp384r1",
        "P-521" => "secp521r1",
        other => other,
    }
}

fn oid_to_jwk_curve(oid: &str) -> Result<&'static str> {
    match oid {
        SECP256R1_OID => Ok("P-256"),
        SECP384R1_OID => Ok("P-384"),
        SECP521R1_OID => Ok("P-521"),
        other => Err(Error::InvalidKey(format!(
            "curve {other} has no JWK name"
        ))),
    }
}

pub(super) fn decode(obj: &Map<String, Value>) -> Result<VerificationKey> {
    validate_alg_family(obj, KeyFamily::EllipticCurve)?;
    let crv = required_str(obj, "crv")?;
    let x = required_b64(obj, "x")?;
    let y = required_b64(obj, "y")?;

    match jwk_curve_to_sec1(crv) {
        "secp256r1" => {
            let sec1 = uncompressed_point(crv, x, y, 32)?;
            let point =
                p256::EncodedPoint::from_bytes(&sec1).map_err(|err| bad_point(crv, &err))?;
            let key = p256::ecdsa::VerifyingKey::from_encoded_point(&point)
                .map_err(|err| bad_point(crv, &err))?;
            Ok(VerificationKey::P256(key))
        }
        "secp384r1" => {
            let sec1 = uncompressed_point(crv, x, y, 48)?;
            let point =
                p384::EncodedPoint::from_bytes(&sec1).map_err(|err| bad_point(crv, &err))?;
            let key = p384::ecdsa::VerifyingKey::from_encoded_point(&point)
                .map_err(|err| bad_point(crv, &err))?;
            Ok(VerificationKey::P384(key))
        }
        "secp521r1" => {
            let sec1 = uncompressed_point(crv, x, y, 66)?;
            let point =
                p521::EncodedPoint::from_bytes(&sec1).map_err(|err| bad_point(crv, &err))?;
            let key = p521::ecdsa::VerifyingKey::from_encoded_point(&point)
                .map_err(|err| bad_point(crv, &err))?;
            Ok(VerificationKey::P521(key))
        }
        "secp256k1" => {
            let sec1 = uncompressed_point(crv, x, y, 32)?;
            let point =
                k256::EncodedPoint::from_bytes(&sec1).map_err(|err| bad_point(crv, &err))?;
            let key = k256::ecdsa::VerifyingKey::from_encoded_point(&point)
                .map_err(|err| bad_point(crv, &err))?;
            Ok(VerificationKey::Secp256k1(key))
        }
        other => Err(Error::InvalidKey(format!("unsupported curve \"{other}\""))),
    }
}

pub(super) fn encode(key: &VerificationKey) -> Result<Map<String, Value>> {
    match key {
        VerificationKey::P256(k) => ec_object(SECP256R1_OID, k.to_encoded_point(false).as_bytes()),
        VerificationKey::P384(k) => ec_object(SECP384R1_OID, k.to_encoded_point(false).as_bytes()),
        VerificationKey::P521(k) => ec_object(SECP521R1_OID, k.to_encoded_point(false).as_bytes()),
        VerificationKey::Secp256k1(k) => {
            ec_object(SECP256K1_OID, k.to_encoded_point(false).as_bytes())
        }
        _ => Err(Error::InvalidKey("not an elliptic-curve key".to_string())),
    }
}

// `sec1` must be the uncompressed form, 0x04 || x || y at field width.
fn ec_object(oid: &str, sec1: &[u8]) -> Result<Map<String, Value>> {
    let crv = oid_to_jwk_curve(oid)?;
    if sec1.first() != Some(&0x04) || sec1.len() < 3 || sec1.len() % 2 != 1 {
        return Err(Error::InvalidKey(
            "point is not in uncompressed form".to_string(),
        ));
    }
    let coordinates = &sec1[1..];
    let (x, y) = coordinates.split_at(coordinates.len() / 2);
    let mut obj = Map::new();
    obj.insert("kty".to_string(), Value::String("EC".to_string()));
    obj.insert("crv".to_string(), Value::String(crv.to_string()));
    obj.insert("x".to_string(), b64(x));
    obj.insert("y".to_string(), b64(y));
    Ok(obj)
}

fn uncompressed_point(crv: &str, x: Vec<u8>, y: Vec<u8>, width: usize) -> Result<Vec<u8>> {
    let mut sec1 = Vec::with_capacity(1 + 2 * width);
    sec1.push(0x04);
    sec1.extend_from_slice(&pad(crv, x, width)?);
    sec1.extend_from_slice(&pad(crv, y, width)?);
    Ok(sec1)
}

fn pad(crv: &str, mut bytes: Vec<u8>, width: usize) -> Result<Vec<u8>> {
    if bytes.len() > width {
        return Err(Error::InvalidKey(format!(
            "coordinate is {} bytes but {crv} allows at most {width}",
            bytes.len()
        )));
    }
    if bytes.len() < width {
        let mut padded = vec![0u8; width - bytes.len()];
        padded.append(&mut bytes);
        bytes = padded;
    }
    Ok(bytes)
}

fn bad_point(crv: &str, err: &dyn std::fmt::Display) -> Error {
    Error::InvalidKey(format!("invalid point on {crv}: {err}"))
}

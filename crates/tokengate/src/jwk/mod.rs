//! JSON Web Key decoding, encoding and signature verification
//!
//! A [`JsonWebKey`] pairs the JSON form of a key with its decoded
//! cryptographic material. Decoding dispatches on `kty` (RSA first, then
//! EC, then OKP) and tolerates the nonstandard `RSASSA` alias some
//! issuers emit. The JSON form is retained verbatim so claims this crate
//! does not interpret survive a decode/encode cycle.

mod ec;
mod okp;
mod rsa;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Map, Value};
use sha2::{Sha256, Sha384, Sha512};
use signature::Verifier;

use crate::algorithm::{JsonWebAlgorithm, KeyFamily};
use crate::error::{Error, Result};

/// Decoded public key material, tagged by family and curve.
#[derive(Clone)]
pub enum VerificationKey {
    Rsa(::rsa::RsaPublicKey),
    P256(p256::ecdsa::VerifyingKey),
    P384(p384::ecdsa::VerifyingKey),
    P521(p521::ecdsa::VerifyingKey),
    Secp256k1(k256::ecdsa::VerifyingKey),
    Ed25519(ed25519_dalek::VerifyingKey),
}

// Not all curve backends expose `Debug` on their verifying keys, and
// public key coordinates are noise in logs anyway. Print the variant only.
impl std::fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let variant = match self {
            Self::Rsa(_) => "Rsa",
            Self::P256(_) => "P256",
            Self::P384(_) => "P384",
            Self::P521(_) => "P521",
            Self::Secp256k1(_) => "Secp256k1",
            Self::Ed25519(_) => "Ed25519",
        };
        f.debug_tuple(variant).finish()
    }
}

impl VerificationKey {
    /// The JWK `kty` value this key belongs under.
    pub fn kty(&self) -> &'static str {
        match self {
            Self::Rsa(_) => "RSA",
            Self::P256(_) | Self::P384(_) | Self::P521(_) | Self::Secp256k1(_) => "EC",
            Self::Ed25519(_) => "OKP",
        }
    }

    /// Verify `signature` over `message` under `algorithm`.
    ///
    /// The algorithm must match the key material; an RSA algorithm
    /// against an EC key (or a P-256 key against `ES384`) is
    /// [`Error::IncompatibleKey`], not a verification failure.
    pub fn verify(
        &self,
        algorithm: JsonWebAlgorithm,
        signature: &[u8],
        message: &[u8],
    ) -> Result<()> {
        use JsonWebAlgorithm as Alg;

        let bad_signature = |_| Error::Verification;

        match (algorithm, self) {
            (Alg::RS256, Self::Rsa(key)) => {
                let sig = ::rsa::pkcs1v15::Signature::try_from(signature).map_err(bad_signature)?;
                ::rsa::pkcs1v15::VerifyingKey::<Sha256>::new(key.clone())
                    .verify(message, &sig)
                    .map_err(bad_signature)
            }
            (Alg::RS384, Self::Rsa(key)) => {
                let sig = ::rsa::pkcs1v15::Signature::try_from(signature).map_err(bad_signature)?;
                ::rsa::pkcs1v15::VerifyingKey::<Sha384>::new(key.clone())
                    .verify(message, &sig)
                    .map_err(bad_signature)
            }
            (Alg::RS512, Self::Rsa(key)) => {
                let sig = ::rsa::pkcs1v15::Signature::try_from(signature).map_err(bad_signature)?;
                ::rsa::pkcs1v15::VerifyingKey::<Sha512>::new(key.clone())
                    .verify(message, &sig)
                    .map_err(bad_signature)
            }
            (Alg::PS256, Self::Rsa(key)) => {
                let sig = ::rsa::pss::Signature::try_from(signature).map_err(bad_signature)?;
                ::rsa::pss::VerifyingKey::<Sha256>::new(key.clone())
                    .verify(message, &sig)
                    .map_err(bad_signature)
            }
            (Alg::PS384, Self::Rsa(key)) => {
                let sig = ::rsa::pss::Signature::try_from(signature).map_err(bad_signature)?;
                ::rsa::pss::VerifyingKey::<Sha384>::new(key.clone())
                    .verify(message, &sig)
                    .map_err(bad_signature)
            }
            (Alg::PS512, Self::Rsa(key)) => {
                let sig = ::rsa::pss::Signature::try_from(signature).map_err(bad_signature)?;
                ::rsa::pss::VerifyingKey::<Sha512>::new(key.clone())
                    .verify(message, &sig)
                    .map_err(bad_signature)
            }
            (Alg::ES256, Self::P256(key)) => {
                let sig = p256::ecdsa::Signature::from_slice(signature).map_err(bad_signature)?;
                key.verify(message, &sig).map_err(bad_signature)
            }
            (Alg::ES384, Self::P384(key)) => {
                let sig = p384::ecdsa::Signature::from_slice(signature).map_err(bad_signature)?;
                key.verify(message, &sig).map_err(bad_signature)
            }
            (Alg::ES512, Self::P521(key)) => {
                let sig = p521::ecdsa::Signature::from_slice(signature).map_err(bad_signature)?;
                key.verify(message, &sig).map_err(bad_signature)
            }
            (Alg::ES256K, Self::Secp256k1(key)) => {
                let sig = k256::ecdsa::Signature::from_slice(signature).map_err(bad_signature)?;
                key.verify(message, &sig).map_err(bad_signature)
            }
            (Alg::EdDSA, Self::Ed25519(key)) => {
                let sig =
                    ed25519_dalek::Signature::from_slice(signature).map_err(bad_signature)?;
                key.verify(message, &sig).map_err(bad_signature)
            }
            (algorithm, key) => Err(Error::IncompatibleKey {
                algorithm: algorithm.as_str().to_string(),
                kty: key.kty().to_string(),
            }),
        }
    }
}

/// A key from a JWKS document, decoded and ready to verify with.
#[derive(Debug, Clone)]
pub struct JsonWebKey {
    kid: String,
    key_use: Option<String>,
    json: Value,
    key: VerificationKey,
}

impl JsonWebKey {
    /// Decode one member of a JWKS `keys` array.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] for a missing or empty `kid`, an
    /// unsupported `kty`, an `alg` from the wrong family, or material
    /// that does not form a valid public key.
    pub fn from_json(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| Error::InvalidKey("JWK must be a JSON object".to_string()))?;

        let kid = required_str(obj, "kid")?.to_string();
        let kty = required_str(obj, "kty")?;

        let key = match kty {
            "RSA" | "RSASSA" => rsa::decode(obj)?,
            "EC" => ec::decode(obj)?,
            "OKP" => okp::decode(obj)?,
            other => {
                return Err(Error::InvalidKey(format!("unsupported kty \"{other}\"")));
            }
        };

        Ok(Self {
            kid,
            key_use: obj.get("use").and_then(Value::as_str).map(str::to_string),
            json: value.clone(),
            key,
        })
    }

    /// Build a JWK around key material obtained outside a JWKS document,
    /// such as a PEM endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] for a curve that has no JWK name,
    /// which is the case for secp256k1.
    pub fn from_verification_key(kid: &str, key: VerificationKey) -> Result<Self> {
        if kid.is_empty() {
            return Err(Error::InvalidKey("kid must not be empty".to_string()));
        }
        let mut obj = match &key {
            VerificationKey::Rsa(k) => rsa::encode(k),
            VerificationKey::P256(_)
            | VerificationKey::P384(_)
            | VerificationKey::P521(_)
            | VerificationKey::Secp256k1(_) => ec::encode(&key)?,
            VerificationKey::Ed25519(k) => okp::encode(k),
        };
        obj.insert("kid".to_string(), Value::String(kid.to_string()));
        Ok(Self {
            kid: kid.to_string(),
            key_use: None,
            json: Value::Object(obj),
            key,
        })
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// The `use` member, if the document carried one.
    pub fn key_use(&self) -> Option<&str> {
        self.key_use.as_deref()
    }

    /// The `alg` member exactly as the document spelled it.
    pub fn algorithm(&self) -> Option<&str> {
        self.json.get("alg").and_then(Value::as_str)
    }

    /// The JSON form of the key, unmodified from the source document.
    pub fn as_json(&self) -> &Value {
        &self.json
    }

    pub fn verification_key(&self) -> &VerificationKey {
        &self.key
    }

    /// Verify `signature` over `message` under `algorithm`.
    pub fn verify(
        &self,
        algorithm: JsonWebAlgorithm,
        signature: &[u8],
        message: &[u8],
    ) -> Result<()> {
        if self.algorithm() == Some("none") {
            return Err(Error::DisallowedAlgorithm("none".to_string()));
        }
        self.key.verify(algorithm, signature, message)
    }
}

fn required_str<'a>(obj: &'a Map<String, Value>, name: &str) -> Result<&'a str> {
    match obj.get(name).and_then(Value::as_str) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::InvalidKey(format!(
            "JWK is missing required member \"{name}\""
        ))),
    }
}

fn required_b64(obj: &Map<String, Value>, name: &str) -> Result<Vec<u8>> {
    let text = required_str(obj, name)?;
    URL_SAFE_NO_PAD
        .decode(text)
        .map_err(|err| Error::InvalidKey(format!("JWK member \"{name}\" is not base64url: {err}")))
}

fn b64(bytes: &[u8]) -> Value {
    Value::String(URL_SAFE_NO_PAD.encode(bytes))
}

/// Reject keys whose declared `alg` belongs to a different family than
/// their `kty` implies. A key without an `alg` member is acceptable.
fn validate_alg_family(obj: &Map<String, Value>, family: KeyFamily) -> Result<()> {
    let Some(alg) = obj.get("alg").and_then(Value::as_str) else {
        return Ok(());
    };
    let alg: JsonWebAlgorithm = alg
        .parse()
        .map_err(|_| Error::InvalidKey(format!("JWK declares unknown alg \"{alg}\"")))?;
    if alg.family() != family {
        return Err(Error::InvalidKey(format!(
            "JWK declares alg {alg} but has kty {}",
            family.kty()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dispatches_on_kty_and_accepts_rsassa_alias() {
        // RFC 7515 appendix A.2 modulus.
        let n = "ofgWCuLjybRlzo0tZWJjNiuSfb4p4fAkd_wWJcyQoTbji9k0l8W26mPddx\
                 HmfHQp-Vaw-4qPCJrcS2mJPMEzP1Pt0Bm4d4QlL-yRT-SFd2lZS-pCgNMs\
                 D1W_YpRPEwOWvG6b32690r2jZ47soMZo9wGzjb_7OMg0LOL-bSf63kpaSH\
                 SXndS5z5rexMdbBYUsLA9e-KXBdQOS-UTo7WTBEMa2R2CapHg665xsmtdV\
                 MTBQY4uDZlxvb3qCo5ZwKh9kG4LT6_I5IhlJH7aGhyxXFvUK-DWNmoudF8\
                 NAco9_h9iaGNj8q2ethFkMLs91kzk2PAcDTW9gb54h4FRWyuXpoQ";
        let jwk = JsonWebKey::from_json(&json!({
            "kid": "2011-04-29", "kty": "RSA", "n": n, "e": "AQAB"
        }))
        .unwrap();
        assert!(matches!(jwk.verification_key(), VerificationKey::Rsa(_)));
        assert_eq!(jwk.kid(), "2011-04-29");

        let alias = JsonWebKey::from_json(&json!({
            "kid": "2011-04-29", "kty": "RSASSA", "n": n, "e": "AQAB"
        }))
        .unwrap();
        assert!(matches!(alias.verification_key(), VerificationKey::Rsa(_)));

        assert!(matches!(
            JsonWebKey::from_json(&json!({"kid": "k", "kty": "oct", "k": "AQAB"})),
            Err(Error::InvalidKey(_))
        ));
    }

    #[test]
    fn kid_is_required_and_nonempty() {
        for jwk in [
            json!({"kty": "RSA", "n": "AQAB", "e": "AQAB"}),
            json!({"kid": "", "kty": "RSA", "n": "AQAB", "e": "AQAB"}),
        ] {
            assert!(matches!(
                JsonWebKey::from_json(&jwk),
                Err(Error::InvalidKey(_))
            ));
        }
    }

    #[test]
    fn alg_family_mismatch_is_rejected() {
        let err = validate_alg_family(
            json!({"alg": "ES256"}).as_object().unwrap(),
            KeyFamily::Rsa,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidKey(_)));

        assert!(
            validate_alg_family(json!({"alg": "RS256"}).as_object().unwrap(), KeyFamily::Rsa)
                .is_ok()
        );
        assert!(validate_alg_family(json!({}).as_object().unwrap(), KeyFamily::Rsa).is_ok());
    }

    #[test]
    fn incompatible_algorithm_and_key_do_not_verify() {
        let (_, key) = ed25519_keypair();
        let jwk = JsonWebKey::from_verification_key("ed", VerificationKey::Ed25519(key)).unwrap();
        let err = jwk
            .verify(JsonWebAlgorithm::ES256, &[0u8; 64], b"message")
            .unwrap_err();
        assert!(matches!(err, Error::IncompatibleKey { .. }));
    }

    #[test]
    fn ed25519_sign_and_verify_round_trip() {
        let (signing, verifying) = ed25519_keypair();
        use ed25519_dalek::Signer;
        let message = b"header.payload";
        let sig = signing.sign(message);
        let jwk =
            JsonWebKey::from_verification_key("ed", VerificationKey::Ed25519(verifying)).unwrap();
        jwk.verify(JsonWebAlgorithm::EdDSA, &sig.to_bytes(), message)
            .unwrap();
        assert!(matches!(
            jwk.verify(JsonWebAlgorithm::EdDSA, &sig.to_bytes(), b"tampered"),
            Err(Error::Verification)
        ));
    }

    fn ed25519_keypair() -> (ed25519_dalek::SigningKey, ed25519_dalek::VerifyingKey) {
        let signing = ed25519_dalek::SigningKey::generate(&mut rand::rngs::OsRng);
        let verifying = signing.verifying_key();
        (signing, verifying)
    }

    #[test]
    fn debug_output_names_the_curve_without_key_material() {
        let p521 = p521::ecdsa::SigningKey::random(&mut rand::rngs::OsRng);
        let key = VerificationKey::P521(p521::ecdsa::VerifyingKey::from(&p521));
        assert_eq!(format!("{key:?}"), "P521");

        let (_, verifying) = ed25519_keypair();
        let jwk =
            JsonWebKey::from_verification_key("ed", VerificationKey::Ed25519(verifying)).unwrap();
        assert!(format!("{jwk:?}").contains("Ed25519"));
    }
}

//! JSON Web Signature algorithms (RFC 7518)
//!
//! Only asymmetric signing algorithms are represented, plus the explicit
//! `none` algorithm so that it can be recognized and rejected. Each
//! algorithm belongs to a [`KeyFamily`], which is what the JWK codec uses
//! to reject key-confusion attempts (e.g. an `RS256` hint on an EC key).

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// The family of key material an algorithm operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyFamily {
    /// RSA keys (`kty` = `RSA`): RS* and PS* algorithms.
    Rsa,
    /// Elliptic-curve keys (`kty` = `EC`): ES* algorithms.
    EllipticCurve,
    /// Edwards-curve keys (`kty` = `OKP`): EdDSA.
    Edwards,
    /// The `none` algorithm has no key at all.
    None,
}

impl KeyFamily {
    /// The `kty` value keys of this family carry in a JWK.
    pub fn kty(self) -> &'static str {
        match self {
            KeyFamily::Rsa => "RSA",
            KeyFamily::EllipticCurve => "EC",
            KeyFamily::Edwards => "OKP",
            KeyFamily::None => "none",
        }
    }
}

/// A JWS signing algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::upper_case_acronyms)]
pub enum JsonWebAlgorithm {
    /// RSASSA-PKCS1-v1_5 with SHA-256.
    RS256,
    /// RSASSA-PKCS1-v1_5 with SHA-384.
    RS384,
    /// RSASSA-PKCS1-v1_5 with SHA-512.
    RS512,
    /// RSASSA-PSS with SHA-256.
    PS256,
    /// RSASSA-PSS with SHA-384.
    PS384,
    /// RSASSA-PSS with SHA-512.
    PS512,
    /// ECDSA on P-256 with SHA-256.
    ES256,
    /// ECDSA on P-384 with SHA-384.
    ES384,
    /// ECDSA on P-521 with SHA-512.
    ES512,
    /// ECDSA on secp256k1 with SHA-256.
    ES256K,
    /// Edwards-curve signatures (Ed25519).
    EdDSA,
    /// The explicit unsigned algorithm; never acceptable for validation.
    None,
}

impl JsonWebAlgorithm {
    /// Every algorithm that actually signs; the default permitted set.
    pub const SIGNING: [JsonWebAlgorithm; 11] = [
        JsonWebAlgorithm::EdDSA,
        JsonWebAlgorithm::ES256,
        JsonWebAlgorithm::ES384,
        JsonWebAlgorithm::ES512,
        JsonWebAlgorithm::PS256,
        JsonWebAlgorithm::PS384,
        JsonWebAlgorithm::PS512,
        JsonWebAlgorithm::ES256K,
        JsonWebAlgorithm::RS256,
        JsonWebAlgorithm::RS384,
        JsonWebAlgorithm::RS512,
    ];

    /// The RFC 7518 name of the algorithm.
    pub fn as_str(self) -> &'static str {
        match self {
            JsonWebAlgorithm::RS256 => "RS256",
            JsonWebAlgorithm::RS384 => "RS384",
            JsonWebAlgorithm::RS512 => "RS512",
            JsonWebAlgorithm::PS256 => "PS256",
            JsonWebAlgorithm::PS384 => "PS384",
            JsonWebAlgorithm::PS512 => "PS512",
            JsonWebAlgorithm::ES256 => "ES256",
            JsonWebAlgorithm::ES384 => "ES384",
            JsonWebAlgorithm::ES512 => "ES512",
            JsonWebAlgorithm::ES256K => "ES256K",
            JsonWebAlgorithm::EdDSA => "EdDSA",
            JsonWebAlgorithm::None => "none",
        }
    }

    /// The key family this algorithm operates on.
    pub fn family(self) -> KeyFamily {
        match self {
            JsonWebAlgorithm::RS256
            | JsonWebAlgorithm::RS384
            | JsonWebAlgorithm::RS512
            | JsonWebAlgorithm::PS256
            | JsonWebAlgorithm::PS384
            | JsonWebAlgorithm::PS512 => KeyFamily::Rsa,
            JsonWebAlgorithm::ES256
            | JsonWebAlgorithm::ES384
            | JsonWebAlgorithm::ES512
            | JsonWebAlgorithm::ES256K => KeyFamily::EllipticCurve,
            JsonWebAlgorithm::EdDSA => KeyFamily::Edwards,
            JsonWebAlgorithm::None => KeyFamily::None,
        }
    }
}

impl fmt::Display for JsonWebAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JsonWebAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RS256" => Ok(JsonWebAlgorithm::RS256),
            "RS384" => Ok(JsonWebAlgorithm::RS384),
            "RS512" => Ok(JsonWebAlgorithm::RS512),
            "PS256" => Ok(JsonWebAlgorithm::PS256),
            "PS384" => Ok(JsonWebAlgorithm::PS384),
            "PS512" => Ok(JsonWebAlgorithm::PS512),
            "ES256" => Ok(JsonWebAlgorithm::ES256),
            "ES384" => Ok(JsonWebAlgorithm::ES384),
            "ES512" => Ok(JsonWebAlgorithm::ES512),
            "ES256K" => Ok(JsonWebAlgorithm::ES256K),
            "EdDSA" => Ok(JsonWebAlgorithm::EdDSA),
            "none" => Ok(JsonWebAlgorithm::None),
            other => Err(Error::UnknownAlgorithm(other.to_string())),
        }
    }
}

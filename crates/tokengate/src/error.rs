//! Error types for token validation and key resolution
//!
//! One crate-wide error enum, grouped by the stage that produces it:
//! structural parse errors, policy errors, key-resolution errors and
//! codec errors. The validator folds every failure of the verify/claim
//! stages into [`Error::ValidationFailed`] so that callers see a uniform
//! message while the underlying cause stays available via `source()`.

use std::sync::Arc;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while resolving keys and validating tokens.
#[derive(Debug, Error)]
pub enum Error {
    // --- Structural / parse ---
    /// The compact token (or one of its segments) is not well formed.
    #[error("parse of token failed: {0}")]
    Parse(String),

    // --- Policy ---
    /// The token declares an algorithm that is not in the permitted set.
    #[error("algorithm {0} is not permitted")]
    DisallowedAlgorithm(String),

    /// The declared algorithm is not one this crate knows about.
    #[error("unknown signing algorithm {0}")]
    UnknownAlgorithm(String),

    /// The issuer failed the acceptability check.
    #[error("issuer is not acceptable")]
    UnacceptableIssuer,

    /// The token's `iss` claim does not equal the issuer supplied by the caller.
    #[error("issuer in token does not match the expected issuer")]
    IssuerMismatch,

    /// A claim the configuration requires is absent.
    #[error("token does not include the {0} claim")]
    MissingClaim(&'static str),

    /// None of the required audiences appear in the token's `aud` claim.
    #[error("required audience not found in token")]
    AudienceMismatch,

    /// The token's `exp` claim (seconds since the epoch) is in the past.
    #[error("token is not valid after {0}")]
    Expired(i64),

    /// The token's `nbf` claim (seconds since the epoch) is in the future.
    #[error("token is not valid until {0}")]
    NotYetValid(i64),

    /// The caller or the resolver is misconfigured.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A key id contains characters outside the permitted charset.
    #[error("key id contains characters outside the permitted set")]
    InvalidKeyId,

    // --- Key resolution ---
    /// An HTTP request failed at the transport level.
    #[error("request to {url} failed")]
    Fetch {
        /// The URL that was being fetched.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// An HTTP request completed with a non-2xx status.
    #[error("request to {url} returned status {status}")]
    FetchStatus {
        /// The URL that was fetched.
        url: String,
        /// The response status code.
        status: u16,
    },

    /// No configured endpoint knows the requested key.
    #[error("key {0:?} could not be found")]
    KeyNotFound(String),

    /// Every configured JWKS endpoint failed during a refresh.
    #[error("all configured JWKS endpoints failed")]
    AllEndpointsFailed,

    // --- Codec ---
    /// A JWK is missing required fields or carries invalid key material.
    #[error("invalid JWK: {0}")]
    InvalidKey(String),

    // --- Verification ---
    /// The token carries no signature.
    #[error("token has no signature")]
    MissingSignature,

    /// The signature does not verify against the resolved key.
    #[error("signature verification failed")]
    Verification,

    /// The declared algorithm cannot be used with the resolved key.
    #[error("algorithm {algorithm} cannot be used with a {kty} key")]
    IncompatibleKey {
        /// The algorithm declared in the token header.
        algorithm: String,
        /// The key type of the resolved key.
        kty: String,
    },

    // --- Cache plumbing ---
    /// A failure shared between every waiter of a single-flight load.
    #[error(transparent)]
    Shared(#[from] Arc<Error>),

    /// A cache loader panicked; treated as an ordinary load failure.
    #[error("cache loader panicked")]
    LoaderPanicked,

    // --- Uniform wrapper ---
    /// Verification or claim checking failed; the cause is preserved as
    /// `source()` for diagnostics but callers only see the algorithm.
    #[error("validation of {algorithm} signed token failed")]
    ValidationFailed {
        /// The algorithm the token declared.
        algorithm: String,
        /// The underlying failure.
        #[source]
        cause: Box<Error>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn validation_failed_message_is_uniform() {
        let err = Error::ValidationFailed {
            algorithm: "RS256".to_string(),
            cause: Box::new(Error::Expired(12345)),
        };
        assert_eq!(err.to_string(), "validation of RS256 signed token failed");
        let source = err.source().expect("cause should be preserved");
        assert_eq!(source.to_string(), "token is not valid after 12345");
    }

    #[test]
    fn shared_errors_display_transparently() {
        let inner = Arc::new(Error::KeyNotFound("kid-1".to_string()));
        let err = Error::Shared(inner);
        assert_eq!(err.to_string(), "key \"kid-1\" could not be found");
    }
}

//! Token validation pipeline
//!
//! One pass per token: parse, gate the algorithm, resolve the key,
//! verify the signature, then check claims against a single wall-clock
//! reading. The key fetch is the only suspending step. Any failure from
//! the key fetch onward is wrapped in [`Error::ValidationFailed`] so
//! callers see one normalized rejection while the cause stays attached
//! for diagnostics.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use tracing::debug;

use crate::algorithm::JsonWebAlgorithm;
use crate::cache::now_epoch_ms;
use crate::error::{Error, Result};
use crate::resolver::{IssuerAcceptability, KeyResolver};
use crate::token::Jwt;

/// Validates signed tokens against a key resolver and an issuer policy.
///
/// Configuration is by consuming builder methods. Defaults: every
/// signing algorithm permitted, `exp` and `nbf` required, no leeway.
pub struct TokenValidator {
    resolver: Arc<dyn KeyResolver>,
    acceptability: Arc<dyn IssuerAcceptability>,
    permitted_algorithms: HashSet<JsonWebAlgorithm>,
    require_expiration: bool,
    require_not_before: bool,
    time_leeway: Duration,
    minimum_key_cache_lifetime: Duration,
}

impl TokenValidator {
    pub fn new(
        resolver: Arc<dyn KeyResolver>,
        acceptability: Arc<dyn IssuerAcceptability>,
    ) -> Self {
        Self {
            resolver,
            acceptability,
            permitted_algorithms: JsonWebAlgorithm::SIGNING.into_iter().collect(),
            require_expiration: true,
            require_not_before: true,
            time_leeway: Duration::ZERO,
            minimum_key_cache_lifetime: Duration::ZERO,
        }
    }

    /// Replace the permitted-algorithm set.
    ///
    /// # Errors
    ///
    /// Rejects an empty set and rejects `none`, which is never
    /// acceptable no matter how explicitly it is asked for.
    pub fn with_permitted_algorithms(
        mut self,
        algorithms: impl IntoIterator<Item = JsonWebAlgorithm>,
    ) -> Result<Self> {
        let algorithms: HashSet<JsonWebAlgorithm> = algorithms.into_iter().collect();
        if algorithms.contains(&JsonWebAlgorithm::None) {
            return Err(Error::Configuration(
                "the none algorithm cannot be permitted".to_string(),
            ));
        }
        if algorithms.is_empty() {
            return Err(Error::Configuration(
                "at least one algorithm must be permitted".to_string(),
            ));
        }
        self.permitted_algorithms = algorithms;
        Ok(self)
    }

    /// Permit one more algorithm on top of the current set.
    ///
    /// # Errors
    ///
    /// Rejects `none`.
    pub fn permit_algorithm(mut self, algorithm: JsonWebAlgorithm) -> Result<Self> {
        if algorithm == JsonWebAlgorithm::None {
            return Err(Error::Configuration(
                "the none algorithm cannot be permitted".to_string(),
            ));
        }
        self.permitted_algorithms.insert(algorithm);
        Ok(self)
    }

    /// Whether a token without `exp` is rejected. Defaults to true.
    pub fn with_require_expiration(mut self, require: bool) -> Self {
        self.require_expiration = require;
        self
    }

    /// Whether a token without `nbf` is rejected. Defaults to true.
    pub fn with_require_not_before(mut self, require: bool) -> Self {
        self.require_not_before = require;
        self
    }

    /// Clock-skew allowance applied to both `exp` and `nbf`.
    pub fn with_time_leeway(mut self, leeway: Duration) -> Self {
        self.time_leeway = leeway;
        self
    }

    /// Accepted and stored for deployment wiring; no TTL computation in
    /// this crate currently reads it.
    pub fn with_minimum_key_cache_lifetime(mut self, lifetime: Duration) -> Self {
        self.minimum_key_cache_lifetime = lifetime;
        self
    }

    pub fn minimum_key_cache_lifetime(&self) -> Duration {
        self.minimum_key_cache_lifetime
    }

    /// Validate `token` and return its parsed form.
    ///
    /// `issuer`, when supplied by the caller, must match the token's
    /// `iss` exactly; pass `None` when the deployment trusts whatever
    /// acceptable issuer the token names. `required_audiences` must
    /// always be supplied; `ignore_required_audiences` skips the
    /// intersection check but not the presence of the `aud` claim.
    ///
    /// # Errors
    ///
    /// Parse, algorithm and empty-payload rejections surface directly.
    /// Everything from key resolution onward is wrapped in
    /// [`Error::ValidationFailed`].
    pub async fn validate_token(
        &self,
        issuer: Option<&str>,
        token: &str,
        required_audiences: Option<&[String]>,
        ignore_required_audiences: bool,
    ) -> Result<Jwt> {
        let jwt = Jwt::parse(token)?;

        let algorithm = jwt.algorithm()?;
        if algorithm == JsonWebAlgorithm::None
            || !self.permitted_algorithms.contains(&algorithm)
        {
            return Err(Error::DisallowedAlgorithm(algorithm.as_str().to_string()));
        }

        if jwt.claim_count() == 0 {
            return Err(Error::Parse("token payload contains no claims".to_string()));
        }

        let outcome = self
            .verify_and_check_claims(
                issuer,
                &jwt,
                algorithm,
                required_audiences,
                ignore_required_audiences,
            )
            .await;
        match outcome {
            Ok(()) => Ok(jwt),
            Err(cause) => {
                debug!(algorithm = %algorithm, error = %cause, "token rejected");
                Err(Error::ValidationFailed {
                    algorithm: algorithm.as_str().to_string(),
                    cause: Box::new(cause),
                })
            }
        }
    }

    async fn verify_and_check_claims(
        &self,
        issuer: Option<&str>,
        jwt: &Jwt,
        algorithm: JsonWebAlgorithm,
        required_audiences: Option<&[String]>,
        ignore_required_audiences: bool,
    ) -> Result<()> {
        let key = self
            .resolver
            .find_key(issuer, jwt.key_id().unwrap_or(""))
            .await?;

        let signature = jwt
            .signature()
            .filter(|s| !s.is_empty())
            .ok_or(Error::MissingSignature)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| Error::Verification)?;
        key.verify(algorithm, &signature, jwt.signature_base().as_bytes())?;

        self.check_claims(issuer, jwt, required_audiences, ignore_required_audiences)
    }

    fn check_claims(
        &self,
        issuer: Option<&str>,
        jwt: &Jwt,
        required_audiences: Option<&[String]>,
        ignore_required_audiences: bool,
    ) -> Result<()> {
        let now_ms = now_epoch_ms() as i64;
        let leeway_ms = self.time_leeway.as_millis() as i64;

        let token_issuer = jwt
            .issuer()
            .filter(|iss| !iss.is_empty())
            .ok_or(Error::MissingClaim("iss"))?;
        if !self.acceptability.is_acceptable(token_issuer) {
            return Err(Error::UnacceptableIssuer);
        }
        if let Some(expected) = issuer {
            if expected != token_issuer {
                return Err(Error::IssuerMismatch);
            }
        }

        match jwt.expiration() {
            Some(exp) => {
                if exp.saturating_mul(1000) < now_ms - leeway_ms {
                    return Err(Error::Expired(exp));
                }
            }
            None => {
                if self.require_expiration {
                    return Err(Error::MissingClaim("exp"));
                }
            }
        }

        match jwt.not_before() {
            Some(nbf) => {
                if nbf.saturating_mul(1000) > now_ms + leeway_ms {
                    return Err(Error::NotYetValid(nbf));
                }
            }
            None => {
                if self.require_not_before {
                    return Err(Error::MissingClaim("nbf"));
                }
            }
        }

        let Some(required) = required_audiences else {
            return Err(Error::Configuration(
                "a required audience list must be supplied".to_string(),
            ));
        };
        if !ignore_required_audiences && required.is_empty() {
            return Err(Error::Configuration(
                "the required audience list must not be empty".to_string(),
            ));
        }
        let audiences = jwt.audience().ok_or(Error::MissingClaim("aud"))?;
        if !ignore_required_audiences
            && !audiences.iter().any(|aud| required.contains(aud))
        {
            return Err(Error::AudienceMismatch);
        }

        jwt.subject()
            .filter(|sub| !sub.is_empty())
            .ok_or(Error::MissingClaim("sub"))?;

        Ok(())
    }
}

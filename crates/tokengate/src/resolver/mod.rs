//! Key resolution strategies
//!
//! Three resolvers sit behind [`KeyResolver`]: OpenID discovery
//! ([`DiscoveryKeyResolver`]), a fixed set of JWKS endpoints
//! ([`StaticSetKeyResolver`]) and a key-per-URL vendor scheme
//! ([`KeyByIdResolver`]). All are safe for concurrent use and cache
//! whatever they fetch for as long as the serving side allows.

mod discovery;
mod key_by_id;
mod static_set;

pub use discovery::{DiscoveryData, DiscoveryKeyResolver};
pub use key_by_id::KeyByIdResolver;
pub use static_set::StaticSetKeyResolver;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::error::{Error, Result};
use crate::jwk::JsonWebKey;

/// Resolves the verification key for a token.
#[async_trait]
pub trait KeyResolver: Send + Sync {
    /// Find the key identified by `kid`, scoped to `issuer` where the
    /// strategy is issuer-aware.
    async fn find_key(&self, issuer: Option<&str>, kid: &str) -> Result<JsonWebKey>;

    /// Warm any internal caches ahead of the first lookup. The default
    /// does nothing.
    async fn optimize(&self) -> Result<()> {
        Ok(())
    }
}

/// Policy hook deciding which issuers this deployment trusts.
///
/// The policy engine itself (regex lists, watched files) lives outside
/// this crate; resolvers and the validator only need these two calls.
pub trait IssuerAcceptability: Send + Sync {
    /// Check the policy's own configuration. Called once when a
    /// resolver is constructed.
    fn validate(&self) -> Result<()>;

    /// Whether tokens from `issuer` are trusted.
    fn is_acceptable(&self, issuer: &str) -> bool;
}

/// Decode every usable key in a JWKS document.
///
/// Individual keys that fail to decode are logged and skipped so one
/// malformed key cannot take down an endpoint's whole key set.
///
/// # Errors
///
/// Returns [`Error::Parse`] when the document has no `keys` array.
pub(crate) fn keys_from_jwks(url: &str, document: &Value) -> Result<Vec<JsonWebKey>> {
    let members = document
        .get("keys")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::Parse(format!("JWKS from {url} has no keys array")))?;

    let mut keys = Vec::with_capacity(members.len());
    for member in members {
        match JsonWebKey::from_json(member) {
            Ok(key) => keys.push(key),
            Err(err) => {
                warn!(url = %url, error = %err, "skipping undecodable key in JWKS document");
            }
        }
    }
    Ok(keys)
}

//! OpenID-discovery-backed key resolution
//!
//! Resolution is two-level. The issuer's discovery document is fetched
//! from `{issuer}/.well-known/openid-configuration` and cached per
//! issuer; its `jwks_uri` then selects a per-endpoint key cache. Loading
//! one kid from a JWKS document warms the whole document: every sibling
//! key is stored alongside the requested one with the same expiry, so a
//! key rotation costs one fetch rather than one per kid.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{IssuerAcceptability, KeyResolver, keys_from_jwks};
use crate::cache::{AsyncLoadingCache, TimedEntry};
use crate::error::{Error, Result};
use crate::fetch::HttpFetcher;
use crate::jwk::JsonWebKey;

/// The slice of an OpenID configuration document this crate consumes.
/// Everything else in the document is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryData {
    jwks_uri: String,
}

impl DiscoveryData {
    pub fn jwks_uri(&self) -> &str {
        &self.jwks_uri
    }

    fn from_document(issuer: &str, document: Value) -> Result<Self> {
        serde_json::from_value(document).map_err(|err| {
            Error::Parse(format!("discovery document for {issuer} is invalid: {err}"))
        })
    }
}

/// Resolves keys by OpenID Connect discovery.
pub struct DiscoveryKeyResolver {
    fetcher: HttpFetcher,
    acceptability: Arc<dyn IssuerAcceptability>,
    discovery_cache: AsyncLoadingCache<String, DiscoveryData>,
    key_caches: Mutex<HashMap<String, AsyncLoadingCache<String, JsonWebKey>>>,
}

impl DiscoveryKeyResolver {
    /// Build a resolver around an issuer-acceptability policy.
    ///
    /// # Errors
    ///
    /// Fails if the policy's own configuration does not validate.
    pub fn new(
        client: reqwest::Client,
        default_cache_duration: Duration,
        acceptability: Arc<dyn IssuerAcceptability>,
    ) -> Result<Self> {
        acceptability.validate()?;
        Ok(Self {
            fetcher: HttpFetcher::new(client, default_cache_duration),
            acceptability,
            discovery_cache: AsyncLoadingCache::new(),
            key_caches: Mutex::new(HashMap::new()),
        })
    }

    async fn discovery_data(&self, issuer: &str) -> Result<DiscoveryData> {
        // A known issuer skips the acceptability check even when its
        // cached document has expired; the cache remembers the key
        // space, not freshness. Revoking trust in an issuer therefore
        // requires a new resolver instance.
        if !self.discovery_cache.contains_key(&issuer.to_string())
            && !self.acceptability.is_acceptable(issuer)
        {
            return Err(Error::UnacceptableIssuer);
        }

        let fetcher = self.fetcher.clone();
        let url = discovery_url(issuer);
        let issuer = issuer.to_string();
        self.discovery_cache
            .get(issuer.clone(), move || async move {
                let (document, expires_at_ms) = fetcher.get_json(&url).await?.into_parts();
                let data = DiscoveryData::from_document(&issuer, document)?;
                debug!(issuer = %issuer, jwks_uri = %data.jwks_uri, "discovered JWKS endpoint");
                Ok(TimedEntry::new(data, expires_at_ms))
            })
            .await
    }

    fn key_cache(&self, jwks_uri: &str) -> AsyncLoadingCache<String, JsonWebKey> {
        self.key_caches
            .lock()
            .entry(jwks_uri.to_string())
            .or_default()
            .clone()
    }
}

#[async_trait]
impl KeyResolver for DiscoveryKeyResolver {
    async fn find_key(&self, issuer: Option<&str>, kid: &str) -> Result<JsonWebKey> {
        let issuer = issuer.ok_or_else(|| {
            Error::Configuration("discovery resolution requires an issuer".to_string())
        })?;

        let discovery = self.discovery_data(issuer).await?;
        let cache = self.key_cache(discovery.jwks_uri());

        let fetcher = self.fetcher.clone();
        let jwks_uri = discovery.jwks_uri().to_string();
        let wanted = kid.to_string();
        let sibling_cache = cache.clone();
        cache
            .get(wanted.clone(), move || async move {
                let (document, expires_at_ms) = fetcher.get_json(&jwks_uri).await?.into_parts();
                let mut found = None;
                for key in keys_from_jwks(&jwks_uri, &document)? {
                    if key.kid() == wanted {
                        found = Some(key);
                    } else {
                        sibling_cache.put(key.kid().to_string(), key, expires_at_ms);
                    }
                }
                let key = found.ok_or_else(|| Error::KeyNotFound(wanted))?;
                Ok(TimedEntry::new(key, expires_at_ms))
            })
            .await
    }
}

fn discovery_url(issuer: &str) -> String {
    if issuer.ends_with('/') {
        format!("{issuer}.well-known/openid-configuration")
    } else {
        format!("{issuer}/.well-known/openid-configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn discovery_url_normalizes_trailing_slash() {
        assert_eq!(
            discovery_url("https://issuer.example.com"),
            "https://issuer.example.com/.well-known/openid-configuration"
        );
        assert_eq!(
            discovery_url("https://issuer.example.com/"),
            "https://issuer.example.com/.well-known/openid-configuration"
        );
    }

    #[test]
    fn discovery_document_requires_jwks_uri() {
        assert!(matches!(
            DiscoveryData::from_document("https://iss", json!({"issuer": "https://iss"})),
            Err(Error::Parse(_))
        ));
        let data = DiscoveryData::from_document(
            "https://iss",
            json!({"jwks_uri": "https://iss/jwks"}),
        )
        .unwrap();
        assert_eq!(data.jwks_uri(), "https://iss/jwks");
    }
}

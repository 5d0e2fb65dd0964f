//! Key-per-URL vendor resolution
//!
//! Some load balancers publish each rotating verification key at its own
//! URL, `{base}/{kid}`, as a PEM document rather than a JWKS. The kid
//! goes straight into a request path, so it is checked against a
//! restrictive charset before any network call. Keys are assumed to be
//! P-256, the only kind these endpoints serve.

use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::select_ok;
use p256::pkcs8::DecodePublicKey;
use tracing::debug;

use super::KeyResolver;
use crate::cache::{AsyncLoadingCache, TimedEntry};
use crate::error::{Error, Result};
use crate::fetch::HttpFetcher;
use crate::jwk::{JsonWebKey, VerificationKey};

/// Resolves keys from per-kid PEM endpoints.
pub struct KeyByIdResolver {
    fetcher: HttpFetcher,
    base_urls: Vec<String>,
    cache: AsyncLoadingCache<String, JsonWebKey>,
}

impl KeyByIdResolver {
    /// Trailing slashes on base URLs are dropped so the kid is always
    /// joined with exactly one separator.
    pub fn new(
        client: reqwest::Client,
        default_cache_duration: Duration,
        base_urls: Vec<String>,
    ) -> Self {
        Self {
            fetcher: HttpFetcher::new(client, default_cache_duration),
            base_urls: base_urls
                .into_iter()
                .map(|url| url.trim_end_matches('/').to_string())
                .collect(),
            cache: AsyncLoadingCache::new(),
        }
    }
}

fn valid_kid(kid: &str) -> bool {
    !kid.is_empty()
        && kid
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '~' | '-'))
}

async fn fetch_key(fetcher: HttpFetcher, url: String, kid: String) -> Result<TimedEntry<JsonWebKey>> {
    let (pem, expires_at_ms) = fetcher.get_text(&url).await?.into_parts();
    let verifying_key = p256::ecdsa::VerifyingKey::from_public_key_pem(&pem)
        .map_err(|err| Error::InvalidKey(format!("{url} did not serve a P-256 key: {err}")))?;
    let key = JsonWebKey::from_verification_key(&kid, VerificationKey::P256(verifying_key))?;
    debug!(url = %url, kid = %kid, "fetched verification key");
    Ok(TimedEntry::new(key, expires_at_ms))
}

#[async_trait]
impl KeyResolver for KeyByIdResolver {
    async fn find_key(&self, _issuer: Option<&str>, kid: &str) -> Result<JsonWebKey> {
        // The kid becomes a URL path segment; reject anything that
        // could smuggle structure into the request.
        if !valid_kid(kid) {
            return Err(Error::InvalidKeyId);
        }
        if self.base_urls.is_empty() {
            return Err(Error::Configuration(
                "no key base URLs configured".to_string(),
            ));
        }

        let fetcher = self.fetcher.clone();
        let base_urls = self.base_urls.clone();
        let wanted = kid.to_string();
        self.cache
            .get(wanted.clone(), move || async move {
                let attempts = base_urls.iter().map(|base| {
                    fetch_key(
                        fetcher.clone(),
                        format!("{base}/{wanted}"),
                        wanted.clone(),
                    )
                    .boxed()
                });
                // First endpoint to produce a usable key wins; the last
                // failure surfaces when none does.
                let (entry, _) = select_ok(attempts).await?;
                Ok(entry)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kid_charset_is_restrictive() {
        assert!(valid_kid("c8f3a756-1b2c-4d5e-8f90-abcdef012345"));
        assert!(valid_kid("key.2026~rotation_1"));
        assert!(!valid_kid(""));
        assert!(!valid_kid("../../etc/passwd"));
        assert!(!valid_kid("kid?x=1"));
        assert!(!valid_kid("kid#frag"));
        assert!(!valid_kid("a b"));
    }
}

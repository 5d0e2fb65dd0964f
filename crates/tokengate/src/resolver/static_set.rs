//! Static-endpoint-set key resolution
//!
//! Keys from a fixed list of JWKS URLs are merged into one cache keyed
//! by kid, so kids must be unique across the configured endpoints. A
//! cache miss triggers one refresh of every endpoint; concurrent miss
//! callers share the in-flight refresh rather than each fetching. A
//! refresh tolerates some endpoints failing, but not all of them.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared, join_all};
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::{KeyResolver, keys_from_jwks};
use crate::cache::AsyncLoadingCache;
use crate::error::{Error, Result};
use crate::fetch::HttpFetcher;
use crate::jwk::JsonWebKey;

type SharedRefresh = Shared<BoxFuture<'static, std::result::Result<(), Arc<Error>>>>;

/// Resolves keys from a fixed set of JWKS endpoints.
pub struct StaticSetKeyResolver {
    fetcher: HttpFetcher,
    urls: Arc<Vec<String>>,
    cache: AsyncLoadingCache<String, JsonWebKey>,
    refresh: Arc<Mutex<Option<SharedRefresh>>>,
}

impl StaticSetKeyResolver {
    pub fn new(
        client: reqwest::Client,
        default_cache_duration: Duration,
        urls: Vec<String>,
    ) -> Self {
        Self {
            fetcher: HttpFetcher::new(client, default_cache_duration),
            urls: Arc::new(urls),
            cache: AsyncLoadingCache::new(),
            refresh: Arc::new(Mutex::new(None)),
        }
    }

    /// Refresh every configured endpoint, sharing one in-flight refresh
    /// across concurrent callers.
    async fn refresh(&self) -> Result<()> {
        let refresh = {
            let mut slot = self.refresh.lock();
            match &*slot {
                Some(refresh) => refresh.clone(),
                None => {
                    let refresh = Self::start_refresh(
                        self.fetcher.clone(),
                        Arc::clone(&self.urls),
                        self.cache.clone(),
                        Arc::clone(&self.refresh),
                    );
                    *slot = Some(refresh.clone());
                    refresh
                }
            }
        };
        refresh
            .await
            .map_err(|err| Arc::try_unwrap(err).unwrap_or_else(Error::Shared))
    }

    fn start_refresh(
        fetcher: HttpFetcher,
        urls: Arc<Vec<String>>,
        cache: AsyncLoadingCache<String, JsonWebKey>,
        slot: Arc<Mutex<Option<SharedRefresh>>>,
    ) -> SharedRefresh {
        async move {
            let result = Self::refresh_all(&fetcher, &urls, &cache).await;
            *slot.lock() = None;
            result.map_err(Arc::new)
        }
        .boxed()
        .shared()
    }

    async fn refresh_all(
        fetcher: &HttpFetcher,
        urls: &[String],
        cache: &AsyncLoadingCache<String, JsonWebKey>,
    ) -> Result<()> {
        if urls.is_empty() {
            return Err(Error::Configuration(
                "no JWKS URLs configured".to_string(),
            ));
        }

        let fetches = urls.iter().map(|url| async move {
            let (document, expires_at_ms) = fetcher.get_json(url).await?.into_parts();
            let keys = keys_from_jwks(url, &document)?;
            debug!(url = %url, keys = keys.len(), "refreshed JWKS endpoint");
            Ok::<_, Error>((keys, expires_at_ms))
        });

        let mut succeeded = 0usize;
        for (url, outcome) in urls.iter().zip(join_all(fetches).await) {
            match outcome {
                Ok((keys, expires_at_ms)) => {
                    succeeded += 1;
                    for key in keys {
                        cache.put(key.kid().to_string(), key, expires_at_ms);
                    }
                }
                Err(err) => {
                    warn!(url = %url, error = %err, "JWKS endpoint refresh failed");
                }
            }
        }

        if succeeded == 0 {
            return Err(Error::AllEndpointsFailed);
        }
        Ok(())
    }
}

#[async_trait]
impl KeyResolver for StaticSetKeyResolver {
    /// The issuer argument plays no part in lookup; issuer trust is the
    /// validator's claim check.
    async fn find_key(&self, _issuer: Option<&str>, kid: &str) -> Result<JsonWebKey> {
        if let Some(key) = self.cache.get_if_present(&kid.to_string()) {
            return Ok(key);
        }
        self.refresh().await?;
        self.cache
            .get_if_present(&kid.to_string())
            .ok_or_else(|| Error::KeyNotFound(kid.to_string()))
    }

    /// Warm the cache so the first token does not pay for the fetches.
    async fn optimize(&self) -> Result<()> {
        self.refresh().await
    }
}

//! HTTP fetching of JSON documents with cache-aware expiry
//!
//! Discovery documents and JWKS documents both arrive over HTTP and are
//! cached for as long as the server allows: the expiry attached to a
//! fetched document is the request time plus the smallest valid positive
//! `max-age` found across every `Cache-Control` response header, falling
//! back to a configured default. The headers are untrusted input, so
//! malformed directives are logged and ignored rather than trusted or
//! treated as fatal.

use std::time::Duration;

use reqwest::header::{self, HeaderMap};
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{TimedEntry, now_epoch_ms};
use crate::error::{Error, Result};

/// Fetches remote documents and stamps them with a cache expiry.
#[derive(Debug, Clone)]
pub(crate) struct HttpFetcher {
    client: reqwest::Client,
    default_cache_duration: Duration,
}

impl HttpFetcher {
    pub(crate) fn new(client: reqwest::Client, default_cache_duration: Duration) -> Self {
        Self {
            client,
            default_cache_duration,
        }
    }

    /// GET `url` and parse the body as JSON.
    ///
    /// # Errors
    ///
    /// Fails on transport errors, non-2xx statuses and unparseable
    /// bodies. Failures are never cached by callers.
    pub(crate) async fn get_json(&self, url: &str) -> Result<TimedEntry<Value>> {
        let request_time = now_epoch_ms();
        debug!(url = %url, "fetching JSON document");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| Error::Fetch {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = %status, "request returned error status");
            return Err(Error::FetchStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let expires_at_ms =
            expiry_from_headers(request_time, response.headers(), self.default_cache_duration);

        let json = response.json::<Value>().await.map_err(|source| Error::Fetch {
            url: url.to_string(),
            source,
        })?;

        Ok(TimedEntry::new(json, expires_at_ms))
    }

    /// GET `url` and return the body as text, for endpoints that serve
    /// PEM rather than JSON. The same cache expiry rules apply.
    ///
    /// # Errors
    ///
    /// Fails on transport errors and non-2xx statuses.
    pub(crate) async fn get_text(&self, url: &str) -> Result<TimedEntry<String>> {
        let request_time = now_epoch_ms();
        debug!(url = %url, "fetching text document");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| Error::Fetch {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::FetchStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let expires_at_ms =
            expiry_from_headers(request_time, response.headers(), self.default_cache_duration);

        let body = response.text().await.map_err(|source| Error::Fetch {
            url: url.to_string(),
            source,
        })?;

        Ok(TimedEntry::new(body, expires_at_ms))
    }
}

/// Derive an absolute expiry from `Cache-Control` response headers.
///
/// Multiple headers and multiple directives per header are scanned
/// independently; the smallest valid positive `max-age` wins. Directives
/// that fail to parse are logged and skipped.
fn expiry_from_headers(request_time_ms: u64, headers: &HeaderMap, default: Duration) -> u64 {
    let mut max_age: Option<u64> = None;

    for value in headers.get_all(header::CACHE_CONTROL) {
        let Ok(text) = value.to_str() else {
            continue;
        };
        for directive in text.split(',') {
            let mut parts = directive.splitn(2, '=');
            let name = parts.next().unwrap_or("").trim();
            if !name.eq_ignore_ascii_case("max-age") {
                continue;
            }
            let Some(raw) = parts.next() else {
                warn!(directive = %directive.trim(), "max-age cache-control directive has no value");
                continue;
            };
            match raw.replace('"', "").trim().parse::<i64>() {
                Ok(seconds) if seconds > 0 => {
                    let seconds = seconds as u64;
                    if max_age.is_none_or(|current| seconds < current) {
                        max_age = Some(seconds);
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(directive = %raw.trim(), error = %err, "invalid max-age cache-control directive");
                }
            }
        }
    }

    let seconds = max_age.unwrap_or_else(|| default.as_secs());
    // max-age is attacker-controlled and can be absurdly large; saturate
    // instead of overflowing the millisecond conversion.
    request_time_ms.saturating_add(seconds.saturating_mul(1000))
}

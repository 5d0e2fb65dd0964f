//! JWS compact-serialization parsing and claim access
//!
//! A [`Jwt`] is the decoded form of a compact-serialization token. The
//! header and payload are kept as JSON maps so claims beyond the
//! registered set stay reachable, and the exact base64 text of the first
//! two segments is retained because that is the byte sequence a
//! signature covers.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Map, Value};

use crate::algorithm::JsonWebAlgorithm;
use crate::error::{Error, Result};

/// A parsed, not-yet-validated token.
#[derive(Debug, Clone)]
pub struct Jwt {
    header: Map<String, Value>,
    payload: Map<String, Value>,
    signature_base: String,
    signature: Option<String>,
}

impl Jwt {
    /// Parse a compact-serialization token.
    ///
    /// Accepts two segments (unsecured) or three (signed). Whether an
    /// unsecured token is acceptable is the validator's decision, not
    /// the parser's.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] when the segment count is wrong, a
    /// segment is not valid base64url, or a decoded segment is not a
    /// JSON object.
    pub fn parse(token: &str) -> Result<Self> {
        let segments: Vec<&str> = token.split('.').collect();
        if !(2..=3).contains(&segments.len()) {
            return Err(Error::Parse(format!(
                "expected 2 or 3 dot-separated segments, found {}",
                segments.len()
            )));
        }

        let header = decode_json_segment(segments[0], "header")?;
        let payload = decode_json_segment(segments[1], "payload")?;

        Ok(Self {
            header,
            payload,
            signature_base: format!("{}.{}", segments[0], segments[1]),
            signature: segments.get(2).map(|s| (*s).to_string()),
        })
    }

    /// The `alg` header parameter, parsed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingClaim`] when absent and
    /// [`Error::UnknownAlgorithm`] when unrecognized.
    pub fn algorithm(&self) -> Result<JsonWebAlgorithm> {
        self.header
            .get("alg")
            .and_then(Value::as_str)
            .ok_or(Error::MissingClaim("alg"))?
            .parse()
    }

    /// The `kid` header parameter, if present.
    pub fn key_id(&self) -> Option<&str> {
        self.header.get("kid").and_then(Value::as_str)
    }

    /// The `iss` claim, if present.
    pub fn issuer(&self) -> Option<&str> {
        self.payload.get("iss").and_then(Value::as_str)
    }

    /// The `sub` claim, if present.
    pub fn subject(&self) -> Option<&str> {
        self.payload.get("sub").and_then(Value::as_str)
    }

    /// The `exp` claim in seconds since the epoch, if present.
    pub fn expiration(&self) -> Option<i64> {
        self.payload.get("exp").and_then(Value::as_i64)
    }

    /// The `nbf` claim in seconds since the epoch, if present.
    pub fn not_before(&self) -> Option<i64> {
        self.payload.get("nbf").and_then(Value::as_i64)
    }

    /// The `aud` claim normalized to a list.
    ///
    /// A string audience becomes a one-element list. Non-string array
    /// members are rendered to their JSON text rather than dropped.
    pub fn audience(&self) -> Option<Vec<String>> {
        match self.payload.get("aud")? {
            Value::String(aud) => Some(vec![aud.clone()]),
            Value::Array(auds) => Some(
                auds.iter()
                    .map(|aud| match aud {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
            ),
            _ => None,
        }
    }

    /// An arbitrary payload claim by name.
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.payload.get(name)
    }

    /// A payload claim normalized to a list, the way [`Self::audience`]
    /// normalizes `aud`.
    pub fn claim_as_list(&self, name: &str) -> Option<Vec<String>> {
        match self.payload.get(name)? {
            Value::String(v) => Some(vec![v.clone()]),
            Value::Array(vs) => Some(
                vs.iter()
                    .map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Whether the payload carries a claim of this name.
    pub fn has_claim(&self, name: &str) -> bool {
        self.payload.contains_key(name)
    }

    /// Number of payload claims.
    pub fn claim_count(&self) -> usize {
        self.payload.len()
    }

    /// The `header.payload` text a signature covers.
    pub fn signature_base(&self) -> &str {
        &self.signature_base
    }

    /// The base64url signature segment, if the token has one.
    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }
}

fn decode_json_segment(segment: &str, what: &str) -> Result<Map<String, Value>> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|err| Error::Parse(format!("{what} is not valid base64url: {err}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|err| Error::Parse(format!("{what} is not a JSON object: {err}")))
}

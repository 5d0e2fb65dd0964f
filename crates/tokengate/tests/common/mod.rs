//! Common test utilities for integration tests
//!
//! Provides a mock JWKS/discovery server plus key-pair and token-minting
//! helpers, so each test file can focus on one resolution scenario.

#![allow(dead_code)]

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Value, json};
use signature::{SignatureEncoding, Signer};
use tokengate::{IssuerAcceptability, JsonWebKey, Result, VerificationKey};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A mock issuer serving discovery and JWKS documents.
pub struct MockIssuer {
    pub server: MockServer,
    pub jwks_endpoint: String,
}

impl MockIssuer {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let jwks_endpoint = format!("{}/jwks", server.uri());
        Self {
            server,
            jwks_endpoint,
        }
    }

    /// The issuer identifier, which doubles as the mock server's base URL.
    pub fn issuer(&self) -> String {
        self.server.uri()
    }

    /// Serve a JWKS document holding `keys`, expecting exactly
    /// `expected_fetches` fetches over the test's lifetime.
    pub async fn mock_jwks(&self, keys: &[&JsonWebKey], expected_fetches: u64) {
        let keys: Vec<&Value> = keys.iter().map(|key| key.as_json()).collect();
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Cache-Control", "max-age=300")
                    .set_body_json(json!({"keys": keys})),
            )
            .expect(expected_fetches)
            .mount(&self.server)
            .await;
    }

    /// Serve an OpenID configuration document pointing at this server's
    /// JWKS endpoint.
    pub async fn mock_discovery(&self) {
        Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Cache-Control", "max-age=300")
                    .set_body_json(json!({
                        "issuer": self.issuer(),
                        "jwks_uri": self.jwks_endpoint,
                    })),
            )
            .mount(&self.server)
            .await;
    }

    /// Serve every request on this server with `status`.
    pub async fn mock_failure(&self, status: u16) {
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }
}

/// An RSA-2048 signing identity and its JWK form.
pub struct RsaIdentity {
    pub private_key: rsa::RsaPrivateKey,
    pub jwk: JsonWebKey,
}

impl RsaIdentity {
    pub fn generate(kid: &str) -> Self {
        let private_key =
            rsa::RsaPrivateKey::new(&mut rand::rngs::OsRng, 2048).expect("RSA key generation");
        let jwk = JsonWebKey::from_verification_key(
            kid,
            VerificationKey::Rsa(private_key.to_public_key()),
        )
        .expect("RSA JWK encoding");
        Self { private_key, jwk }
    }

    /// Mint an RS256 token over `claims`.
    pub fn mint_rs256(&self, kid: &str, claims: &Value) -> String {
        let signing_key = rsa::pkcs1v15::SigningKey::<sha2::Sha256>::new(self.private_key.clone());
        let header = json!({"alg": "RS256", "typ": "JWT", "kid": kid});
        let signing_input = format!("{}.{}", encode_segment(&header), encode_segment(claims));
        let signature = signing_key.sign(signing_input.as_bytes());
        format!(
            "{signing_input}.{}",
            URL_SAFE_NO_PAD.encode(signature.to_vec())
        )
    }
}

/// A P-256 signing identity, PEM-encoded the way per-kid key endpoints
/// serve it.
pub struct P256Identity {
    pub signing_key: p256::ecdsa::SigningKey,
    pub public_pem: String,
}

impl P256Identity {
    pub fn generate() -> Self {
        use p256::pkcs8::EncodePublicKey;
        let signing_key = p256::ecdsa::SigningKey::random(&mut rand::rngs::OsRng);
        let public_pem = signing_key
            .verifying_key()
            .to_public_key_pem(p256::pkcs8::LineEnding::LF)
            .expect("PEM encoding");
        Self {
            signing_key,
            public_pem,
        }
    }

    /// Mint an ES256 token over `claims`.
    pub fn mint_es256(&self, kid: &str, claims: &Value) -> String {
        let header = json!({"alg": "ES256", "typ": "JWT", "kid": kid});
        let signing_input = format!("{}.{}", encode_segment(&header), encode_segment(claims));
        let signature: p256::ecdsa::Signature = self.signing_key.sign(signing_input.as_bytes());
        format!(
            "{signing_input}.{}",
            URL_SAFE_NO_PAD.encode(signature.to_vec())
        )
    }
}

pub fn encode_segment(value: &Value) -> String {
    URL_SAFE_NO_PAD.encode(serde_json::to_vec(value).expect("JSON encoding"))
}

pub fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_secs() as i64
}

/// A standard fresh claim set for `issuer`.
pub fn claims(issuer: &str) -> Value {
    json!({
        "iss": issuer,
        "sub": "alice",
        "aud": "my-service",
        "exp": now_secs() + 300,
        "nbf": now_secs() - 30,
    })
}

pub fn required_audiences() -> Vec<String> {
    vec!["my-service".to_string()]
}

/// Accepts every issuer.
pub struct AnyIssuer;

impl IssuerAcceptability for AnyIssuer {
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    fn is_acceptable(&self, _issuer: &str) -> bool {
        true
    }
}

/// Accepts only a fixed issuer, counting how often it is consulted.
pub struct SingleIssuer {
    pub issuer: String,
    pub checks: std::sync::atomic::AtomicUsize,
}

impl SingleIssuer {
    pub fn new(issuer: &str) -> Self {
        Self {
            issuer: issuer.to_string(),
            checks: std::sync::atomic::AtomicUsize::new(0),
        }
    }
}

impl IssuerAcceptability for SingleIssuer {
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    fn is_acceptable(&self, issuer: &str) -> bool {
        self.checks
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        issuer == self.issuer
    }
}

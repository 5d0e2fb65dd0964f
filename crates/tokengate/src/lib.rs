//! # Tokengate - JWT Validation Engine
//!
//! Signature and claim validation for JWS/JWT tokens presented to a
//! service, with verification keys resolved over the network and cached
//! for as long as the serving side allows.
//!
//! ## Key Features
//!
//! - **Three trust models** - OpenID Connect discovery, a static set of
//!   JWKS endpoints, or per-kid vendor key URLs, all behind one
//!   [`KeyResolver`] trait
//! - **Single-flight caching** - concurrent lookups for an absent key
//!   share one fetch; TTLs follow the `Cache-Control` headers of the
//!   serving endpoint
//! - **Full signing-algorithm set** - RS/PS/ES families plus EdDSA and
//!   ES256K; `none` is rejected unconditionally
//! - **RFC 7517 key codec** - RSA, EC (P-256/P-384/P-521/secp256k1) and
//!   Ed25519 keys, with the fixed-width coordinate handling RFC 7518
//!   requires
//!
//! ## Architecture
//!
//! - [`algorithm`] - JWS algorithm identifiers and their key families
//! - [`cache`] - generic async loading cache with absolute expiries
//! - [`jwk`] - JWK decoding, encoding and signature verification
//! - [`resolver`] - the three key-resolution strategies
//! - [`token`] - compact-serialization parsing and claim access
//! - [`validator`] - the validation pipeline itself
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokengate::{
//!     IssuerAcceptability, Result, StaticSetKeyResolver, TokenValidator,
//! };
//!
//! struct AnyIssuer;
//!
//! impl IssuerAcceptability for AnyIssuer {
//!     fn validate(&self) -> Result<()> {
//!         Ok(())
//!     }
//!     fn is_acceptable(&self, _issuer: &str) -> bool {
//!         true
//!     }
//! }
//!
//! # async fn run() -> Result<()> {
//! let resolver = StaticSetKeyResolver::new(
//!     reqwest::Client::new(),
//!     Duration::from_secs(60),
//!     vec!["https://issuer.example.com/jwks".to_string()],
//! );
//! let validator = TokenValidator::new(Arc::new(resolver), Arc::new(AnyIssuer));
//!
//! let required = vec!["my-service".to_string()];
//! let jwt = validator
//!     .validate_token(None, "<token>", Some(&required), false)
//!     .await?;
//! println!("subject: {:?}", jwt.subject());
//! # Ok(())
//! # }
//! ```

pub mod algorithm;
pub mod cache;
pub mod error;
pub mod jwk;
pub mod resolver;
pub mod token;
pub mod validator;

mod fetch;

pub use algorithm::{JsonWebAlgorithm, KeyFamily};
pub use cache::{AsyncLoadingCache, TimedEntry};
pub use error::{Error, Result};
pub use jwk::{JsonWebKey, VerificationKey};
pub use resolver::{
    DiscoveryData, DiscoveryKeyResolver, IssuerAcceptability, KeyByIdResolver, KeyResolver,
    StaticSetKeyResolver,
};
pub use token::Jwt;
pub use validator::TokenValidator;

//! OpenID-discovery resolution
//!
//! Covers the two-level discovery flow, sibling-key warm-up from a
//! single JWKS fetch, and the issuer-acceptability gate.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{AnyIssuer, MockIssuer, RsaIdentity, SingleIssuer, claims, required_audiences};
use tokengate::{DiscoveryKeyResolver, Error, KeyResolver, TokenValidator};

fn resolver_for(
    acceptability: Arc<dyn tokengate::IssuerAcceptability>,
) -> DiscoveryKeyResolver {
    DiscoveryKeyResolver::new(reqwest::Client::new(), Duration::from_secs(60), acceptability)
        .expect("acceptability policy should validate")
}

#[tokio::test]
async fn validates_a_discovered_token_end_to_end() {
    let identity = RsaIdentity::generate("disc-key");
    let issuer = MockIssuer::start().await;
    issuer.mock_discovery().await;
    issuer.mock_jwks(&[&identity.jwk], 1).await;

    let validator = TokenValidator::new(
        Arc::new(resolver_for(Arc::new(AnyIssuer))),
        Arc::new(AnyIssuer),
    );

    let token = identity.mint_rs256("disc-key", &claims(&issuer.issuer()));
    let required = required_audiences();
    let jwt = validator
        .validate_token(Some(&issuer.issuer()), &token, Some(&required), false)
        .await
        .expect("discovered key should validate the token");
    assert_eq!(jwt.issuer(), Some(issuer.issuer().as_str()));
}

#[tokio::test]
async fn one_jwks_fetch_warms_every_sibling_key() {
    let first = RsaIdentity::generate("sib-a");
    let second = RsaIdentity::generate("sib-b");
    let issuer = MockIssuer::start().await;
    issuer.mock_discovery().await;
    // expect(1): resolving the second kid must be served from the warmed
    // cache, not a second fetch.
    issuer.mock_jwks(&[&first.jwk, &second.jwk], 1).await;

    let resolver = resolver_for(Arc::new(AnyIssuer));
    let issuer_id = issuer.issuer();

    let a = resolver.find_key(Some(&issuer_id), "sib-a").await.unwrap();
    let b = resolver.find_key(Some(&issuer_id), "sib-b").await.unwrap();
    assert_eq!(a.kid(), "sib-a");
    assert_eq!(b.kid(), "sib-b");
}

#[tokio::test]
async fn unacceptable_issuer_is_rejected_before_any_fetch() {
    let issuer = MockIssuer::start().await;
    // No mocks mounted: a fetch attempt would 404 and fail differently.
    let resolver = resolver_for(Arc::new(SingleIssuer::new("https://trusted.example.com")));

    let err = resolver
        .find_key(Some(&issuer.issuer()), "any")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnacceptableIssuer));
}

#[tokio::test]
async fn known_issuer_skips_repeat_acceptability_checks() {
    let identity = RsaIdentity::generate("k1");
    let issuer = MockIssuer::start().await;
    issuer.mock_discovery().await;
    issuer.mock_jwks(&[&identity.jwk], 1).await;

    let policy = Arc::new(SingleIssuer::new(&issuer.issuer()));
    let resolver = resolver_for(policy.clone());
    let issuer_id = issuer.issuer();

    resolver.find_key(Some(&issuer_id), "k1").await.unwrap();
    resolver.find_key(Some(&issuer_id), "k1").await.unwrap();
    resolver.find_key(Some(&issuer_id), "k1").await.unwrap();

    // Only the first lookup consults the policy; afterwards the issuer
    // is in the discovery cache.
    assert_eq!(policy.checks.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn discovery_requires_an_issuer_argument() {
    let resolver = resolver_for(Arc::new(AnyIssuer));
    assert!(matches!(
        resolver.find_key(None, "kid").await,
        Err(Error::Configuration(_))
    ));
}

#[tokio::test]
async fn unknown_kid_from_a_live_document_is_key_not_found() {
    let identity = RsaIdentity::generate("known");
    let issuer = MockIssuer::start().await;
    issuer.mock_discovery().await;
    issuer.mock_jwks(&[&identity.jwk], 1).await;

    let resolver = resolver_for(Arc::new(AnyIssuer));
    let err = resolver
        .find_key(Some(&issuer.issuer()), "unknown")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::KeyNotFound(kid) if kid == "unknown"));
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! ## Security
//!
//! - JWKS is fetched via HTTPS only
//! - Keys are cached with a configurable TTL
//! - An unknown `kid` triggers a refresh at most once per
//!   [`MIN_REFRESH_INTERVAL`]; other misses are rejected from the cache

use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey};
use tokio::sync::RwLock;

use super::identity::IdentityError;

/// Default JWKS cache TTL (1 hour; Google rotates keys roughly daily).
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Minimum age of the cached set before an unknown `kid` may refetch it.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// JWKS cache entry.
struct CacheEntry {
    jwks: JwkSet,
    fetched_at: Instant,
}

/// JWKS manager with caching.
#[derive(Clone)]
pub struct JwksManager {
    /// JWKS URL
    jwks_url: String,
    /// Cache TTL
    cache_ttl: Duration,
    /// Cached JWKS
    cache: Arc<RwLock<Option<CacheEntry>>>,
    /// HTTP client
    client: reqwest::Client,
}

impl JwksManager {
    /// Create a new JWKS manager.
    pub fn new(jwks_url: impl Into<String>) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| IdentityError::KeyFetch(e.to_string()))?;

        Ok(Self {
            jwks_url: jwks_url.into(),
            cache_ttl: DEFAULT_CACHE_TTL,
            cache: Arc::new(RwLock::new(None)),
            client,
        })
    }

    /// Fetch JWKS (with caching).
    async fn get_jwks(&self) -> Result<JwkSet, IdentityError> {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = &*cache {
                if entry.fetched_at.elapsed() < self.cache_ttl {
                    return Ok(entry.jwks.clone());
                }
            }
        }

        self.refresh().await
    }

    /// Fetch JWKS from the endpoint.
    async fn fetch_jwks(&self) -> Result<JwkSet, IdentityError> {
        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| IdentityError::KeyFetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(IdentityError::KeyFetch(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| IdentityError::KeyFetch(e.to_string()))
    }

    /// Get a decoding key for the given key ID.
    ///
    /// A miss refetches the set only when the cached copy is older than
    /// [`MIN_REFRESH_INTERVAL`].
    pub async fn get_decoding_key(&self, kid: &str) -> Result<(DecodingKey, Algorithm), IdentityError> {
        let jwks = self.get_jwks().await?;
        if let Some(jwk) = find_key(&jwks, kid) {
            return jwk_to_decoding_key(jwk);
        }

        if !self.refresh_allowed().await {
            tracing::debug!(kid, "Unknown key id, JWKS fetched too recently to refresh");
            return Err(IdentityError::InvalidAssertion(format!("no key with id {kid}")));
        }

        tracing::debug!(kid, "Unknown key id, refreshing JWKS");
        let jwks = self.refresh().await?;
        let jwk = find_key(&jwks, kid).ok_or_else(|| {
            IdentityError::InvalidAssertion(format!("no key with id {kid}"))
        })?;
        jwk_to_decoding_key(jwk)
    }

    async fn refresh_allowed(&self) -> bool {
        let cache = self.cache.read().await;
        match &*cache {
            Some(entry) => entry.fetched_at.elapsed() >= MIN_REFRESH_INTERVAL,
            None => true,
        }
    }

    /// Force refresh the JWKS cache.
    pub async fn refresh(&self) -> Result<JwkSet, IdentityError> {
        let jwks = self.fetch_jwks().await?;
        let mut cache = self.cache.write().await;
        *cache = Some(CacheEntry {
            jwks: jwks.clone(),
            fetched_at: Instant::now(),
        });
        Ok(jwks)
    }

    /// Check if JWKS is currently cached and valid.
    pub async fn is_cached(&self) -> bool {
        let cache = self.cache.read().await;
        if let Some(entry) = &*cache {
            entry.fetched_at.elapsed() < self.cache_ttl
        } else {
            false
        }
    }
}

fn find_key<'a>(jwks: &'a JwkSet, kid: &str) -> Option<&'a Jwk> {
    jwks.keys
        .iter()
        .find(|k| k.common.key_id.as_deref() == Some(kid))
}

/// Convert a JWK to a DecodingKey.
fn jwk_to_decoding_key(jwk: &Jwk) -> Result<(DecodingKey, Algorithm), IdentityError> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => {
            let key = DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
                .map_err(|e| IdentityError::InvalidAssertion(format!("bad RSA key: {e}")))?;

            let alg = match jwk.common.key_algorithm {
                Some(KeyAlgorithm::RS384) => Algorithm::RS384,
                Some(KeyAlgorithm::RS512) => Algorithm::RS512,
                _ => Algorithm::RS256,
            };

            Ok((key, alg))
        }
        AlgorithmParameters::EllipticCurve(ec) => {
            let key = DecodingKey::from_ec_components(&ec.x, &ec.y)
                .map_err(|e| IdentityError::InvalidAssertion(format!("bad EC key: {e}")))?;

            let alg = match jwk.common.key_algorithm {
                Some(KeyAlgorithm::ES384) => Algorithm::ES384,
                _ => Algorithm::ES256,
            };

            Ok((key, alg))
        }
        _ => Err(IdentityError::InvalidAssertion(
            "unsupported key type in JWKS".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn rsa_set() -> JwkSet {
        serde_json::from_value(serde_json::json!({
            "keys": [{
                "kty": "RSA",
                "kid": "key-1",
                "alg": "RS256",
                "use": "sig",
                "n": "sXchDaQebHnPiGvyDOAT4saGEUetSyo9MKLOoWFsueri23bOdgWp4Dy1WlUzewbgBHod5pcM9H95GQRV3JDXboIRROSBigeC5yjU1hGzHHyXss8UDprecbAYxknTcQkhslANGRUZmdTOQ5qTRsLAt6BTYuyvVRdhS8exSZEy_c4gs_7svlJJQ4H9_NxsiIoLwAEk7-Q3UXERGYw_75IDrGA84-lA_-Ct4eTlXHBIY2EaV7t7LjJaynVJCpkv4LKjTTAumiGUIuQhrNhZLuF_RJLqHpM2kgWFLU7-VTdL1VbC2tejvcI2BlMkEpk1BzBZI0KQB0GaDWFLN-aEAw3vRw",
                "e": "AQAB"
            }]
        }))
        .unwrap()
    }

    #[test]
    fn jwks_manager_creation() {
        let manager = JwksManager::new("https://www.googleapis.com/oauth2/v3/certs").unwrap();
        assert_eq!(manager.jwks_url, "https://www.googleapis.com/oauth2/v3/certs");
        assert_eq!(manager.cache_ttl, DEFAULT_CACHE_TTL);
    }

    /// Serves `rsa_set()` on a local port and counts the requests.
    async fn serve_jwks() -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = axum::Router::new().route(
            "/certs",
            axum::routing::get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    axum::Json(rsa_set())
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/certs"), hits)
    }

    #[tokio::test]
    async fn unknown_key_ids_do_not_refetch_a_fresh_set() {
        let (url, hits) = serve_jwks().await;
        let manager = JwksManager::new(url).unwrap();

        assert!(manager.get_decoding_key("key-1").await.is_ok());
        for i in 0..20 {
            let err = manager
                .get_decoding_key(&format!("bogus-{i}"))
                .await
                .unwrap_err();
            assert!(matches!(err, IdentityError::InvalidAssertion(_)));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_key_id_refetches_an_aging_set() {
        let (url, hits) = serve_jwks().await;
        let manager = JwksManager::new(url).unwrap();
        *manager.cache.write().await = Some(CacheEntry {
            jwks: serde_json::from_value(serde_json::json!({ "keys": [] })).unwrap(),
            fetched_at: Instant::now() - MIN_REFRESH_INTERVAL * 2,
        });

        assert!(manager.get_decoding_key("key-1").await.is_ok());
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // The refetched set is fresh again
        assert!(manager.get_decoding_key("bogus").await.is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cache_initially_empty() {
        let manager = JwksManager::new("https://example.com/jwks.json").unwrap();
        assert!(!manager.is_cached().await);
    }

    #[test]
    fn finds_key_by_id() {
        let set = rsa_set();
        assert!(find_key(&set, "key-1").is_some());
        assert!(find_key(&set, "key-2").is_none());
    }

    #[test]
    fn rsa_jwk_converts_to_rs256_key() {
        let set = rsa_set();
        let (_, alg) = jwk_to_decoding_key(&set.keys[0]).unwrap();
        assert_eq!(alg, Algorithm::RS256);
    }
}

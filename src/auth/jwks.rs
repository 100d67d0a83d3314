// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! ## Security
//!
//! - Each published key is bound to exactly one algorithm when the set is
//!   fetched, derived from the key's own type and curve. Tokens never get a
//!   say in which algorithm verifies them.
//! - Symmetric (`oct`) keys and encryption keys in the published set are
//!   ignored.
//! - Keys are cached with a configurable TTL. An expired set that cannot be
//!   refreshed is still served (stale) until the provider answers again.
//! - A `kid` that is not in the cache triggers exactly one forced refetch,
//!   which is how provider key rotation is picked up. No forced refetch
//!   happens while the cached set is younger than the minimum refetch
//!   interval, so tokens with made-up `kid`s cannot hammer the provider.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{AlgorithmParameters, EllipticCurve, Jwk, KeyAlgorithm, PublicKeyUse};
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;
use tokio::sync::RwLock;

use super::error::AuthError;

/// Default JWKS cache TTL (5 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Default timeout for the outbound key-set request.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default minimum age of the cached set before an unknown `kid` may force a
/// refetch.
pub const DEFAULT_MIN_REFETCH_INTERVAL: Duration = Duration::from_secs(10);

/// A verification key together with the only algorithm it may verify.
#[derive(Clone)]
pub struct SigningKey {
    pub key_id: String,
    pub key: DecodingKey,
    pub algorithm: Algorithm,
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("key_id", &self.key_id)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// Published keys by `kid`.
pub type KeyMap = HashMap<String, Arc<SigningKey>>;

struct CacheEntry {
    keys: Arc<KeyMap>,
    fetched_at: Instant,
}

/// Raw key-set document. Entries are parsed one by one so a single key of an
/// unsupported type does not invalidate the whole set.
#[derive(Deserialize)]
struct RawKeySet {
    keys: Vec<serde_json::Value>,
}

/// Cache of the identity provider's published signing keys.
#[derive(Clone)]
pub struct JwksCache {
    /// Key-set endpoint
    jwks_url: String,
    /// Cache TTL
    cache_ttl: Duration,
    /// Minimum age of the cached set before a forced refetch
    min_refetch_interval: Duration,
    /// Parsed keys by `kid`
    cache: Arc<RwLock<Option<CacheEntry>>>,
    /// HTTP client (carries the fetch timeout)
    client: reqwest::Client,
}

impl JwksCache {
    /// Create a new key cache.
    ///
    /// # Arguments
    /// - `jwks_url`: the provider's key-set endpoint
    /// - `fetch_timeout`: upper bound on a single key-set request
    pub fn new(
        jwks_url: impl Into<String>,
        fetch_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(fetch_timeout).build()?;
        Ok(Self {
            jwks_url: jwks_url.into(),
            cache_ttl: DEFAULT_CACHE_TTL,
            min_refetch_interval: DEFAULT_MIN_REFETCH_INTERVAL,
            cache: Arc::new(RwLock::new(None)),
            client,
        })
    }

    /// Create with custom cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Create with custom minimum refetch interval.
    pub fn with_min_refetch_interval(mut self, interval: Duration) -> Self {
        self.min_refetch_interval = interval;
        self
    }

    /// Get the key-set URL.
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Resolve a key id to its signing key.
    ///
    /// Cold or expired cache: one fetch. Warm cache hit: no fetch. Warm cache
    /// miss: one forced refetch, then `KeyNotFound` if the id is still absent.
    /// A warm miss against a set fetched less than the minimum refetch
    /// interval ago fails `KeyNotFound` without fetching.
    pub async fn resolve(&self, kid: &str) -> Result<Arc<SigningKey>, AuthError> {
        let (keys, just_fetched) = match self.fresh_keys().await {
            Some(keys) => (keys, false),
            None => (self.refresh_or_stale().await?, true),
        };

        if let Some(key) = keys.get(kid) {
            return Ok(Arc::clone(key));
        }

        if just_fetched {
            tracing::debug!(kid, "Key id not present in freshly fetched key set");
            return Err(AuthError::KeyNotFound);
        }

        if self.fetched_within(self.min_refetch_interval).await {
            tracing::debug!(kid, "Unknown key id, key set fetched too recently to refetch");
            return Err(AuthError::KeyNotFound);
        }

        tracing::info!(kid, "Unknown key id, refetching key set");
        let keys = self.refresh().await?;
        keys.get(kid).cloned().ok_or_else(|| {
            tracing::debug!(kid, "Key id not present after refetch");
            AuthError::KeyNotFound
        })
    }

    /// Force refresh the key cache.
    pub async fn refresh(&self) -> Result<Arc<KeyMap>, AuthError> {
        let keys = Arc::new(self.fetch_keys().await?);
        let mut cache = self.cache.write().await;
        *cache = Some(CacheEntry {
            keys: Arc::clone(&keys),
            fetched_at: Instant::now(),
        });
        Ok(keys)
    }

    /// Check if keys are currently cached and within their TTL.
    pub async fn is_cached(&self) -> bool {
        self.fresh_keys().await.is_some()
    }

    /// Cached keys, if present and not expired.
    async fn fresh_keys(&self) -> Option<Arc<KeyMap>> {
        let cache = self.cache.read().await;
        cache
            .as_ref()
            .filter(|entry| entry.fetched_at.elapsed() < self.cache_ttl)
            .map(|entry| Arc::clone(&entry.keys))
    }

    /// Whether the cached set, fresh or stale, is younger than `interval`.
    async fn fetched_within(&self, interval: Duration) -> bool {
        let cache = self.cache.read().await;
        cache
            .as_ref()
            .is_some_and(|entry| entry.fetched_at.elapsed() < interval)
    }

    /// Refetch, falling back to an expired set when the provider is down.
    async fn refresh_or_stale(&self) -> Result<Arc<KeyMap>, AuthError> {
        match self.refresh().await {
            Ok(keys) => Ok(keys),
            Err(err) => {
                let cache = self.cache.read().await;
                match cache.as_ref() {
                    Some(entry) => {
                        tracing::warn!(
                            age_secs = entry.fetched_at.elapsed().as_secs(),
                            "Key set refresh failed, serving stale keys"
                        );
                        Ok(Arc::clone(&entry.keys))
                    }
                    None => Err(err),
                }
            }
        }
    }

    /// Fetch and parse the key set from the endpoint.
    async fn fetch_keys(&self) -> Result<KeyMap, AuthError> {
        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, url = %self.jwks_url, "Key set request failed");
                AuthError::UpstreamUnavailable
            })?;

        if !response.status().is_success() {
            tracing::warn!(
                status = %response.status(),
                url = %self.jwks_url,
                "Key set endpoint returned an error status"
            );
            return Err(AuthError::UpstreamUnavailable);
        }

        let raw: RawKeySet = response.json().await.map_err(|e| {
            tracing::warn!(error = %e, url = %self.jwks_url, "Key set body is not a JWKS document");
            AuthError::UpstreamUnavailable
        })?;

        let keys = parse_key_set(raw.keys);
        tracing::debug!(count = keys.len(), "Fetched signing keys");
        Ok(keys)
    }
}

fn parse_key_set(entries: Vec<serde_json::Value>) -> KeyMap {
    let mut keys = KeyMap::new();
    for entry in entries {
        let jwk: Jwk = match serde_json::from_value(entry) {
            Ok(jwk) => jwk,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping unparseable key set entry");
                continue;
            }
        };
        match signing_key_from_jwk(&jwk) {
            Ok(key) => {
                keys.insert(key.key_id.clone(), Arc::new(key));
            }
            Err(reason) => {
                tracing::debug!(kid = ?jwk.common.key_id, reason, "Skipping key set entry");
            }
        }
    }
    keys
}

/// Convert a JWK to a signing key with its algorithm fixed by key type.
fn signing_key_from_jwk(jwk: &Jwk) -> Result<SigningKey, &'static str> {
    let key_id = jwk.common.key_id.clone().ok_or("missing kid")?;

    if matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
        return Err("encryption key");
    }

    let declared = jwk.common.key_algorithm.as_ref();
    let (key, algorithm) = match &jwk.algorithm {
        AlgorithmParameters::EllipticCurve(ec) => {
            let algorithm = match (&ec.curve, declared) {
                (EllipticCurve::P256, None | Some(KeyAlgorithm::ES256)) => Algorithm::ES256,
                (EllipticCurve::P384, None | Some(KeyAlgorithm::ES384)) => Algorithm::ES384,
                _ => return Err("unsupported curve or algorithm for EC key"),
            };
            let key = DecodingKey::from_ec_components(&ec.x, &ec.y)
                .map_err(|_| "invalid EC components")?;
            (key, algorithm)
        }
        AlgorithmParameters::RSA(rsa) => {
            let algorithm = match declared {
                None | Some(KeyAlgorithm::RS256) => Algorithm::RS256,
                Some(KeyAlgorithm::RS384) => Algorithm::RS384,
                Some(KeyAlgorithm::RS512) => Algorithm::RS512,
                Some(KeyAlgorithm::PS256) => Algorithm::PS256,
                Some(KeyAlgorithm::PS384) => Algorithm::PS384,
                Some(KeyAlgorithm::PS512) => Algorithm::PS512,
                Some(_) => return Err("unsupported algorithm for RSA key"),
            };
            let key = DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
                .map_err(|_| "invalid RSA components")?;
            (key, algorithm)
        }
        AlgorithmParameters::OctetKeyPair(okp) => {
            if !matches!(okp.curve, EllipticCurve::Ed25519) {
                return Err("unsupported OKP curve");
            }
            let key = DecodingKey::from_ed_components(&okp.x)
                .map_err(|_| "invalid OKP components")?;
            (key, Algorithm::EdDSA)
        }
        // Symmetric `oct` keys never verify provider tokens.
        _ => return Err("unsupported key type"),
    };

    Ok(SigningKey {
        key_id,
        key,
        algorithm,
    })
}

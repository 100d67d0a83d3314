// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access token verification.
//!
//! ## Verification order
//!
//! 1. Three non-empty base64url segments, parseable header
//! 2. Signing key resolved by `kid` only
//! 3. Signature checked with the algorithm bound to that key, then `exp`
//!    and `aud`
//! 4. `sub` extracted as the user id, `email` copied when present
//!
//! The header's `alg` is never used to pick the algorithm. A token whose
//! header names anything other than the key's algorithm fails as an invalid
//! signature.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Validation};

use super::claims::{ProviderClaims, VerifiedIdentity};
use super::error::AuthError;
use super::jwks::JwksCache;

/// Clock skew tolerance (60 seconds).
pub const DEFAULT_LEEWAY_SECS: u64 = 60;

/// Verifies provider-issued access tokens against the published key set.
pub struct TokenVerifier {
    keys: JwksCache,
    audience: String,
    leeway: u64,
}

impl TokenVerifier {
    pub fn new(keys: JwksCache, audience: impl Into<String>) -> Self {
        Self {
            keys,
            audience: audience.into(),
            leeway: DEFAULT_LEEWAY_SECS,
        }
    }

    /// Override the clock skew tolerance applied to `exp`.
    pub fn with_leeway(mut self, leeway_secs: u64) -> Self {
        self.leeway = leeway_secs;
        self
    }

    /// The key cache backing this verifier.
    pub fn keys(&self) -> &JwksCache {
        &self.keys
    }

    /// Verify a raw token and return the caller's identity.
    pub async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError> {
        check_segments(token)?;

        // Only `kid` is used; an `alg` that is not a known JWS algorithm
        // fails the header parse.
        let header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;
        let kid = header.kid.as_deref().ok_or(AuthError::KeyNotFound)?;
        let signing_key = self.keys.resolve(kid).await?;

        let mut validation = Validation::new(signing_key.algorithm);
        validation.leeway = self.leeway;
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "aud"]);

        let token_data = decode::<ProviderClaims>(token, &signing_key.key, &validation)
            .map_err(|e| map_decode_error(e.kind()))?;

        // `jsonwebtoken` also accepts an array that merely contains the
        // audience; only the exact string is allowed here.
        let claims = token_data.claims;
        if claims.aud.as_ref().and_then(serde_json::Value::as_str) != Some(self.audience.as_str())
        {
            return Err(AuthError::AudienceMismatch);
        }

        VerifiedIdentity::from_claims(claims)
    }
}

fn check_segments(token: &str) -> Result<(), AuthError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(AuthError::MalformedToken);
    }
    for segment in segments {
        let unpadded = segment.trim_end_matches('=');
        if unpadded.is_empty() || URL_SAFE_NO_PAD.decode(unpadded).is_err() {
            return Err(AuthError::MalformedToken);
        }
    }
    Ok(())
}

fn map_decode_error(kind: &ErrorKind) -> AuthError {
    match kind {
        ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => AuthError::SignatureInvalid,
        ErrorKind::InvalidAudience => AuthError::AudienceMismatch,
        ErrorKind::MissingRequiredClaim(claim) if claim == "aud" => AuthError::AudienceMismatch,
        _ => AuthError::MalformedToken,
    }
}

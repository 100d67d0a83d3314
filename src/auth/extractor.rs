// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated callers.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(identity): Auth) -> impl IntoResponse {
//!     // identity is VerifiedIdentity
//! }
//! ```
//!
//! `OptionalAuth` never rejects; it yields `None` for anonymous callers and
//! for callers whose token fails verification.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

use super::{AuthError, VerifiedIdentity};
use crate::state::AppState;

/// Extractor for authenticated callers.
///
/// Verifies the `Authorization: Bearer <token>` header with the
/// [`TokenVerifier`](super::TokenVerifier) held in [`AppState`].
///
/// # Example
///
/// ```rust,ignore
/// async fn list_configs(
///     Auth(identity): Auth,
///     State(state): State<AppState>,
/// ) -> Result<Json<Vec<UserConfig>>, ApiError> {
///     // identity.subject_id scopes every store call
/// }
/// ```
pub struct Auth(pub VerifiedIdentity);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Already verified earlier in this request
        if let Some(identity) = parts.extensions.get::<VerifiedIdentity>().cloned() {
            return Ok(Auth(identity));
        }

        let token = bearer_token(&parts.headers).ok_or(AuthError::MissingCredential)?;

        let identity = state.verifier.verify(token).await.map_err(|e| {
            tracing::debug!(error_code = e.error_code(), "Bearer token rejected");
            e
        })?;

        parts.extensions.insert(identity.clone());
        Ok(Auth(identity))
    }
}

/// Optional authentication extractor.
///
/// Returns `None` if no valid authentication is present, instead of rejecting.
pub struct OptionalAuth(pub Option<VerifiedIdentity>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match Auth::from_request_parts(parts, state).await {
            Ok(Auth(identity)) => Ok(OptionalAuth(Some(identity))),
            Err(_) => Ok(OptionalAuth(None)),
        }
    }
}

/// Token from an `Authorization: Bearer` header. The scheme is matched
/// case-insensitively.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and the verified identity handed to handlers.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::AuthError;

/// Claims read from a provider-issued access token.
///
/// `exp` and `aud` are enforced by `jsonwebtoken` during decoding; `aud` is
/// kept raw so an array-valued audience can be told apart from a string.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderClaims {
    /// Subject (user ID)
    #[serde(default)]
    pub sub: Option<String>,

    /// Email address, when the provider includes it
    #[serde(default)]
    pub email: Option<String>,

    /// Expiration timestamp
    pub exp: i64,

    /// Audience
    #[serde(default)]
    pub aud: Option<serde_json::Value>,
}

/// Identity of the caller, produced per request from a verified token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VerifiedIdentity {
    /// Canonical user ID (`sub` claim)
    pub subject_id: Uuid,

    /// Email from the token, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl VerifiedIdentity {
    /// Create from verified claims.
    pub fn from_claims(claims: ProviderClaims) -> Result<Self, AuthError> {
        let subject_id = claims
            .sub
            .as_deref()
            .and_then(|sub| Uuid::parse_str(sub).ok())
            .ok_or(AuthError::MissingSubject)?;

        Ok(Self {
            subject_id,
            email: claims.email.filter(|email| !email.is_empty()),
        })
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! Every variant answers `401 Unauthorized`. The response body carries a
//! stable `error_code` and a fixed summary; nothing about the key set, the
//! algorithm or the upstream provider ever reaches the caller.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No usable `Authorization: Bearer` credential on the request
    MissingCredential,
    /// Token does not have three decodable segments or a parseable header
    MalformedToken,
    /// Signature does not verify under the key named by `kid`
    SignatureInvalid,
    /// `aud` is not exactly the configured audience
    AudienceMismatch,
    /// `exp` is in the past
    ExpiredToken,
    /// No published key matches the token's `kid`
    KeyNotFound,
    /// `sub` absent or not a user id
    MissingSubject,
    /// Key set could not be fetched from the identity provider
    UpstreamUnavailable,
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "missing_credential",
            AuthError::MalformedToken => "malformed_token",
            AuthError::SignatureInvalid => "signature_invalid",
            AuthError::AudienceMismatch => "audience_mismatch",
            AuthError::ExpiredToken => "expired_token",
            AuthError::KeyNotFound => "key_not_found",
            AuthError::MissingSubject => "missing_subject",
            AuthError::UpstreamUnavailable => "upstream_unavailable",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingCredential => write!(f, "Bearer token is required"),
            AuthError::MalformedToken => write!(f, "Token is malformed"),
            AuthError::SignatureInvalid => write!(f, "Token signature is invalid"),
            AuthError::AudienceMismatch => write!(f, "Token audience is invalid"),
            AuthError::ExpiredToken => write!(f, "Token has expired"),
            AuthError::KeyNotFound => write!(f, "Token signing key is unknown"),
            AuthError::MissingSubject => write!(f, "Token has no usable subject"),
            AuthError::UpstreamUnavailable => {
                write!(f, "Token could not be verified at this time")
            }
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}

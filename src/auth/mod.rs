// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Verifies access tokens issued by the external identity provider.
//!
//! ## Auth Flow
//!
//! 1. Frontend signs the user in with the identity provider
//! 2. Frontend sends `Authorization: Bearer <access token>`
//! 3. Server:
//!    - Fetches the provider's JWKS via HTTPS and caches it with a TTL
//!    - Resolves the signing key by `kid`, with the algorithm fixed by the key
//!    - Verifies signature, expiry and audience
//!    - Extracts:
//!      - `sub` → canonical `user_id`
//!      - `email` when present
//!
//! ## Security
//!
//! - All config endpoints require authentication
//! - The token header's `alg` is never trusted
//! - An unknown `kid` triggers at most one key-set refetch, and none while
//!   the cached set is younger than 10 seconds
//! - Clock skew tolerance defaults to 60 seconds

pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod verifier;

#[cfg(test)]
pub(crate) mod test_support;

pub use claims::VerifiedIdentity;
pub use error::AuthError;
pub use extractor::{Auth, OptionalAuth};
pub use jwks::{JwksCache, SigningKey};
pub use verifier::TokenVerifier;

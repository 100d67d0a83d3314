// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::TokenVerifier;
use crate::storage::{ConfigRepository, Database};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub verifier: Arc<TokenVerifier>,
}

impl AppState {
    pub fn new(db: Database, verifier: TokenVerifier) -> Self {
        Self {
            db,
            verifier: Arc::new(verifier),
        }
    }

    pub fn configs(&self) -> ConfigRepository {
        self.db.configs()
    }
}

/// State backed by a fresh database file and a verifier pointed at
/// `{jwks_base_uri}/jwks.json`. Keep the directory alive for the test.
#[cfg(test)]
pub(crate) async fn test_state(jwks_base_uri: &str) -> (AppState, tempfile::TempDir) {
    use crate::auth::{test_support::AUDIENCE, JwksCache};
    use crate::auth::jwks::DEFAULT_FETCH_TIMEOUT;

    let dir = tempfile::TempDir::new().unwrap();
    let url = format!("sqlite://{}", dir.path().join("test.db").display());
    let db = Database::connect(&url, 4).await.unwrap();

    let keys = JwksCache::new(format!("{jwks_base_uri}/jwks.json"), DEFAULT_FETCH_TIMEOUT).unwrap();
    (AppState::new(db, TokenVerifier::new(keys, AUDIENCE)), dir)
}

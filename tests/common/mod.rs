// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

#![allow(dead_code)]

use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;
use vestwise_server::{
    api::{cors_layer, router},
    auth::{JwksCache, TokenVerifier},
    state::AppState,
    storage::Database,
};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

pub const AUDIENCE: &str = "authenticated";
pub const KID: &str = "primary-2026";

const PEM: &str = include_str!("../fixtures/ec_primary.pem");
const X: &str = "MjJJYexYW_F66aZB1Ckv280oceZnzpUdwo8idValUfI";
const Y: &str = "0-z5kQImVxNzZwWplXxYc0VNKn44llFi4SbUFcnSL_g";

/// Router wired to a mocked key-set endpoint and a fresh SQLite file.
pub struct TestApp {
    pub router: Router,
    pub jwks: MockServer,
    _dir: TempDir,
}

impl TestApp {
    pub async fn start() -> Self {
        let jwks = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "keys": [{
                    "kty": "EC",
                    "crv": "P-256",
                    "use": "sig",
                    "kid": KID,
                    "x": X,
                    "y": Y,
                }]
            })))
            .mount(&jwks)
            .await;

        let dir = TempDir::new().unwrap();
        let url = format!("sqlite://{}", dir.path().join("vestwise.db").display());
        let db = Database::connect(&url, 4).await.unwrap();

        let keys = JwksCache::new(
            format!("{}/auth/v1/.well-known/jwks.json", jwks.uri()),
            Duration::from_secs(2),
        )
        .unwrap();
        let state = AppState::new(db, TokenVerifier::new(keys, AUDIENCE));

        Self {
            router: router(state, cors_layer(false, &[])),
            jwks,
            _dir: dir,
        }
    }

    /// Send a request as `user`, returning status and parsed JSON body
    /// (`Value::Null` when empty).
    pub async fn call(
        &self,
        user: Option<Uuid>,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        self.call_with_token(user.map(token_for), method, uri, body).await
    }

    pub async fn call_with_token(
        &self,
        token: Option<String>,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let content_type = body.as_ref().map(|_| "application/json");
        let body = body.map(|body| body.to_string()).unwrap_or_default();
        self.send(token, method, uri, content_type, body).await
    }

    /// Sends `body` verbatim, with `content_type` if given, as `user`.
    pub async fn call_raw(
        &self,
        user: Uuid,
        method: Method,
        uri: &str,
        content_type: Option<&str>,
        body: &str,
    ) -> (StatusCode, Value) {
        self.send(Some(token_for(user)), method, uri, content_type, body.to_string())
            .await
    }

    async fn send(
        &self,
        token: Option<String>,
        method: Method,
        uri: &str,
        content_type: Option<&str>,
        body: String,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(content_type) = content_type {
            request = request.header(header::CONTENT_TYPE, content_type);
        }
        let request = request.body(Body::from(body)).unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }
}

pub fn sign(claims: &Value) -> String {
    let mut header = Header::new(Algorithm::ES256);
    header.kid = Some(KID.to_string());
    encode(&header, claims, &EncodingKey::from_ec_pem(PEM.as_bytes()).unwrap()).unwrap()
}

pub fn token_for(user: Uuid) -> String {
    sign(&json!({
        "sub": user.to_string(),
        "email": "saver@example.com",
        "aud": AUDIENCE,
        "exp": Utc::now().timestamp() + 3600,
    }))
}

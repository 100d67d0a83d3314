// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fixture keys and token builders shared by the auth tests.

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use uuid::Uuid;

pub const AUDIENCE: &str = "authenticated";

/// P-256 key pair whose private half lives under `tests/fixtures/`.
pub struct TestKey {
    pub kid: &'static str,
    pub pem: &'static str,
    pub x: &'static str,
    pub y: &'static str,
}

pub const PRIMARY: TestKey = TestKey {
    kid: "primary-2026",
    pem: include_str!("../../tests/fixtures/ec_primary.pem"),
    x: "MjJJYexYW_F66aZB1Ckv280oceZnzpUdwo8idValUfI",
    y: "0-z5kQImVxNzZwWplXxYc0VNKn44llFi4SbUFcnSL_g",
};

pub const ROTATED: TestKey = TestKey {
    kid: "rotated-2026",
    pem: include_str!("../../tests/fixtures/ec_rotated.pem"),
    x: "iKZ51a2x5oE9ZBdGx5XjTdNWRl8tclE6eF2pl6OWo0A",
    y: "MKQ_5-M1ePyZhMD8ASbBmkMUY4Vmh_QbfCzooH1_3Es",
};

impl TestKey {
    /// Public half as a published JWK.
    pub fn jwk(&self) -> Value {
        json!({
            "kty": "EC",
            "crv": "P-256",
            "use": "sig",
            "kid": self.kid,
            "x": self.x,
            "y": self.y,
        })
    }

    /// Sign `claims` with ES256 under this key's own `kid`.
    pub fn sign(&self, claims: &Value) -> String {
        self.sign_as(self.kid, claims)
    }

    /// Sign `claims` with this key but advertise another `kid`.
    pub fn sign_as(&self, kid: &str, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(kid.to_string());
        let key = EncodingKey::from_ec_pem(self.pem.as_bytes()).unwrap();
        encode(&header, claims, &key).unwrap()
    }
}

pub fn jwks_body(keys: &[&TestKey]) -> Value {
    json!({ "keys": keys.iter().map(|k| k.jwk()).collect::<Vec<_>>() })
}

/// Claims a provider would issue for `sub`, valid for the next hour.
pub fn claims_for(sub: Uuid) -> Value {
    json!({
        "sub": sub.to_string(),
        "email": "saver@example.com",
        "aud": AUDIENCE,
        "role": "authenticated",
        "iat": Utc::now().timestamp(),
        "exp": Utc::now().timestamp() + 3600,
    })
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User provisioning.
//!
//! There is no sign-up endpoint: a user row appears the first time a caller
//! saves a configuration, keyed by the token subject.

use sqlx::SqliteConnection;
use uuid::Uuid;

use super::super::StoreResult;

/// Insert the user, or refresh the stored email if the row exists.
///
/// A token without an email keeps the previously stored one.
pub(crate) async fn upsert_user(
    conn: &mut SqliteConnection,
    user_id: Uuid,
    email: Option<&str>,
    now_micros: i64,
) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO users (id, email, created_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT (id) DO UPDATE SET email = COALESCE(excluded.email, users.email)
        "#,
    )
    .bind(user_id.to_string())
    .bind(email)
    .bind(now_micros)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

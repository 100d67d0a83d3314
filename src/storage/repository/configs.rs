// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Saved configuration repository.
//!
//! Each user may keep any number of configurations per calculator type, and
//! at most one of them per type is the default.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::super::{StoreError, StoreResult};
use super::users::upsert_user;
use crate::models::{ConfigType, CreateConfigRequest, UpdateConfigRequest, UserConfig};

/// Longest accepted configuration name, in characters.
pub const MAX_NAME_LEN: usize = 255;

const CONFIG_COLUMNS: &str =
    "id, user_id, config_type, name, config_data, is_default, created_at, updated_at";

/// Row as stored; ids are TEXT and timestamps are microseconds.
#[derive(Debug, FromRow)]
struct ConfigRow {
    id: String,
    user_id: String,
    config_type: String,
    name: Option<String>,
    config_data: String,
    is_default: bool,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<ConfigRow> for UserConfig {
    type Error = StoreError;

    fn try_from(row: ConfigRow) -> Result<Self, Self::Error> {
        Ok(UserConfig {
            id: Uuid::parse_str(&row.id).map_err(decode_error)?,
            user_id: Uuid::parse_str(&row.user_id).map_err(decode_error)?,
            config_type: row.config_type.parse().map_err(decode_error)?,
            name: row.name,
            config_data: serde_json::from_str(&row.config_data).map_err(decode_error)?,
            is_default: row.is_default,
            created_at: from_micros(row.created_at)?,
            updated_at: from_micros(row.updated_at)?,
        })
    }
}

fn decode_error(e: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> StoreError {
    StoreError::Unavailable(sqlx::Error::Decode(e.into()))
}

fn from_micros(micros: i64) -> StoreResult<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| decode_error(format!("timestamp out of range: {micros}")))
}

fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}

fn validate_name(name: Option<&str>) -> StoreResult<()> {
    match name {
        Some(name) if name.chars().count() > MAX_NAME_LEN => Err(StoreError::Validation(
            format!("name must be at most {MAX_NAME_LEN} characters"),
        )),
        _ => Ok(()),
    }
}

fn validate_config_data(data: &serde_json::Value) -> StoreResult<()> {
    if data.is_object() {
        Ok(())
    } else {
        Err(StoreError::Validation(
            "config_data must be a JSON object".to_string(),
        ))
    }
}

/// Clear the default flag on every config of `(user_id, config_type)`.
async fn clear_defaults(
    conn: &mut SqliteConnection,
    user_id: Uuid,
    config_type: ConfigType,
) -> StoreResult<u64> {
    let result = sqlx::query(
        r#"
        UPDATE user_configs
        SET is_default = 0
        WHERE user_id = ?1 AND config_type = ?2 AND is_default = 1
        "#,
    )
    .bind(user_id.to_string())
    .bind(config_type.as_str())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

/// Repository for saved configurations.
#[derive(Clone)]
pub struct ConfigRepository {
    pool: SqlitePool,
}

impl ConfigRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List a user's configs.
    ///
    /// Ordered by type, then default first, then most recently updated.
    pub async fn list(
        &self,
        user_id: Uuid,
        config_type: Option<ConfigType>,
    ) -> StoreResult<Vec<UserConfig>> {
        let sql = format!(
            r#"
            SELECT {CONFIG_COLUMNS}
            FROM user_configs
            WHERE user_id = ?1 AND (?2 IS NULL OR config_type = ?2)
            ORDER BY config_type, is_default DESC, updated_at DESC, created_at DESC
            "#
        );

        let rows: Vec<ConfigRow> = sqlx::query_as(&sql)
            .bind(user_id.to_string())
            .bind(config_type.map(|t| t.as_str()))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(UserConfig::try_from).collect()
    }

    /// Get one config owned by `user_id`.
    pub async fn get(&self, user_id: Uuid, id: Uuid) -> StoreResult<UserConfig> {
        let sql = format!("SELECT {CONFIG_COLUMNS} FROM user_configs WHERE id = ?1 AND user_id = ?2");

        let row: Option<ConfigRow> = sqlx::query_as(&sql)
            .bind(id.to_string())
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.ok_or(StoreError::NotFound)?.try_into()
    }

    /// Create a config, provisioning the user row if needed.
    ///
    /// When `is_default` is set, sibling defaults are cleared in the same
    /// transaction before the insert.
    pub async fn create(
        &self,
        user_id: Uuid,
        email: Option<&str>,
        request: CreateConfigRequest,
    ) -> StoreResult<UserConfig> {
        validate_name(request.name.as_deref())?;
        validate_config_data(&request.config_data)?;

        let id = Uuid::new_v4();
        let now = now_micros();
        let config_data = request.config_data.to_string();

        let mut tx = self.pool.begin().await?;

        // Write first: takes the database write lock for the whole transaction.
        upsert_user(&mut tx, user_id, email, now).await?;

        if request.is_default {
            let cleared = clear_defaults(&mut tx, user_id, request.config_type).await?;
            tracing::debug!(%user_id, config_type = %request.config_type, cleared, "Cleared previous default");
        }

        let sql = format!(
            r#"
            INSERT INTO user_configs ({CONFIG_COLUMNS})
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            RETURNING {CONFIG_COLUMNS}
            "#
        );
        let row: ConfigRow = sqlx::query_as(&sql)
            .bind(id.to_string())
            .bind(user_id.to_string())
            .bind(request.config_type.as_str())
            .bind(request.name)
            .bind(config_data)
            .bind(request.is_default)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(%user_id, config_id = %id, config_type = %request.config_type, "Config created");
        row.try_into()
    }

    /// Apply a partial update to a config owned by `user_id`.
    ///
    /// Only the supplied fields change; `updated_at` always moves forward.
    pub async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        changes: UpdateConfigRequest,
    ) -> StoreResult<UserConfig> {
        validate_name(changes.name.as_deref())?;
        if let Some(data) = &changes.config_data {
            validate_config_data(data)?;
        }

        let now = now_micros();
        let config_data = changes.config_data.as_ref().map(serde_json::Value::to_string);

        let mut tx = self.pool.begin().await?;

        if changes.is_default == Some(true) {
            // Siblings share this row's type; a missing or foreign row
            // matches nothing here and is reported by the update below.
            sqlx::query(
                r#"
                UPDATE user_configs
                SET is_default = 0
                WHERE user_id = ?1 AND id != ?2 AND is_default = 1
                  AND config_type = (
                      SELECT config_type FROM user_configs WHERE id = ?2 AND user_id = ?1
                  )
                "#,
            )
            .bind(user_id.to_string())
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        }

        let sql = format!(
            r#"
            UPDATE user_configs
            SET name = COALESCE(?1, name),
                config_data = COALESCE(?2, config_data),
                is_default = COALESCE(?3, is_default),
                updated_at = ?4
            WHERE id = ?5 AND user_id = ?6
            RETURNING {CONFIG_COLUMNS}
            "#
        );
        let row: Option<ConfigRow> = sqlx::query_as(&sql)
            .bind(changes.name)
            .bind(config_data)
            .bind(changes.is_default)
            .bind(now)
            .bind(id.to_string())
            .bind(user_id.to_string())
            .fetch_optional(&mut *tx)
            .await?;

        // Dropping `tx` without commit rolls back.
        let row = row.ok_or(StoreError::NotFound)?;
        tx.commit().await?;

        tracing::info!(%user_id, config_id = %id, "Config updated");
        row.try_into()
    }

    /// Delete a config owned by `user_id`.
    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM user_configs WHERE id = ?1 AND user_id = ?2")
            .bind(id.to_string())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        tracing::info!(%user_id, config_id = %id, "Config deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn memory_repo() -> ConfigRepository {
        Database::connect("sqlite::memory:", 1)
            .await
            .unwrap()
            .configs()
    }

    fn request(config_type: ConfigType, name: &str, is_default: bool) -> CreateConfigRequest {
        CreateConfigRequest {
            config_type,
            name: Some(name.to_string()),
            config_data: json!({ "grants": [], "label": name }),
            is_default,
        }
    }

    fn defaults_of(configs: &[UserConfig], config_type: ConfigType) -> Vec<&str> {
        configs
            .iter()
            .filter(|c| c.config_type == config_type && c.is_default)
            .filter_map(|c| c.name.as_deref())
            .collect()
    }

    #[tokio::test]
    async fn create_and_get_config() {
        let repo = memory_repo().await;
        let user_id = Uuid::new_v4();

        let created = repo
            .create(user_id, Some("a@example.com"), request(ConfigType::Rsu, "A", false))
            .await
            .unwrap();
        assert_eq!(created.user_id, user_id);
        assert_eq!(created.config_type, ConfigType::Rsu);
        assert_eq!(created.config_data, json!({ "grants": [], "label": "A" }));
        assert_eq!(created.created_at, created.updated_at);

        let loaded = repo.get(user_id, created.id).await.unwrap();
        assert_eq!(loaded, created);
    }

    #[tokio::test]
    async fn new_default_replaces_previous_default() {
        let repo = memory_repo().await;
        let user_id = Uuid::new_v4();

        let a = repo.create(user_id, None, request(ConfigType::Rsu, "A", true)).await.unwrap();
        let b = repo.create(user_id, None, request(ConfigType::Rsu, "B", true)).await.unwrap();

        assert!(b.is_default);
        assert!(!repo.get(user_id, a.id).await.unwrap().is_default);

        let all = repo.list(user_id, None).await.unwrap();
        assert_eq!(defaults_of(&all, ConfigType::Rsu), vec!["B"]);
    }

    #[tokio::test]
    async fn defaults_are_per_type() {
        let repo = memory_repo().await;
        let user_id = Uuid::new_v4();

        repo.create(user_id, None, request(ConfigType::Rsu, "R", true)).await.unwrap();
        repo.create(user_id, None, request(ConfigType::Pension, "P", true)).await.unwrap();

        let all = repo.list(user_id, None).await.unwrap();
        assert_eq!(defaults_of(&all, ConfigType::Rsu), vec!["R"]);
        assert_eq!(defaults_of(&all, ConfigType::Pension), vec!["P"]);
    }

    #[tokio::test]
    async fn defaults_are_per_user() {
        let repo = memory_repo().await;
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        repo.create(alice, None, request(ConfigType::Rsu, "alice", true)).await.unwrap();
        repo.create(bob, None, request(ConfigType::Rsu, "bob", true)).await.unwrap();

        let alice_configs = repo.list(alice, None).await.unwrap();
        assert_eq!(defaults_of(&alice_configs, ConfigType::Rsu), vec!["alice"]);
    }

    #[tokio::test]
    async fn list_orders_by_type_then_default_then_recency() {
        let repo = memory_repo().await;
        let user_id = Uuid::new_v4();

        for (config_type, name, is_default) in [
            (ConfigType::Rsu, "rsu-old", false),
            (ConfigType::Pension, "pension-default", true),
            (ConfigType::Rsu, "rsu-default", true),
            (ConfigType::Rsu, "rsu-new", false),
            (ConfigType::Pension, "pension-other", false),
        ] {
            repo.create(user_id, None, request(config_type, name, is_default))
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        let names: Vec<String> = repo
            .list(user_id, None)
            .await
            .unwrap()
            .into_iter()
            .filter_map(|c| c.name)
            .collect();
        assert_eq!(
            names,
            vec!["pension-default", "pension-other", "rsu-default", "rsu-new", "rsu-old"]
        );

        let rsu_only: Vec<String> = repo
            .list(user_id, Some(ConfigType::Rsu))
            .await
            .unwrap()
            .into_iter()
            .filter_map(|c| c.name)
            .collect();
        assert_eq!(rsu_only, vec!["rsu-default", "rsu-new", "rsu-old"]);
    }

    #[tokio::test]
    async fn update_moves_config_to_front() {
        let repo = memory_repo().await;
        let user_id = Uuid::new_v4();

        let first = repo.create(user_id, None, request(ConfigType::Rsu, "first", false)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
        repo.create(user_id, None, request(ConfigType::Rsu, "second", false)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;

        repo.update(user_id, first.id, UpdateConfigRequest::default()).await.unwrap();

        let list = repo.list(user_id, Some(ConfigType::Rsu)).await.unwrap();
        assert_eq!(list[0].id, first.id);
    }

    #[tokio::test]
    async fn update_changes_only_supplied_fields() {
        let repo = memory_repo().await;
        let user_id = Uuid::new_v4();
        let created = repo.create(user_id, None, request(ConfigType::Pension, "plan", false)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;

        let updated = repo
            .update(
                user_id,
                created.id,
                UpdateConfigRequest {
                    name: Some("renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name.as_deref(), Some("renamed"));
        assert_eq!(updated.config_data, created.config_data);
        assert_eq!(updated.is_default, created.is_default);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);
    }

    #[tokio::test]
    async fn update_to_default_clears_siblings_only() {
        let repo = memory_repo().await;
        let user_id = Uuid::new_v4();

        let a = repo.create(user_id, None, request(ConfigType::Rsu, "A", true)).await.unwrap();
        let b = repo.create(user_id, None, request(ConfigType::Rsu, "B", false)).await.unwrap();
        let p = repo.create(user_id, None, request(ConfigType::Pension, "P", true)).await.unwrap();

        let b = repo
            .update(
                user_id,
                b.id,
                UpdateConfigRequest {
                    is_default: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(b.is_default);
        assert!(!repo.get(user_id, a.id).await.unwrap().is_default);
        assert!(repo.get(user_id, p.id).await.unwrap().is_default);
    }

    #[tokio::test]
    async fn update_existing_default_to_default_keeps_it() {
        let repo = memory_repo().await;
        let user_id = Uuid::new_v4();
        let a = repo.create(user_id, None, request(ConfigType::Rsu, "A", true)).await.unwrap();

        let a = repo
            .update(
                user_id,
                a.id,
                UpdateConfigRequest {
                    is_default: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(a.is_default);
    }

    #[tokio::test]
    async fn foreign_config_is_not_found() {
        let repo = memory_repo().await;
        let owner = Uuid::new_v4();
        let intruder = Uuid::new_v4();
        let config = repo.create(owner, None, request(ConfigType::Rsu, "mine", true)).await.unwrap();

        assert!(matches!(repo.get(intruder, config.id).await, Err(StoreError::NotFound)));
        assert!(matches!(
            repo.update(
                intruder,
                config.id,
                UpdateConfigRequest {
                    is_default: Some(false),
                    ..Default::default()
                }
            )
            .await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(repo.delete(intruder, config.id).await, Err(StoreError::NotFound)));

        // Untouched for the owner.
        let still_there = repo.get(owner, config.id).await.unwrap();
        assert!(still_there.is_default);
    }

    #[tokio::test]
    async fn failed_default_update_rolls_back() {
        let repo = memory_repo().await;
        let user_id = Uuid::new_v4();
        let a = repo.create(user_id, None, request(ConfigType::Rsu, "A", true)).await.unwrap();

        let result = repo
            .update(
                user_id,
                Uuid::new_v4(),
                UpdateConfigRequest {
                    is_default: Some(true),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(StoreError::NotFound)));
        assert!(repo.get(user_id, a.id).await.unwrap().is_default);
    }

    #[tokio::test]
    async fn delete_removes_config_once() {
        let repo = memory_repo().await;
        let user_id = Uuid::new_v4();
        let config = repo.create(user_id, None, request(ConfigType::Rsu, "A", false)).await.unwrap();

        repo.delete(user_id, config.id).await.unwrap();
        assert!(matches!(repo.get(user_id, config.id).await, Err(StoreError::NotFound)));
        assert!(matches!(repo.delete(user_id, config.id).await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn validation_rejects_non_object_data_and_long_names() {
        let repo = memory_repo().await;
        let user_id = Uuid::new_v4();

        let mut bad_data = request(ConfigType::Rsu, "A", false);
        bad_data.config_data = json!([1, 2, 3]);
        assert!(matches!(
            repo.create(user_id, None, bad_data).await,
            Err(StoreError::Validation(_))
        ));

        let long_name = "x".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(
            repo.create(user_id, None, request(ConfigType::Rsu, &long_name, false)).await,
            Err(StoreError::Validation(_))
        ));

        let config = repo.create(user_id, None, request(ConfigType::Rsu, "ok", false)).await.unwrap();
        assert!(matches!(
            repo.update(
                user_id,
                config.id,
                UpdateConfigRequest {
                    config_data: Some(json!("not an object")),
                    ..Default::default()
                }
            )
            .await,
            Err(StoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn concurrent_default_sets_leave_exactly_one_default() {
        let dir = TempDir::new().unwrap();
        let url = format!("sqlite://{}", dir.path().join("race.db").display());
        let repo = Database::connect(&url, 8).await.unwrap().configs();
        let user_id = Uuid::new_v4();

        let existing: Vec<UserConfig> = {
            let mut configs = Vec::new();
            for i in 0..4 {
                configs.push(
                    repo.create(user_id, None, request(ConfigType::Rsu, &format!("e{i}"), false))
                        .await
                        .unwrap(),
                );
            }
            configs
        };

        let mut handles = Vec::new();
        for i in 0..8 {
            let repo = repo.clone();
            let target = existing[i % existing.len()].id;
            handles.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    repo.create(user_id, None, request(ConfigType::Rsu, &format!("n{i}"), true))
                        .await
                        .map(|_| ())
                } else {
                    repo.update(
                        user_id,
                        target,
                        UpdateConfigRequest {
                            is_default: Some(true),
                            ..Default::default()
                        },
                    )
                    .await
                    .map(|_| ())
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let all = repo.list(user_id, Some(ConfigType::Rsu)).await.unwrap();
        assert_eq!(all.len(), 8);
        assert_eq!(all.iter().filter(|c| c.is_default).count(), 1);
        assert!(all[0].is_default);
    }
}

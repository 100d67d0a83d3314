// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Relational Storage Module
//!
//! Persistent storage for users and their saved configurations, backed by
//! SQLite through a `sqlx` connection pool.
//!
//! ## Schema
//!
//! ```text
//! users(id, email, created_at)
//! user_configs(id, user_id, config_type, name, config_data,
//!              is_default, created_at, updated_at)
//! ```
//!
//! `config_data` is stored as JSON text. The schema is applied from the
//! embedded migrations in `migrations/` when the pool is opened.
//!
//! ## Consistency
//!
//! Every mutation that touches `is_default` runs in one transaction whose
//! first statement is a write, so competing writers are serialized by the
//! database write lock. A partial unique index additionally rejects a second
//! default for the same `(user_id, config_type)`.

use std::str::FromStr;
use std::time::Duration;

use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

pub mod error;
pub mod repository;

pub use error::{StoreError, StoreResult};
pub use repository::ConfigRepository;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// How long a connection waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the relational store. Cheap to clone.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open the pool and apply pending migrations.
    ///
    /// `sqlite::memory:` URLs are limited to one long-lived connection, since
    /// every in-memory connection is its own database.
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let in_memory = url.contains(":memory:");

        let mut options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let mut pool_options = SqlitePoolOptions::new().acquire_timeout(BUSY_TIMEOUT);
        pool_options = if in_memory {
            pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            pool_options.max_connections(max_connections)
        };

        let pool = pool_options.connect_with(options).await?;
        MIGRATOR.run(&pool).await?;

        tracing::info!(in_memory, "Database ready");
        Ok(Self { pool })
    }

    /// Trivial round trip used by the readiness check.
    pub async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub fn configs(&self) -> ConfigRepository {
        ConfigRepository::new(self.pool.clone())
    }

    /// Close all connections. Later queries fail.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
impl Database {
    pub(crate) async fn acquire_for_tests(&self) -> sqlx::pool::PoolConnection<sqlx::Sqlite> {
        self.pool.acquire().await.unwrap()
    }
}

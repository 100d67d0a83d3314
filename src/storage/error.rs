// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Errors raised by the config store.

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Row absent, or owned by another user
    #[error("Config not found")]
    NotFound,

    #[error("Invalid config: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Unavailable(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

pub type StoreResult<T> = Result<T, StoreError>;

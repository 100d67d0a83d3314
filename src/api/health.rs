// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Readiness response with database status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// "ready" or "not ready".
    pub status: String,
    /// "connected", or a short description of the failure.
    pub database: String,
}

/// Simple health check response for liveness checks.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Liveness check handler.
///
/// Always returns 200 if the process is running.
/// Does not check dependencies - use readiness for that.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

/// Readiness check handler.
///
/// Always answers 200; a failing database shows up in the body.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Readiness report", body = ReadyResponse)
    )
)]
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let response = match state.db.ping().await {
        Ok(()) => ReadyResponse {
            status: "ready".to_string(),
            database: "connected".to_string(),
        },
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            ReadyResponse {
                status: "not ready".to_string(),
                database: "unavailable".to_string(),
            }
        }
    };

    (StatusCode::OK, Json(response))
}

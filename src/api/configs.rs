// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Saved configuration endpoints.
//!
//! Every handler is scoped to the token subject; another user's config ids
//! answer 404.

use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;

use crate::{
    api::extract::{ApiJson, ApiPath, ApiQuery},
    auth::Auth,
    error::{ApiError, ErrorBody},
    models::{CreateConfigRequest, ListConfigsQuery, UpdateConfigRequest, UserConfig},
    state::AppState,
};

#[utoipa::path(
    get,
    path = "/configs",
    params(ListConfigsQuery),
    tag = "Configs",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = [UserConfig]),
        (status = 400, body = ErrorBody),
        (status = 401, body = ErrorBody)
    )
)]
pub async fn list_configs(
    Auth(identity): Auth,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListConfigsQuery>,
) -> Result<Json<Vec<UserConfig>>, ApiError> {
    let configs = state
        .configs()
        .list(identity.subject_id, query.config_type)
        .await?;
    Ok(Json(configs))
}

#[utoipa::path(
    post,
    path = "/configs",
    request_body = CreateConfigRequest,
    tag = "Configs",
    security(("bearer_auth" = [])),
    responses(
        (status = 201, body = UserConfig),
        (status = 400, body = ErrorBody),
        (status = 401, body = ErrorBody)
    )
)]
pub async fn create_config(
    Auth(identity): Auth,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateConfigRequest>,
) -> Result<(StatusCode, Json<UserConfig>), ApiError> {
    let config = state
        .configs()
        .create(identity.subject_id, identity.email.as_deref(), request)
        .await?;
    Ok((StatusCode::CREATED, Json(config)))
}

#[utoipa::path(
    get,
    path = "/configs/{config_id}",
    params(
        ("config_id" = Uuid, Path, description = "Identifier of the config")
    ),
    tag = "Configs",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = UserConfig),
        (status = 400, body = ErrorBody),
        (status = 401, body = ErrorBody),
        (status = 404, body = ErrorBody)
    )
)]
pub async fn get_config(
    Auth(identity): Auth,
    State(state): State<AppState>,
    ApiPath(config_id): ApiPath<Uuid>,
) -> Result<Json<UserConfig>, ApiError> {
    let config = state.configs().get(identity.subject_id, config_id).await?;
    Ok(Json(config))
}

/// Partial update; omitted fields keep their value.
#[utoipa::path(
    put,
    path = "/configs/{config_id}",
    params(
        ("config_id" = Uuid, Path, description = "Identifier of the config to update")
    ),
    request_body = UpdateConfigRequest,
    tag = "Configs",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = UserConfig),
        (status = 400, body = ErrorBody),
        (status = 401, body = ErrorBody),
        (status = 404, body = ErrorBody)
    )
)]
pub async fn update_config(
    Auth(identity): Auth,
    State(state): State<AppState>,
    ApiPath(config_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<UpdateConfigRequest>,
) -> Result<Json<UserConfig>, ApiError> {
    let config = state
        .configs()
        .update(identity.subject_id, config_id, request)
        .await?;
    Ok(Json(config))
}

#[utoipa::path(
    delete,
    path = "/configs/{config_id}",
    params(
        ("config_id" = Uuid, Path, description = "Identifier of the config to delete")
    ),
    tag = "Configs",
    security(("bearer_auth" = [])),
    responses(
        (status = 204),
        (status = 400, body = ErrorBody),
        (status = 401, body = ErrorBody),
        (status = 404, body = ErrorBody)
    )
)]
pub async fn delete_config(
    Auth(identity): Auth,
    State(state): State<AppState>,
    ApiPath(config_id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.configs().delete(identity.subject_id, config_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

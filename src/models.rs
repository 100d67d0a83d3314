// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response structures used by the REST API. All types derive
//! `Serialize`/`Deserialize` and `ToSchema` for JSON handling and the
//! OpenAPI document.
//!
//! ## Model Categories
//!
//! - **Config type**: which calculator a saved configuration belongs to
//! - **User configs**: saved calculator settings, one optional default per type
//! - **Requests**: create, partial update, list filter

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// =============================================================================
// Config Type
// =============================================================================

/// Calculator a configuration belongs to.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum ConfigType {
    /// RSU / ESPP calculator settings
    Rsu,
    /// Pension calculator settings
    Pension,
}

impl ConfigType {
    /// Stored and wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigType::Rsu => "rsu",
            ConfigType::Pension => "pension",
        }
    }
}

impl std::fmt::Display for ConfigType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "rsu" => Ok(ConfigType::Rsu),
            "pension" => Ok(ConfigType::Pension),
            other => Err(format!("unknown config type '{other}'")),
        }
    }
}

// =============================================================================
// User Config Models
// =============================================================================

/// A saved calculator configuration.
///
/// For a given user and config type at most one configuration is the default.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct UserConfig {
    /// Unique identifier for this configuration.
    pub id: Uuid,
    /// Owning user (the token subject that created it).
    pub user_id: Uuid,
    /// Calculator this configuration belongs to.
    pub config_type: ConfigType,
    /// Optional user-facing label.
    pub name: Option<String>,
    /// Calculator settings, stored verbatim.
    #[schema(value_type = Object)]
    pub config_data: serde_json::Value,
    /// Whether this is the user's default for its config type.
    pub is_default: bool,
    /// When the configuration was created.
    pub created_at: DateTime<Utc>,
    /// When the configuration was last changed.
    pub updated_at: DateTime<Utc>,
}

/// Request to create a configuration.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateConfigRequest {
    /// Calculator this configuration belongs to.
    pub config_type: ConfigType,
    /// Optional label.
    #[serde(default)]
    pub name: Option<String>,
    /// Calculator settings (must be a JSON object).
    #[schema(value_type = Object)]
    pub config_data: serde_json::Value,
    /// Make this the default for its config type.
    #[serde(default)]
    pub is_default: bool,
}

/// Partial update of a configuration. Omitted fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct UpdateConfigRequest {
    /// New label.
    #[serde(default)]
    pub name: Option<String>,
    /// Replacement settings (must be a JSON object).
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub config_data: Option<serde_json::Value>,
    /// New default flag. `true` clears the flag on sibling configurations.
    #[serde(default)]
    pub is_default: Option<bool>,
}

/// Query parameters for listing configurations.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListConfigsQuery {
    /// Only return configurations of this type.
    pub config_type: Option<ConfigType>,
}

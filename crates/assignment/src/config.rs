//! Overlay configuration.
//!
//! Passed explicitly to the loader; nothing here is process-global.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use overlay_core::RealmId;

pub const DEFAULT_REALM_NAME: &str = "ldap_users";
pub const DEFAULT_ROLE_NAME: &str = "Member";
pub const DEFAULT_MAPPING_PATH: &str = "/etc/keystone/user-project-map.json";
pub const DEFAULT_PROJECT_REALM: &str = "default";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("no overlay role configured")]
    NoRoleConfigured,
}

/// How overlay grants are appended to `list_role_assignments` results.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayListing {
    /// Overlay grants pass through the caller's filter like live grants.
    #[default]
    Filtered,
    /// Every overlay grant is appended regardless of the filter.
    Unfiltered,
}

impl core::str::FromStr for OverlayListing {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "filtered" => Ok(Self::Filtered),
            "unfiltered" => Ok(Self::Unfiltered),
            other => Err(ConfigError::InvalidValue {
                key: "overlay_listing",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Realm every overlay user belongs to.
    pub realm_name: String,
    /// Roles granted by the overlay. Only the first entry is used.
    pub default_roles: Vec<String>,
    /// JSON file mapping user names to project names.
    pub mapping_path: PathBuf,
    /// Realm that plain project names are resolved in.
    pub default_project_realm: RealmId,
    pub overlay_listing: OverlayListing,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            realm_name: DEFAULT_REALM_NAME.to_string(),
            default_roles: vec![DEFAULT_ROLE_NAME.to_string()],
            mapping_path: PathBuf::from(DEFAULT_MAPPING_PATH),
            default_project_realm: RealmId::new(DEFAULT_PROJECT_REALM),
            overlay_listing: OverlayListing::default(),
        }
    }
}

impl OverlayConfig {
    /// Load from a JSON file. Missing keys take their defaults.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Build from `OVERLAY_*` environment variables on top of the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = var("OVERLAY_REALM_NAME") {
            config.realm_name = v;
        }
        if let Some(v) = var("OVERLAY_DEFAULT_ROLES") {
            config.default_roles = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = var("OVERLAY_MAPPING_PATH") {
            config.mapping_path = PathBuf::from(v);
        }
        if let Some(v) = var("OVERLAY_DEFAULT_PROJECT_REALM") {
            config.default_project_realm = RealmId::new(v);
        }
        if let Some(v) = var("OVERLAY_LISTING") {
            config.overlay_listing = v.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.role_name().map(|_| ())
    }

    /// The single role granted by the overlay (first configured entry).
    pub fn role_name(&self) -> Result<&str, ConfigError> {
        self.default_roles
            .first()
            .map(String::as_str)
            .ok_or(ConfigError::NoRoleConfigured)
    }
}

//! Feature toggles consulted by the validators.
//!
//! The flags are an immutable snapshot passed by reference into every entry
//! point. Whoever owns the cluster configuration builds a new snapshot on change
//! (typically behind an `Arc`) instead of mutating one in place.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENABLE_API_FIELDS_KEY: &str = "enable-api-fields";
pub const ENABLE_OBJECT_PARAMS_KEY: &str = "enable-object-params";
pub const ENABLE_CUSTOM_TASKS_KEY: &str = "enable-custom-tasks";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FeatureFlags {
    /// Validate property access on object-typed parameters.
    pub enable_object_params: bool,
    /// Allow task references to kinds other than the built-in task kinds.
    pub enable_custom_tasks: bool,
    /// Skip checks that declarations exist for referenced parameters and
    /// workspaces, for specs that expect them to be propagated later.
    pub skip_propagated_validation: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for feature flag {key:?}: expected \"true\" or \"false\"")]
    InvalidBool { key: String, value: String },
    #[error("invalid value {value:?} for {key:?}: expected one of alpha, beta, stable")]
    InvalidApiFields { key: String, value: String },
}

impl FeatureFlags {
    /// Build flags from a key/value feature map as stored in cluster config.
    /// Unknown keys are ignored.
    pub fn from_config_map(data: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut flags = FeatureFlags::default();

        if let Some(value) = data.get(ENABLE_API_FIELDS_KEY) {
            flags.enable_object_params = match value.trim() {
                "alpha" => true,
                "beta" | "stable" => false,
                other => {
                    return Err(ConfigError::InvalidApiFields {
                        key: ENABLE_API_FIELDS_KEY.into(),
                        value: other.into(),
                    });
                }
            };
        }
        if let Some(value) = data.get(ENABLE_OBJECT_PARAMS_KEY) {
            flags.enable_object_params |= parse_bool(ENABLE_OBJECT_PARAMS_KEY, value)?;
        }
        if let Some(value) = data.get(ENABLE_CUSTOM_TASKS_KEY) {
            flags.enable_custom_tasks = parse_bool(ENABLE_CUSTOM_TASKS_KEY, value)?;
        }

        Ok(flags)
    }

    pub fn with_skip_propagated_validation(mut self, skip: bool) -> Self {
        self.skip_propagated_validation = skip;
        self
    }

    /// Declarations for parameters and workspaces must be checked.
    pub fn validate_declarations(&self) -> bool {
        !self.skip_propagated_validation
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key: key.into(),
            value: value.into(),
        }),
    }
}

//! Resolver configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::allow_list::AllowList;
use crate::error::ConfigError;

/// Options for a [`ReferenceResolver`](crate::ReferenceResolver).
///
/// Read from JSON of the form
///
/// ```json
/// { "allowed_targets": { "Source": { "nullable": ["Target"] } } }
/// ```
///
/// A missing `allowed_targets` key leaves the resolver's current allow-list
/// alone; an empty object clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
    /// Permitted target types per owner type and reference name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_targets: Option<AllowList>,
}

impl ResolverConfig {
    /// Create an empty configuration (changes nothing when applied).
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration that installs `allowed_targets`.
    pub fn with_allowed_targets(allowed_targets: AllowList) -> Self {
        Self {
            allowed_targets: Some(allowed_targets),
        }
    }

    /// Parse from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Convert from an already parsed JSON value, e.g. one section of a
    /// larger application config.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Read and parse a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}

//! Registry configuration.

use serde::{Deserialize, Serialize};

/// What to do when a tag is registered for a second, different type.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Fail with [`RegistryError::DuplicateTag`](crate::RegistryError::DuplicateTag).
    #[default]
    Reject,
    /// Rebind the tag to the newly registered type.
    Replace,
}

/// Registry behavior knobs.
///
/// Hosts that keep settings in a config file can deserialize this directly;
/// every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Conflict handling for tags bound to different types.
    pub duplicate_policy: DuplicatePolicy,
    /// Also resolve a type's fallback tag (its `type_name`) when it is
    /// registered under an explicit name. Values wrapped before the explicit
    /// registration carry the fallback tag; this keeps their records decodable.
    pub alias_type_names: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::Reject,
            alias_type_names: true,
        }
    }
}

impl RegistryConfig {
    /// Reject conflicts, resolve explicit tags only.
    pub fn strict() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::Reject,
            alias_type_names: false,
        }
    }

    /// Last registration wins; fallback tags resolve too.
    pub fn lenient() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::Replace,
            alias_type_names: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_reject_duplicates_and_alias() {
        let config = RegistryConfig::default();
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Reject);
        assert!(config.alias_type_names);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: RegistryConfig =
            serde_json::from_str(r#"{"duplicate_policy":"replace"}"#).unwrap();
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Replace);
        assert!(config.alias_type_names);

        let config: RegistryConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, RegistryConfig::default());
    }

    #[test]
    fn presets() {
        assert!(!RegistryConfig::strict().alias_type_names);
        assert_eq!(
            RegistryConfig::lenient().duplicate_policy,
            DuplicatePolicy::Replace
        );
    }
}

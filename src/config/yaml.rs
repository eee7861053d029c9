//! YAML config adapter.

use std::path::Path;

use super::{ConfigLoader, RawConfig};
use crate::error::ConfigError;

/// Loads the structured YAML layout:
///
/// ```yaml
/// smtp: { server, port, sender, recipient }
/// debug: { debug, debug_level }
/// rules_evaluation: all_matches
/// rules:
///   - condition: { target_name, target_type, lifecycle_status }
///     action: { recipients: [..], priority: "1" }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlLoader;

impl ConfigLoader for YamlLoader {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn parse(&self, path: &Path, contents: &str) -> Result<RawConfig, ConfigError> {
        let parse_err = |e: serde_yaml::Error| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        let value: serde_yaml::Value = serde_yaml::from_str(contents).map_err(parse_err)?;
        if !value.is_mapping() {
            return Err(ConfigError::NotAMapping {
                path: path.to_path_buf(),
            });
        }
        serde_yaml::from_value(value).map_err(parse_err)
    }
}

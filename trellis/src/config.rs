//! Project configuration loading.
//!
//! The configuration is a nested mapping read once at bootstrap from
//! `project_config.yml` in the project directory, with `TRELLIS_`-prefixed environment
//! variables layered on top. Recognized top-level keys are `name`, `debug` and
//! `component`; the `component` block maps component names to their component-specific
//! configuration, which the bootstrap consumes key by key and each component validates
//! against its own schema.

use config::{Config, ConfigError, Environment, File};
use fxhash::FxHashMap;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

/// Name of the project configuration file.
pub const PROJECT_CONFIG_FILE: &str = "project_config.yml";

const CONFIG_ENV_PREFIX: &str = "TRELLIS";

/// Raw project configuration. The `component` mapping is consumed during bootstrap;
/// each component afterwards owns its validated configuration snapshot.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProjectConfig {
    /// Display name of the project.
    #[serde(default)]
    pub name: Option<String>,
    /// Run components with debug-level diagnostics.
    #[serde(default)]
    pub debug: bool,
    /// Component name to component-specific configuration mapping.
    #[serde(default)]
    pub component: FxHashMap<String, Value>,
}

impl ProjectConfig {
    /// Loads the configuration from `project_config.yml` in `project_dir`, falling back
    /// to defaults when the file does not exist.
    pub fn load(project_dir: &Path) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(project_dir.join(PROJECT_CONFIG_FILE)).required(false))
            .add_source(Environment::with_prefix(CONFIG_ENV_PREFIX).separator("__"))
            .build()
            .and_then(|config| config.try_deserialize())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ProjectConfig;
    use std::path::Path;

    #[test]
    fn should_fall_back_to_defaults_without_config_file() {
        let config = ProjectConfig::load(Path::new("missing_project_dir")).unwrap();
        assert_eq!(config.name, None);
        assert!(!config.debug);
        assert!(config.component.is_empty());
    }
}

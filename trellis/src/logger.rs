//! Default logging component.
//!
//! Installs a global [tracing_subscriber] fmt subscriber according to its configuration:
//!
//! ```yaml
//! component:
//!   logger:
//!     log_level: debug     # env-filter directive, default "info"
//!     install: true        # install the global subscriber, default true
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::EnvFilter;
use trellis_component::component::{
    Component, ComponentContext, ConstructibleComponent, ErrorPtr,
};
use trellis_component::manager::ComponentManager;

fn default_log_level() -> String {
    "info".to_string()
}

fn default_install() -> bool {
    true
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LoggerConfig {
    /// Env-filter directive selecting the log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Install a global fmt subscriber during `init`.
    #[serde(default = "default_install")]
    pub install: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            install: default_install(),
        }
    }
}

/// Default component managing the process-wide tracing subscriber.
pub struct LoggerComponent {
    config: LoggerConfig,
    installed: AtomicBool,
}

impl ConstructibleComponent for LoggerComponent {
    type Config = LoggerConfig;

    fn build(config: LoggerConfig, _context: ComponentContext) -> Result<Self, ErrorPtr> {
        Ok(Self {
            config,
            installed: AtomicBool::new(false),
        })
    }
}

impl Component for LoggerComponent {
    fn init(&self, _manager: &ComponentManager) -> Result<(), ErrorPtr> {
        if self.config.install {
            // another subscriber may already be installed process-wide; keep it
            let installed = tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new(&self.config.log_level))
                .try_init()
                .is_ok();
            self.installed.store(installed, Ordering::SeqCst);
        }

        Ok(())
    }

    fn info(&self) -> Value {
        json!({ "installed": self.installed.load(Ordering::SeqCst) })
    }
}

#[cfg(test)]
mod tests {
    use crate::logger::LoggerConfig;
    use serde_json::json;

    #[test]
    fn should_apply_config_defaults() {
        let config: LoggerConfig = serde_json::from_value(json!({})).unwrap();
        assert_eq!(config.log_level, "info");
        assert!(config.install);
    }

    #[test]
    fn should_parse_explicit_config() {
        let config: LoggerConfig =
            serde_json::from_value(json!({ "log_level": "debug", "install": false })).unwrap();
        assert_eq!(config.log_level, "debug");
        assert!(!config.install);
    }
}

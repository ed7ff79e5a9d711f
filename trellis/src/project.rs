//! Project bootstrap: resolving component declarations and assembling the manager.
//!
//! A project combines two sources of component declarations:
//!
//! * framework defaults, registered under the [DEFAULT_COMPONENT_MODULE] path;
//! * project extensions, registered under `<project dir name>.component` - the Rust
//!   counterpart of the conventional `component` subfolder of a project directory.
//!
//! The combined declaration order (defaults first, extensions after) becomes the
//! manager's registration order and therefore its start and reverse-disposal order.
//! Default components are instantiated unconditionally; extension components are
//! instantiated from their `component` configuration keys, so a declared extension
//! without configuration stays dormant. Any leftover configuration key matching no
//! declaration is fatal.

use crate::config::ProjectConfig;
use crate::logger::LoggerComponent;
use config::ConfigError;
use fxhash::FxHashMap;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use trellis_component::error::{ComponentError, TypeRegistryError};
use trellis_component::manager::ComponentManager;
use trellis_component::registry::{ComponentTypeGroup, TypeRegistry};

/// Conventional name of the project extension package.
pub const COMPONENT_MODULE_FOLDER: &str = "component";

/// Module path under which the framework default components are registered.
pub const DEFAULT_COMPONENT_MODULE: &str = "trellis.component";

/// Errors surfaced while bootstrapping a project.
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("Error loading project configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Error resolving component modules: {0}")]
    Registry(#[from] TypeRegistryError),
    #[error("Error building components: {0}")]
    Component(#[from] ComponentError),
}

/// Type group holding the framework default components.
pub fn default_component_group() -> ComponentTypeGroup {
    ComponentTypeGroup::new("DefaultComponents").component::<LoggerComponent>("logger")
}

/// Registry pre-populated with the framework defaults under [DEFAULT_COMPONENT_MODULE].
pub fn default_type_registry() -> Result<TypeRegistry, TypeRegistryError> {
    let mut registry = TypeRegistry::new();
    registry.register_module(DEFAULT_COMPONENT_MODULE, vec![default_component_group()])?;

    Ok(registry)
}

/// A configured project rooted in a directory, ready to produce a [ComponentManager].
pub struct Project {
    project_dir: PathBuf,
    name: String,
    debug: bool,
    component_settings: FxHashMap<String, Value>,
    registry: TypeRegistry,
    default_modules: Vec<String>,
    extension_modules: Vec<String>,
}

impl Project {
    /// Creates a project from `project_dir`, loading `project_config.yml` when no
    /// configuration is passed explicitly.
    pub fn new(
        project_dir: impl Into<PathBuf>,
        config: Option<ProjectConfig>,
    ) -> Result<Self, BootstrapError> {
        let project_dir = project_dir.into();
        let config = match config {
            Some(config) => config,
            None => ProjectConfig::load(&project_dir)?,
        };

        Ok(Self {
            name: config
                .name
                .unwrap_or_else(|| "trellis project".to_string()),
            debug: config.debug,
            component_settings: config.component,
            registry: default_type_registry()?,
            default_modules: vec![DEFAULT_COMPONENT_MODULE.to_string()],
            extension_modules: Vec::new(),
            project_dir,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.project_dir.join(crate::config::PROJECT_CONFIG_FILE)
    }

    /// Module path of the project extension package, derived from the directory name.
    pub fn component_module(&self) -> String {
        let dir_name = self
            .project_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string());

        format!("{}.{}", dir_name, COMPONENT_MODULE_FOLDER)
    }

    /// Registers project extension type groups under [component_module](Self::component_module).
    pub fn register_extension_groups(
        &mut self,
        groups: Vec<ComponentTypeGroup>,
    ) -> Result<(), BootstrapError> {
        let path = self.component_module();
        self.register_module(path, groups)
    }

    /// Registers extension type groups under an explicit module path.
    pub fn register_module(
        &mut self,
        path: impl Into<String>,
        groups: Vec<ComponentTypeGroup>,
    ) -> Result<(), BootstrapError> {
        let path = path.into();
        self.registry.register_module(&path, groups)?;
        if !self.extension_modules.contains(&path) {
            self.extension_modules.push(path);
        }

        Ok(())
    }

    /// Builds the component manager for this project - see [create_component_manager].
    pub fn create_component_manager(&self) -> Result<ComponentManager, BootstrapError> {
        create_component_manager(
            &self.registry,
            Some(&self.project_dir),
            self.component_settings.clone(),
            &self.default_modules,
            &self.extension_modules,
        )
    }
}

/// Assembles a [ComponentManager] from discovered type groups and raw component
/// settings.
///
/// Default-module components are registered and initialized unconditionally, each
/// popping its matching configuration key (a missing key means schema defaults apply).
/// Every remaining key is then an ad-hoc registration by name; a key matching no known
/// declaration fails with [ComponentError::UnknownComponent] and no manager is returned.
pub fn create_component_manager(
    registry: &TypeRegistry,
    project_dir: Option<&Path>,
    component_settings: FxHashMap<String, Value>,
    default_module_paths: &[String],
    extension_module_paths: &[String],
) -> Result<ComponentManager, BootstrapError> {
    let mut settings: FxHashMap<String, Value> = component_settings
        .into_iter()
        .map(|(name, value)| (name.to_lowercase(), value))
        .collect();

    let mut default_groups = Vec::new();
    for path in default_module_paths {
        default_groups.extend(registry.discover(path)?);
    }

    let mut extension_groups = Vec::new();
    for path in extension_module_paths {
        extension_groups.extend(registry.discover(path)?);
    }

    let mut manager = ComponentManager::from_groups(
        default_groups
            .iter()
            .copied()
            .chain(extension_groups.iter().copied()),
        project_dir.map(Path::to_path_buf),
    )?;

    for group in &default_groups {
        for (name, _) in group.members() {
            let raw_config = settings.remove(name).unwrap_or(Value::Null);
            manager.register_named(name, raw_config, false)?;
        }
    }

    // hash maps have no stable order; register leftover keys deterministically
    let mut remaining: Vec<(String, Value)> = settings.into_iter().collect();
    remaining.sort_by(|left, right| left.0.cmp(&right.0));
    for (name, raw_config) in remaining {
        manager.register_named(&name, raw_config, false)?;
    }

    info!(
        components = manager.components().count(),
        "Component manager ready"
    );
    Ok(manager)
}

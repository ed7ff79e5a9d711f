//! The component instance store: owns all live component instances for one project and
//! drives their lifecycle.
//!
//! The manager captures its descriptor list once, at construction; that order is the
//! start order, and its exact reverse is the disposal order, for the whole life of the
//! manager. Registering a replacement instance never moves a name's position. Disposing
//! dependents before their dependencies is the central ordering guarantee: a component
//! may still reach every component registered before itself from its `dispose` hook.

use crate::component::{
    Component, ComponentContext, ComponentInstanceAnyPtr, ComponentInstancePtr,
    ConstructibleComponent,
};
use crate::error::ComponentError;
use crate::registry::{CastFunction, ComponentDescriptor, ComponentTypeGroup};
use fxhash::FxHashMap;
use serde_json::{Map, Value};
use std::any::{type_name, TypeId};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

struct RegisteredComponent {
    instance: ComponentInstancePtr<dyn Component>,
    any: ComponentInstanceAnyPtr,
    casts: FxHashMap<TypeId, CastFunction>,
    config: Value,
}

/// Container owning at most one live component instance per name.
///
/// Instances are created from [ComponentDescriptor]s through
/// [register_named](Self::register_named), or from concrete types through
/// [register](Self::register). Lookup works by exact name or by capability type; the
/// lifecycle loops [start_all](Self::start_all) and [dispose_all](Self::dispose_all)
/// follow the descriptor order captured at construction.
pub struct ComponentManager {
    descriptors: Vec<ComponentDescriptor>,
    descriptor_index: FxHashMap<String, usize>,
    instances: FxHashMap<String, RegisteredComponent>,
    live_order: Vec<String>,
    project_dir: Option<PathBuf>,
}

impl std::fmt::Debug for ComponentManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentManager")
            .field("live_order", &self.live_order)
            .field("project_dir", &self.project_dir)
            .finish_non_exhaustive()
    }
}

impl ComponentManager {
    /// Creates a manager over the given descriptors. Descriptor order becomes the
    /// registration order; duplicate names across descriptors are rejected.
    pub fn new(
        descriptors: Vec<ComponentDescriptor>,
        project_dir: Option<PathBuf>,
    ) -> Result<Self, ComponentError> {
        let mut descriptor_index = FxHashMap::default();
        for (index, descriptor) in descriptors.iter().enumerate() {
            if descriptor_index
                .insert(descriptor.name().to_string(), index)
                .is_some()
            {
                return Err(ComponentError::DuplicateComponent(
                    descriptor.name().to_string(),
                ));
            }
        }

        Ok(Self {
            descriptors,
            descriptor_index,
            instances: Default::default(),
            live_order: Vec::new(),
            project_dir,
        })
    }

    /// Creates a manager from type groups, flattening their descriptors in order.
    pub fn from_groups<'a>(
        groups: impl IntoIterator<Item = &'a ComponentTypeGroup>,
        project_dir: Option<PathBuf>,
    ) -> Result<Self, ComponentError> {
        let descriptors = groups
            .into_iter()
            .flat_map(|group| group.descriptors().iter().cloned())
            .collect();

        Self::new(descriptors, project_dir)
    }

    pub fn project_dir(&self) -> Option<&Path> {
        self.project_dir.as_deref()
    }

    /// Descriptor names in registration order; disposal runs in the exact reverse.
    pub fn registration_order(&self) -> impl Iterator<Item = &str> {
        self.descriptors.iter().map(|descriptor| descriptor.name())
    }

    /// Creates and stores an instance for the named descriptor, binding `raw_config`
    /// against the implementation's configuration schema, then runs its `init` hook.
    ///
    /// Fails with [UnknownComponent](ComponentError::UnknownComponent) for names outside
    /// the descriptor set and with [DuplicateComponent](ComponentError::DuplicateComponent)
    /// when a live instance exists and `replace` is false. A binding or `init` failure
    /// leaves no instance behind - also when replacing: the displaced instance has
    /// already been dropped at that point, without its `dispose` hook running.
    pub fn register_named(
        &mut self,
        name: &str,
        raw_config: Value,
        replace: bool,
    ) -> Result<(), ComponentError> {
        let normalized = name.to_lowercase();
        let index = *self
            .descriptor_index
            .get(&normalized)
            .ok_or(ComponentError::UnknownComponent(normalized))?;
        let descriptor = self.descriptors[index].clone();

        self.install(descriptor, raw_config, replace)
    }

    /// Creates and stores an instance of a concrete implementation type under `name`.
    /// The instance participates in lookups and broadcasts, but only descriptor-declared
    /// names take part in the ordered start/disposal loops.
    pub fn register<T: ConstructibleComponent>(
        &mut self,
        name: &str,
        raw_config: Value,
        replace: bool,
    ) -> Result<(), ComponentError> {
        self.install(ComponentDescriptor::new::<T>(name), raw_config, replace)
    }

    fn install(
        &mut self,
        descriptor: ComponentDescriptor,
        raw_config: Value,
        replace: bool,
    ) -> Result<(), ComponentError> {
        let name = descriptor.name().to_string();
        if !replace && self.instances.contains_key(&name) {
            return Err(ComponentError::DuplicateComponent(name));
        }

        let context = ComponentContext::new(&*self, self.project_dir.as_deref());
        let built = descriptor.construct(raw_config, context)?;

        let record = RegisteredComponent {
            instance: built.instance,
            any: built.any,
            casts: descriptor.casts().iter().copied().collect(),
            config: built.config,
        };

        // first registration establishes the live-instance position; replacement keeps it
        if self.instances.insert(name.clone(), record).is_none() {
            self.live_order.push(name.clone());
        }

        let instance = self.instances[&name].instance.clone();
        if let Err(source) = instance.init(&*self) {
            self.instances.remove(&name);
            self.live_order.retain(|stored| stored != &name);
            return Err(ComponentError::Lifecycle {
                component: name,
                phase: "init",
                source,
            });
        }

        debug!(component = name.as_str(), "Registered component");
        Ok(())
    }

    /// Returns the live instance registered under `name`.
    pub fn instance_by_name(
        &self,
        name: &str,
    ) -> Result<ComponentInstancePtr<dyn Component>, ComponentError> {
        let normalized = name.to_lowercase();
        self.instances
            .get(&normalized)
            .map(|record| record.instance.clone())
            .ok_or(ComponentError::ComponentNotFound(normalized))
    }

    /// Returns the first live instance, in insertion order, registered with a cast for
    /// capability type `T` - either a concrete component type or a `dyn Trait` declared
    /// via [with_capability](ComponentDescriptor::with_capability).
    pub fn instance_typed<T: ?Sized + 'static>(
        &self,
    ) -> Result<ComponentInstancePtr<T>, ComponentError> {
        let type_id = TypeId::of::<T>();
        for name in &self.live_order {
            if let Some(record) = self.instances.get(name) {
                if let Some(cast) = record.casts.get(&type_id) {
                    return (cast)(record.any.clone())
                        .ok()
                        .and_then(|boxed| boxed.downcast::<ComponentInstancePtr<T>>().ok())
                        .map(|instance| *instance)
                        .ok_or_else(|| {
                            ComponentError::NotAComponent(type_name::<T>().to_string())
                        });
                }
            }
        }

        Err(ComponentError::ComponentNotFound(
            type_name::<T>().to_string(),
        ))
    }

    pub fn has_instance(&self, name: &str) -> bool {
        self.instances.contains_key(&name.to_lowercase())
    }

    pub fn has_instance_typed<T: ?Sized + 'static>(&self) -> bool {
        self.instance_typed::<T>().is_ok()
    }

    /// Live instances as (name, instance) pairs, in insertion order.
    pub fn components(
        &self,
    ) -> impl Iterator<Item = (&str, &ComponentInstancePtr<dyn Component>)> {
        self.live_order.iter().filter_map(|name| {
            self.instances
                .get(name)
                .map(|record| (name.as_str(), &record.instance))
        })
    }

    /// Metadata snapshot for all live instances: name to the component's
    /// [info](Component::info) keys merged over `{"config": <bound configuration>}`.
    pub fn info(&self) -> Value {
        let mut info = Map::new();
        for (name, instance) in self.components() {
            let mut entry = Map::new();
            if let Some(record) = self.instances.get(name) {
                entry.insert("config".to_string(), record.config.clone());
            }
            if let Value::Object(extra) = instance.info() {
                entry.extend(extra);
            }
            info.insert(name.to_string(), Value::Object(entry));
        }

        Value::Object(info)
    }

    /// Starts components in registration order, awaiting each `start` hook. Descriptors
    /// without a live instance are skipped. The first failing hook aborts the loop.
    pub async fn start_all(&self) -> Result<(), ComponentError> {
        info!("Starting components...");

        for descriptor in &self.descriptors {
            if let Some(record) = self.instances.get(descriptor.name()) {
                debug!(component = descriptor.name(), "Starting component");
                record
                    .instance
                    .start(self)
                    .await
                    .map_err(|source| ComponentError::Lifecycle {
                        component: descriptor.name().to_string(),
                        phase: "start",
                        source,
                    })?;
            }
        }

        Ok(())
    }

    /// Disposes components in exact reverse registration order, awaiting each `dispose`
    /// hook. Descriptors without a live instance are skipped. The first failing hook
    /// aborts the remaining disposal loop.
    pub async fn dispose_all(&self) -> Result<(), ComponentError> {
        info!("Disposing components...");

        for descriptor in self.descriptors.iter().rev() {
            if let Some(record) = self.instances.get(descriptor.name()) {
                debug!(component = descriptor.name(), "Disposing component");
                record
                    .instance
                    .dispose(self)
                    .await
                    .map_err(|source| ComponentError::Lifecycle {
                        component: descriptor.name().to_string(),
                        phase: "dispose",
                        source,
                    })?;
            }
        }

        Ok(())
    }
}

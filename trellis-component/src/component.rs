//! The component contract: a named, configuration-bound unit with an init/start/dispose
//! lifecycle, owned by a [ComponentManager].
//!
//! Components come in two layers:
//!
//! * [Component] is the runtime contract the manager talks to: lifecycle hooks with a
//!   uniform asynchronous call shape and an optional string-keyed
//!   [dispatch](Component::dispatch) table for business methods.
//! * [ConstructibleComponent] is the explicit factory the registry binds configuration
//!   with: a serde-validated `Config` type plus a `build` function.
//!
//! Every hook receives a reference to the owning manager, so components can look up
//! siblings during `init`, `start` and `dispose`. A component is expected to depend only
//! on components registered before itself; the manager disposes in reverse registration
//! order, so dependencies remain live while their dependents tear down.

use crate::dispatch::Handler;
use crate::future::{BoxFuture, FutureExt};
use crate::manager::ComponentManager;
use derive_more::Constructor;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::error::Error;
use std::path::Path;
use std::sync::Arc;

/// Type-erased error returned from component hooks and handlers.
pub type ErrorPtr = Arc<dyn Error + Send + Sync>;

/// Pointer type in which component instances are stored and returned from lookups.
pub type ComponentInstancePtr<T> = Arc<T>;

/// Type-erased component instance pointer, used by [CastFunction](crate::registry::CastFunction)s.
pub type ComponentInstanceAnyPtr = Arc<dyn Any + Send + Sync>;

/// Context handed to [ConstructibleComponent::build]: the owning manager (with all
/// previously registered components available for lookup) and the optional project root.
#[derive(Constructor, Clone, Copy)]
pub struct ComponentContext<'a> {
    pub manager: &'a ComponentManager,
    pub project_dir: Option<&'a Path>,
}

/// Runtime contract between a component instance and the owning [ComponentManager].
///
/// `start` and `dispose` share one asynchronous call shape - components with nothing to
/// await simply return a ready future. All hooks have no-op defaults, so implementations
/// override only the phases they care about.
pub trait Component: Send + Sync {
    /// Called exactly once, synchronously, right after the instance is registered.
    fn init(&self, _manager: &ComponentManager) -> Result<(), ErrorPtr> {
        Ok(())
    }

    /// Called during the manager startup phase, in registration order.
    fn start<'a>(&'a self, _manager: &'a ComponentManager) -> BoxFuture<'a, Result<(), ErrorPtr>> {
        async { Ok(()) }.boxed()
    }

    /// Called during the manager shutdown phase, in reverse registration order. Instances
    /// release all resources they own here.
    fn dispose<'a>(&'a self, _manager: &'a ComponentManager) -> BoxFuture<'a, Result<(), ErrorPtr>> {
        async { Ok(()) }.boxed()
    }

    /// Metadata snapshot for this instance. Keys returned here are merged over the
    /// default `{"config": <bound configuration>}` entry produced by the manager.
    fn info(&self) -> Value {
        Value::Null
    }

    /// Resolves a business method by name for [invoke](ComponentManager::invoke)/
    /// [broadcast](ComponentManager::broadcast). Returning `None` means the component
    /// does not define `method` and is skipped by broadcasts.
    fn dispatch(&self, _method: &str, _args: &[Value]) -> Option<Handler<'_>> {
        None
    }
}

impl std::fmt::Debug for dyn Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Component")
    }
}

/// Factory contract for components constructible from raw configuration.
///
/// The registry locates the declared `Config` schema through this trait, validates the
/// raw configuration mapping against it and hands the typed result to [build].
/// Missing component configuration is treated as an empty mapping, so schema defaults
/// apply; unknown fields are ignored unless the schema opts out via serde attributes.
///
/// [build]: ConstructibleComponent::build
pub trait ConstructibleComponent: Component + Sized + 'static {
    type Config: DeserializeOwned + Serialize;

    fn build(config: Self::Config, context: ComponentContext) -> Result<Self, ErrorPtr>;
}

//! Component container driven by external configuration.
//!
//! A [Component](component::Component) is a named, configuration-bound unit with an
//! init/start/dispose lifecycle. Component implementations are declared in
//! [type groups](registry::ComponentTypeGroup) registered under symbolic module paths in a
//! [TypeRegistry](registry::TypeRegistry), and instantiated into a
//! [ComponentManager](manager::ComponentManager), which owns all live instances for one
//! project, starts them in registration order and disposes them in exact reverse order.
//!
//! Beyond the lifecycle, the manager exposes a string-keyed dispatcher for invoking
//! arbitrary component methods, either on a single component or broadcast across all of
//! them - see [dispatch].

pub mod component;
pub mod dispatch;
pub mod error;
pub mod future;
pub mod manager;
pub mod registry;

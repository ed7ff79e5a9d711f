//! Component declarations and their discovery.
//!
//! Instead of a global mutable registry populated by scattered registration calls, every
//! extension package declares its components in a [ComponentTypeGroup]: an ordered,
//! immutable list of [ComponentDescriptor]s built at startup. Groups are registered in a
//! [TypeRegistry] under symbolic module paths (e.g. `myproject.component`), which a
//! project bootstrap later [discovers](TypeRegistry::discover) to assemble the manager's
//! registration order.

use crate::component::{
    Component, ComponentContext, ComponentInstanceAnyPtr, ComponentInstancePtr,
    ConstructibleComponent,
};
use crate::error::{ComponentError, TypeRegistryError};
use derivative::Derivative;
use fxhash::{FxHashMap, FxHashSet};
use serde_json::{Map, Value};
use std::any::{type_name, Any, TypeId};

/// Cast function converting a type-erased instance pointer into a `Box<dyn Any>` holding
/// a [ComponentInstancePtr] to a capability type (a concrete component or a `dyn Trait`
/// it implements). Registered per descriptor and consulted by type-based lookups.
pub type CastFunction =
    fn(instance: ComponentInstanceAnyPtr) -> Result<Box<dyn Any>, ComponentInstanceAnyPtr>;

type ConstructorFn =
    fn(name: &str, raw_config: Value, context: ComponentContext) -> Result<BuiltInstance, ComponentError>;

/// Freshly constructed instance together with its bound configuration snapshot.
pub(crate) struct BuiltInstance {
    pub(crate) instance: ComponentInstancePtr<dyn Component>,
    pub(crate) any: ComponentInstanceAnyPtr,
    pub(crate) config: Value,
}

fn construct<T: ConstructibleComponent>(
    name: &str,
    raw_config: Value,
    context: ComponentContext,
) -> Result<BuiltInstance, ComponentError> {
    // absent configuration falls back to an empty mapping, so schema defaults apply
    let raw_config = if raw_config.is_null() {
        Value::Object(Map::new())
    } else {
        raw_config
    };

    let config: T::Config =
        serde_json::from_value(raw_config).map_err(|error| ComponentError::ConfigValidation {
            component: name.to_string(),
            message: error.to_string(),
        })?;
    let snapshot = serde_json::to_value(&config).unwrap_or(Value::Null);

    let instance = T::build(config, context).map_err(|source| ComponentError::Lifecycle {
        component: name.to_string(),
        phase: "construction",
        source,
    })?;
    let instance = ComponentInstancePtr::new(instance);

    Ok(BuiltInstance {
        any: instance.clone(),
        instance,
        config: snapshot,
    })
}

fn self_cast<T: ConstructibleComponent>(
    instance: ComponentInstanceAnyPtr,
) -> Result<Box<dyn Any>, ComponentInstanceAnyPtr> {
    instance
        .downcast::<T>()
        .map(|instance| Box::new(instance) as Box<dyn Any>)
}

/// Static declaration of one component: normalized name, implementation type,
/// configuration-binding constructor and the capability casts the implementation
/// supports. Descriptors are owned by type groups and referenced by the manager.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct ComponentDescriptor {
    name: String,
    type_name: &'static str,
    #[derivative(Debug = "ignore")]
    constructor: ConstructorFn,
    #[derivative(Debug = "ignore")]
    casts: Vec<(TypeId, CastFunction)>,
}

impl ComponentDescriptor {
    /// Creates a descriptor for implementation type `T` under `name`. Names are compared
    /// case-insensitively and stored lower-cased. A self cast for `T` is always
    /// registered, so type-based lookup of the concrete type works out of the box.
    pub fn new<T: ConstructibleComponent>(name: &str) -> Self {
        Self {
            name: name.to_lowercase(),
            type_name: type_name::<T>(),
            constructor: construct::<T>,
            casts: vec![(TypeId::of::<T>(), self_cast::<T>)],
        }
    }

    /// Additionally registers capability type `S` (typically `dyn Trait + Send + Sync`)
    /// for this component, making it discoverable through
    /// [instance_typed](crate::manager::ComponentManager::instance_typed). The cast
    /// function must produce a `Box<dyn Any>` holding a `ComponentInstancePtr<S>`.
    pub fn with_capability<S: ?Sized + 'static>(mut self, cast: CastFunction) -> Self {
        self.casts.push((TypeId::of::<S>(), cast));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn construct(
        &self,
        raw_config: Value,
        context: ComponentContext,
    ) -> Result<BuiltInstance, ComponentError> {
        (self.constructor)(&self.name, raw_config, context)
    }

    pub(crate) fn casts(&self) -> &[(TypeId, CastFunction)] {
        &self.casts
    }
}

/// Ordered, immutable group of component declarations contributed by one extension
/// package. Declaration order within a group becomes registration order in the manager.
#[derive(Clone, Debug)]
pub struct ComponentTypeGroup {
    name: String,
    descriptors: Vec<ComponentDescriptor>,
}

impl ComponentTypeGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descriptors: Vec::new(),
        }
    }

    /// Declares implementation type `T` under `name`.
    pub fn component<T: ConstructibleComponent>(self, name: &str) -> Self {
        self.descriptor(ComponentDescriptor::new::<T>(name))
    }

    /// Declares a pre-built descriptor, e.g. one carrying capability casts.
    pub fn descriptor(mut self, descriptor: ComponentDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptors(&self) -> &[ComponentDescriptor] {
        &self.descriptors
    }

    /// Declared members as (normalized name, descriptor) pairs, in declaration order.
    pub fn members(&self) -> impl Iterator<Item = (&str, &ComponentDescriptor)> {
        self.descriptors
            .iter()
            .map(|descriptor| (descriptor.name(), descriptor))
    }
}

/// Registry of component type groups keyed by symbolic module path.
#[derive(Default, Debug)]
pub struct TypeRegistry {
    modules: FxHashMap<String, Vec<ComponentTypeGroup>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `groups` under `path`, appending to any groups already present there.
    /// Member names must be unique (case-insensitively) within each group.
    pub fn register_module(
        &mut self,
        path: impl Into<String>,
        groups: Vec<ComponentTypeGroup>,
    ) -> Result<(), TypeRegistryError> {
        for group in &groups {
            let mut seen = FxHashSet::default();
            for (name, _) in group.members() {
                if !seen.insert(name.to_string()) {
                    return Err(TypeRegistryError::DuplicateDeclaration {
                        group: group.name().to_string(),
                        name: name.to_string(),
                    });
                }
            }
        }

        self.modules.entry(path.into()).or_default().extend(groups);
        Ok(())
    }

    /// Returns all type groups registered under `path`, in registration order.
    pub fn discover(&self, path: &str) -> Result<&[ComponentTypeGroup], TypeRegistryError> {
        self.modules
            .get(path)
            .map(Vec::as_slice)
            .ok_or_else(|| TypeRegistryError::ModuleResolution(path.to_string()))
    }

    pub fn is_registered(&self, path: &str) -> bool {
        self.modules.contains_key(path)
    }
}

#[cfg(test)]
mod tests {
    use crate::component::{Component, ComponentContext, ConstructibleComponent, ErrorPtr};
    use crate::error::TypeRegistryError;
    use crate::registry::{ComponentTypeGroup, TypeRegistry};
    use serde::{Deserialize, Serialize};

    #[derive(Default, Deserialize, Serialize)]
    struct EmptyConfig {}

    struct TestComponent;

    impl Component for TestComponent {}

    impl ConstructibleComponent for TestComponent {
        type Config = EmptyConfig;

        fn build(_config: EmptyConfig, _context: ComponentContext) -> Result<Self, ErrorPtr> {
            Ok(TestComponent)
        }
    }

    #[test]
    fn should_normalize_member_names() {
        let group = ComponentTypeGroup::new("TestGroup")
            .component::<TestComponent>("Foo")
            .component::<TestComponent>("BAR");

        let members: Vec<_> = group.members().map(|(name, _)| name).collect();
        assert_eq!(members, ["foo", "bar"]);
    }

    #[test]
    fn should_discover_registered_module() {
        let mut registry = TypeRegistry::new();
        registry
            .register_module(
                "test.component",
                vec![ComponentTypeGroup::new("TestGroup").component::<TestComponent>("foo")],
            )
            .unwrap();

        let groups = registry.discover("test.component").unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].descriptors()[0].name(), "foo");
        assert!(registry.is_registered("test.component"));
    }

    #[test]
    fn should_not_discover_unknown_module() {
        let registry = TypeRegistry::new();
        assert_eq!(
            registry.discover("missing.component").unwrap_err(),
            TypeRegistryError::ModuleResolution("missing.component".to_string())
        );
    }

    #[test]
    fn should_reject_duplicate_declaration() {
        let mut registry = TypeRegistry::new();
        let result = registry.register_module(
            "test.component",
            vec![ComponentTypeGroup::new("TestGroup")
                .component::<TestComponent>("foo")
                .component::<TestComponent>("FOO")],
        );

        assert!(matches!(
            result.unwrap_err(),
            TypeRegistryError::DuplicateDeclaration { name, .. } if name == "foo"
        ));
    }
}

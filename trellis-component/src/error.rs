use crate::component::ErrorPtr;
use thiserror::Error;

/// Errors related to resolving component declarations from the type registry.
#[derive(Error, Clone, Eq, PartialEq, Debug)]
pub enum TypeRegistryError {
    #[error("Cannot resolve component module path: {0}")]
    ModuleResolution(String),
    #[error("Duplicate component declaration '{name}' in type group: {group}")]
    DuplicateDeclaration { group: String, name: String },
}

/// Errors related to creating, storing and invoking components.
#[derive(Error, Clone, Debug)]
pub enum ComponentError {
    #[error("Invalid configuration for component '{component}': {message}")]
    ConfigValidation { component: String, message: String },
    #[error("Component '{0}' is already registered")]
    DuplicateComponent(String),
    #[error("Unknown component name: {0}")]
    UnknownComponent(String),
    #[error("Cannot find component instance: {0}")]
    ComponentNotFound(String),
    #[error("Stored instance cannot be cast to component type: {0}")]
    NotAComponent(String),
    #[error("Component '{component}' failed during {phase}: {source}")]
    Lifecycle {
        component: String,
        phase: &'static str,
        source: ErrorPtr,
    },
    #[error("Handler '{method}' of component '{component}' failed: {source}")]
    Handler {
        component: String,
        method: String,
        source: ErrorPtr,
    },
}

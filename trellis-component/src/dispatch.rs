//! String-keyed method dispatch across components.
//!
//! Components expose business methods through [Component::dispatch](crate::component::Component::dispatch),
//! returning a [Handler] per method name. A blocking handler runs to completion during
//! dispatch; a suspending handler is returned as an unpolled future, so the blocking
//! invocation paths can decline to execute it while the asynchronous paths await it.
//! This keeps the two call shapes distinguishable at every call site: `invoke` and
//! `broadcast` never execute suspending handlers, `invoke_async` and `broadcast_async`
//! unify both shapes for callers that do not know ahead of time whether a handler
//! suspends.

use crate::component::ErrorPtr;
use crate::error::ComponentError;
use crate::future::BoxFuture;
use crate::manager::ComponentManager;
use serde_json::Value;
use tracing::trace;

/// Outcome of resolving a method name on a component.
pub enum Handler<'a> {
    /// Blocking handler which already ran to completion while being dispatched.
    Blocking(Result<Value, ErrorPtr>),
    /// Suspending handler which has not been polled yet.
    Suspending(BoxFuture<'a, Result<Value, ErrorPtr>>),
}

impl ComponentManager {
    /// Invokes `method` on the component registered under `name`, blocking path.
    ///
    /// Returns `Ok(None)` when the component does not define `method`, and also for
    /// suspending handlers, which are dropped without being executed - callers needing
    /// their result must use [invoke_async](Self::invoke_async).
    pub fn invoke(
        &self,
        name: &str,
        method: &str,
        args: &[Value],
    ) -> Result<Option<Value>, ComponentError> {
        let instance = self.instance_by_name(name)?;
        let outcome = match instance.dispatch(method, args) {
            Some(Handler::Blocking(result)) => result
                .map(Some)
                .map_err(|source| handler_error(name, method, source)),
            Some(Handler::Suspending(_)) => {
                trace!(
                    component = name,
                    method,
                    "Dropping suspending handler on the blocking invocation path"
                );
                Ok(None)
            }
            None => Ok(None),
        };
        outcome
    }

    /// Invokes `method` on the component registered under `name`, awaiting suspending
    /// handlers and running blocking ones inline. Returns `Ok(None)` only when the
    /// component does not define `method`.
    pub async fn invoke_async(
        &self,
        name: &str,
        method: &str,
        args: &[Value],
    ) -> Result<Option<Value>, ComponentError> {
        let instance = self.instance_by_name(name)?;
        let outcome = match instance.dispatch(method, args) {
            Some(Handler::Blocking(result)) => result
                .map(Some)
                .map_err(|source| handler_error(name, method, source)),
            Some(Handler::Suspending(future)) => future
                .await
                .map(Some)
                .map_err(|source| handler_error(name, method, source)),
            None => Ok(None),
        };
        outcome
    }

    /// Invokes `method` on every live component defining it as a blocking handler, in
    /// insertion order, returning (name, result) pairs. Components without the method
    /// and suspending handlers are skipped.
    pub fn broadcast(
        &self,
        method: &str,
        args: &[Value],
    ) -> Result<Vec<(String, Value)>, ComponentError> {
        let mut results = Vec::new();
        for (name, instance) in self.components() {
            if let Some(Handler::Blocking(result)) = instance.dispatch(method, args) {
                let value = result.map_err(|source| handler_error(name, method, source))?;
                results.push((name.to_string(), value));
            }
        }

        Ok(results)
    }

    /// Invokes `method` on every live component defining it, in insertion order,
    /// awaiting suspending handlers, returning (name, result) pairs.
    pub async fn broadcast_async(
        &self,
        method: &str,
        args: &[Value],
    ) -> Result<Vec<(String, Value)>, ComponentError> {
        let mut results = Vec::new();
        for (name, instance) in self.components() {
            match instance.dispatch(method, args) {
                Some(Handler::Blocking(result)) => {
                    let value = result.map_err(|source| handler_error(name, method, source))?;
                    results.push((name.to_string(), value));
                }
                Some(Handler::Suspending(future)) => {
                    let value = future
                        .await
                        .map_err(|source| handler_error(name, method, source))?;
                    results.push((name.to_string(), value));
                }
                None => {}
            }
        }

        Ok(results)
    }
}

fn handler_error(name: &str, method: &str, source: ErrorPtr) -> ComponentError {
    ComponentError::Handler {
        component: name.to_lowercase(),
        method: method.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use crate::component::{Component, ComponentContext, ConstructibleComponent, ErrorPtr};
    use crate::dispatch::Handler;
    use crate::error::ComponentError;
    use crate::future::FutureExt;
    use crate::manager::ComponentManager;
    use crate::registry::ComponentDescriptor;
    use serde::{Deserialize, Serialize};
    use serde_json::{json, Value};
    use std::io;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[derive(Default, Deserialize, Serialize)]
    struct EmptyConfig {}

    struct Echo;

    impl Component for Echo {
        fn dispatch(&self, method: &str, args: &[Value]) -> Option<Handler<'_>> {
            match method {
                "ping" => Some(Handler::Blocking(Ok(
                    args.first().cloned().unwrap_or(Value::Null)
                ))),
                "start" => Some(Handler::Blocking(Ok(json!("echo started")))),
                _ => None,
            }
        }
    }

    impl ConstructibleComponent for Echo {
        type Config = EmptyConfig;

        fn build(_config: EmptyConfig, _context: ComponentContext) -> Result<Self, ErrorPtr> {
            Ok(Echo)
        }
    }

    #[derive(Default)]
    struct Sleeper {
        executed: AtomicBool,
    }

    impl Component for Sleeper {
        fn dispatch(&self, method: &str, _args: &[Value]) -> Option<Handler<'_>> {
            match method {
                "ping" | "start" => Some(Handler::Suspending(
                    async {
                        self.executed.store(true, Ordering::SeqCst);
                        Ok(json!("sleeper done"))
                    }
                    .boxed(),
                )),
                _ => None,
            }
        }
    }

    impl ConstructibleComponent for Sleeper {
        type Config = EmptyConfig;

        fn build(_config: EmptyConfig, _context: ComponentContext) -> Result<Self, ErrorPtr> {
            Ok(Sleeper::default())
        }
    }

    struct Mute;

    impl Component for Mute {
        fn dispatch(&self, method: &str, _args: &[Value]) -> Option<Handler<'_>> {
            match method {
                // returns nothing from its start handler
                "start" => Some(Handler::Blocking(Ok(Value::Null))),
                _ => None,
            }
        }
    }

    impl ConstructibleComponent for Mute {
        type Config = EmptyConfig;

        fn build(_config: EmptyConfig, _context: ComponentContext) -> Result<Self, ErrorPtr> {
            Ok(Mute)
        }
    }

    fn flaky_error() -> ErrorPtr {
        Arc::new(io::Error::new(io::ErrorKind::Other, "handler failed"))
    }

    struct Flaky;

    impl Component for Flaky {
        fn dispatch(&self, method: &str, _args: &[Value]) -> Option<Handler<'_>> {
            match method {
                "ping" => Some(Handler::Blocking(Err(flaky_error()))),
                "sleep" => Some(Handler::Suspending(async { Err(flaky_error()) }.boxed())),
                _ => None,
            }
        }
    }

    impl ConstructibleComponent for Flaky {
        type Config = EmptyConfig;

        fn build(_config: EmptyConfig, _context: ComponentContext) -> Result<Self, ErrorPtr> {
            Ok(Flaky)
        }
    }

    fn create_manager() -> ComponentManager {
        let descriptors = vec![
            ComponentDescriptor::new::<Echo>("echo"),
            ComponentDescriptor::new::<Sleeper>("sleeper"),
            ComponentDescriptor::new::<Mute>("mute"),
        ];
        let mut manager = ComponentManager::new(descriptors, None).unwrap();
        manager.register_named("echo", Value::Null, false).unwrap();
        manager
            .register_named("sleeper", Value::Null, false)
            .unwrap();
        manager.register_named("mute", Value::Null, false).unwrap();

        manager
    }

    #[test]
    fn should_invoke_blocking_handler() {
        let manager = create_manager();
        assert_eq!(
            manager.invoke("echo", "ping", &[json!(42)]).unwrap(),
            Some(json!(42))
        );
    }

    #[test]
    fn should_return_none_for_missing_method() {
        let manager = create_manager();
        assert_eq!(manager.invoke("echo", "missing", &[]).unwrap(), None);
    }

    #[test]
    fn should_not_execute_suspending_handler_on_blocking_path() {
        let manager = create_manager();
        assert_eq!(manager.invoke("sleeper", "ping", &[]).unwrap(), None);

        let sleeper = manager.instance_typed::<Sleeper>().unwrap();
        assert!(!sleeper.executed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn should_await_suspending_handler() {
        let manager = create_manager();
        assert_eq!(
            manager.invoke_async("sleeper", "ping", &[]).await.unwrap(),
            Some(json!("sleeper done"))
        );

        let sleeper = manager.instance_typed::<Sleeper>().unwrap();
        assert!(sleeper.executed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn should_run_blocking_handler_on_async_path() {
        let manager = create_manager();
        assert_eq!(
            manager
                .invoke_async("echo", "ping", &[json!("hi")])
                .await
                .unwrap(),
            Some(json!("hi"))
        );
    }

    #[test]
    fn should_broadcast_to_blocking_handlers_only() {
        let manager = create_manager();
        let results = manager.broadcast("ping", &[json!(1)]).unwrap();
        assert_eq!(results, vec![("echo".to_string(), json!(1))]);
    }

    #[tokio::test]
    async fn should_broadcast_async_in_registration_order() {
        let manager = create_manager();
        let results = manager.broadcast_async("start", &[]).await.unwrap();
        assert_eq!(
            results,
            vec![
                ("echo".to_string(), json!("echo started")),
                ("sleeper".to_string(), json!("sleeper done")),
                ("mute".to_string(), Value::Null),
            ]
        );
    }

    fn flaky_manager() -> ComponentManager {
        let descriptors = vec![
            ComponentDescriptor::new::<Echo>("echo"),
            ComponentDescriptor::new::<Flaky>("flaky"),
        ];
        let mut manager = ComponentManager::new(descriptors, None).unwrap();
        manager.register_named("echo", Value::Null, false).unwrap();
        manager.register_named("flaky", Value::Null, false).unwrap();

        manager
    }

    #[test]
    fn should_surface_blocking_handler_failure() {
        let manager = flaky_manager();
        match manager.invoke("flaky", "ping", &[]).unwrap_err() {
            ComponentError::Handler {
                component, method, ..
            } => {
                assert_eq!(component, "flaky");
                assert_eq!(method, "ping");
            }
            error => panic!("unexpected error: {}", error),
        }
    }

    #[tokio::test]
    async fn should_surface_suspending_handler_failure() {
        let manager = flaky_manager();
        match manager.invoke_async("flaky", "sleep", &[]).await.unwrap_err() {
            ComponentError::Handler {
                component, method, ..
            } => {
                assert_eq!(component, "flaky");
                assert_eq!(method, "sleep");
            }
            error => panic!("unexpected error: {}", error),
        }
    }

    #[test]
    fn should_abort_broadcast_on_handler_failure() {
        let manager = flaky_manager();
        match manager.broadcast("ping", &[json!(1)]).unwrap_err() {
            ComponentError::Handler {
                component, method, ..
            } => {
                assert_eq!(component, "flaky");
                assert_eq!(method, "ping");
            }
            error => panic!("unexpected error: {}", error),
        }
    }

    #[test]
    fn should_fail_invoking_missing_component() {
        let manager = create_manager();
        assert!(manager.invoke("ghost", "ping", &[]).is_err());
    }
}

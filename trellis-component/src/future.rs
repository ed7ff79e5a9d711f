//! Async building blocks re-exported for component implementations.

pub use futures::future::BoxFuture;
pub use futures::FutureExt;

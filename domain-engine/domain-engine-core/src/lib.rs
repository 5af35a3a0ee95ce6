#![forbid(unsafe_code)]

use std::{any::Any, sync::Arc};

pub mod data_store;
pub mod domain_error;
pub mod transact;

mod domain_engine;

pub use domain_engine::{Builder, DomainEngine};
pub use domain_error::{DomainError, DomainResult};

/// Engine-wide settings.
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// Limit applied to root collections that don't specify `first`.
    /// `None` means root collections are unbounded.
    pub default_limit: Option<usize>,
}

/// Opaque, caller-provided session passed through to the data store.
#[derive(Clone)]
pub struct Session(pub Arc<dyn Any + Send + Sync>);

impl Default for Session {
    fn default() -> Self {
        Self(Arc::new(()))
    }
}

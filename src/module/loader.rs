//! Module loading capability.
//!
//! # Responsibilities
//! - Resolve an entry path to a [`HandlerModule`]
//! - Allow the host (or a test) to substitute its own resolution
//!
//! # Design Decisions
//! - Loading is async and injectable; the bridge never imports directly
//! - The bridge adds no cache of its own; whatever table the loader consults
//!   belongs to the host

use std::collections::HashMap;
use std::future::Future;

use async_trait::async_trait;

use crate::module::{HandlerModule, LoadError};

/// Resolves entry paths to handler modules.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    async fn load(&self, entry: &str) -> Result<HandlerModule, LoadError>;
}

/// Normalize an entry path so `./src/server.rs`, `src/server.rs` and
/// `src\server.rs` name the same module.
pub fn normalize_entry(entry: &str) -> String {
    let entry = entry.trim().replace('\\', "/");
    let mut rest = entry.as_str();
    while let Some(stripped) = rest.strip_prefix("./") {
        rest = stripped;
    }
    rest.trim_start_matches('/').to_string()
}

/// Host-owned table of modules, keyed by normalized entry path.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, HandlerModule>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `module` under `entry`, replacing any previous registration.
    pub fn register(mut self, entry: &str, module: HandlerModule) -> Self {
        self.modules.insert(normalize_entry(entry), module);
        self
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[async_trait]
impl ModuleLoader for ModuleRegistry {
    async fn load(&self, entry: &str) -> Result<HandlerModule, LoadError> {
        self.modules
            .get(&normalize_entry(entry))
            .cloned()
            .ok_or_else(|| LoadError::NotFound {
                entry: entry.to_string(),
            })
    }
}

/// Loader backed by an async closure, the override hook for custom resolution.
pub struct FnLoader<F> {
    f: F,
}

/// Wrap a closure as a [`ModuleLoader`].
pub fn loader_fn<F, Fut>(f: F) -> FnLoader<F>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HandlerModule, LoadError>> + Send + 'static,
{
    FnLoader { f }
}

#[async_trait]
impl<F, Fut> ModuleLoader for FnLoader<F>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HandlerModule, LoadError>> + Send + 'static,
{
    async fn load(&self, entry: &str) -> Result<HandlerModule, LoadError> {
        (self.f)(entry.to_string()).await
    }
}

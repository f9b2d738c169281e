//! Handler module subsystem.
//!
//! # Data Flow
//! ```text
//! entry path (from BridgeOptions)
//!     → loader.rs (ModuleLoader::load, host-provided)
//!     → handler.rs (HandlerModule::resolve: default export, else namespace)
//!     → Arc<dyn FetchHandler>
//!     → fetch(FetchRequest) → FetchResponse
//! ```
//!
//! # Design Decisions
//! - Resolution is an injected capability so tests can replace it
//! - Failures are values (`LoadError`), never panics; the bridge decides what
//!   to do with them

pub mod handler;
pub mod loader;

pub use handler::{
    fetch_fn, FetchHandler, FetchRequest, FetchResponse, FnHandler, HandlerError, HandlerModule,
    HandlerObject,
};
pub use loader::{loader_fn, normalize_entry, FnLoader, ModuleLoader, ModuleRegistry};

/// Error type for module loading.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Nothing is registered for the entry.
    #[error("entry module `{entry}` could not be resolved")]
    NotFound { entry: String },

    /// The entry exists but failed to load.
    #[error("failed to import entry module `{entry}`: {source}")]
    Import {
        entry: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The resolved module has no usable `fetch`.
    #[error("no fetch handler found in entry module `{entry}`")]
    NoHandler { entry: String },
}

impl LoadError {
    pub fn import(
        entry: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        LoadError::Import {
            entry: entry.into(),
            source: source.into(),
        }
    }
}

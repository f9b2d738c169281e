//! Fetch-style handlers and the module shape that exposes them.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;

use crate::module::LoadError;

/// A standards-shaped request handed to a handler.
pub type FetchRequest = axum::http::Request<Body>;

/// A standards-shaped response produced by a handler.
pub type FetchResponse = axum::http::Response<Body>;

/// Error raised by a handler while producing a response.
#[derive(Debug, thiserror::Error)]
#[error("handler failed: {0}")]
pub struct HandlerError(#[source] pub Box<dyn std::error::Error + Send + Sync>);

impl HandlerError {
    pub fn new(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self(err.into())
    }
}

/// The `fetch(Request) -> Response` capability.
#[async_trait]
pub trait FetchHandler: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, HandlerError>;
}

/// Adapter turning an async closure into a [`FetchHandler`].
pub struct FnHandler<F> {
    f: F,
}

/// Wrap a closure as a [`FetchHandler`].
pub fn fetch_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(FetchRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<FetchResponse, HandlerError>> + Send + 'static,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> FetchHandler for FnHandler<F>
where
    F: Fn(FetchRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<FetchResponse, HandlerError>> + Send + 'static,
{
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, HandlerError> {
        (self.f)(request).await
    }
}

/// An exported object that may carry a `fetch` capability.
#[derive(Clone, Default)]
pub struct HandlerObject {
    fetch: Option<Arc<dyn FetchHandler>>,
}

impl HandlerObject {
    pub fn new(handler: impl FetchHandler + 'static) -> Self {
        Self {
            fetch: Some(Arc::new(handler)),
        }
    }

    /// An object without a `fetch` capability.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn fetch(&self) -> Option<&Arc<dyn FetchHandler>> {
        self.fetch.as_ref()
    }
}

impl std::fmt::Debug for HandlerObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerObject")
            .field("fetch", &self.fetch.is_some())
            .finish()
    }
}

/// A loaded handler module.
///
/// The `default` export takes precedence; without one the namespace itself is
/// treated as the handler object.
#[derive(Debug, Clone, Default)]
pub struct HandlerModule {
    default_export: Option<HandlerObject>,
    namespace: HandlerObject,
}

impl HandlerModule {
    /// A module whose default export is `handler`.
    pub fn with_default(handler: impl FetchHandler + 'static) -> Self {
        Self {
            default_export: Some(HandlerObject::new(handler)),
            namespace: HandlerObject::empty(),
        }
    }

    /// A module exporting `fetch` at namespace level.
    pub fn with_namespace(handler: impl FetchHandler + 'static) -> Self {
        Self {
            default_export: None,
            namespace: HandlerObject::new(handler),
        }
    }

    pub fn from_parts(default_export: Option<HandlerObject>, namespace: HandlerObject) -> Self {
        Self {
            default_export,
            namespace,
        }
    }

    /// Pick the handler object and require a `fetch` capability on it.
    pub fn resolve(&self, entry: &str) -> Result<Arc<dyn FetchHandler>, LoadError> {
        let object = self.default_export.as_ref().unwrap_or(&self.namespace);
        object.fetch().cloned().ok_or_else(|| LoadError::NoHandler {
            entry: entry.to_string(),
        })
    }
}

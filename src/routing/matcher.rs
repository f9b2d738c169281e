//! Request classification.
//!
//! # Responsibilities
//! - Decide whether a request target is excluded, an SPA fallback, or a
//!   server route
//! - Consult the public asset directory for existing files
//!
//! # Design Decisions
//! - Exclude patterns win over everything, including server routes
//! - Exactly one classification per request
//! - Classification is synchronous; a `stat` on the public directory is the
//!   only I/O

use std::path::{Component, Path, PathBuf};

use crate::routing::pattern::{strip_query, RoutePattern};

/// Outcome of classifying a request target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Deferred to the next stage (source asset, tooling path, public file).
    Excluded,
    /// Not an application route; the entry HTML document may be served.
    SpaFallback,
    /// Forwarded to the handler module.
    ServerRoute,
}

impl std::fmt::Display for RouteClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RouteClass::Excluded => "excluded",
            RouteClass::SpaFallback => "spa_fallback",
            RouteClass::ServerRoute => "server_route",
        };
        f.write_str(name)
    }
}

/// Public asset directory served by the host.
#[derive(Debug, Clone)]
pub struct PublicDir {
    root: PathBuf,
}

impl PublicDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns true if `relative` names an existing regular file inside the
    /// directory. Parent-directory segments never resolve.
    pub fn contains_file(&self, relative: &str) -> bool {
        let relative = Path::new(relative.trim_start_matches('/'));
        if relative.as_os_str().is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return false;
        }

        std::fs::metadata(self.root.join(relative))
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }
}

/// Inputs to classification.
#[derive(Debug, Clone, Default)]
pub struct MatchOptions {
    /// Checked first, string-prefix or regex semantics.
    pub exclude: Vec<RoutePattern>,
    /// Empty means every non-excluded path except the index is a server route.
    pub server_routes: Vec<RoutePattern>,
    /// Public asset root, if the host has one.
    pub public_dir: Option<PublicDir>,
    /// Base prefix without trailing slash; empty when mounted at `/`.
    pub base: String,
}

/// Classifies request targets against [`MatchOptions`].
#[derive(Debug, Clone)]
pub struct RouteMatcher {
    options: MatchOptions,
}

impl RouteMatcher {
    pub fn new(options: MatchOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    /// Classify a request target (path, optionally with a query string).
    pub fn classify(&self, target: &str) -> RouteClass {
        let path = strip_query(target);

        if let Some(pattern) = self.options.exclude.iter().find(|p| p.covers(path)) {
            tracing::trace!(path = %path, pattern = %pattern, "Path excluded by pattern");
            return RouteClass::Excluded;
        }

        if self.is_public_file(path) {
            tracing::trace!(path = %path, "Path resolves to a public asset");
            return RouteClass::Excluded;
        }

        if !self.options.server_routes.is_empty() {
            return if self.options.server_routes.iter().any(|p| p.matches(path)) {
                RouteClass::ServerRoute
            } else {
                RouteClass::SpaFallback
            };
        }

        if self.is_index(path) {
            RouteClass::SpaFallback
        } else {
            RouteClass::ServerRoute
        }
    }

    /// True for `/`, the base prefix, and the base prefix with a trailing slash.
    pub fn is_index(&self, path: &str) -> bool {
        let base = self.options.base.as_str();
        path == "/" || path == base || path.strip_suffix('/') == Some(base)
    }

    fn is_public_file(&self, path: &str) -> bool {
        let Some(public_dir) = &self.options.public_dir else {
            return false;
        };
        // The base must end on a segment boundary: `/app` does not own `/applogo.png`.
        match path
            .strip_prefix(self.options.base.as_str())
            .filter(|rest| rest.is_empty() || rest.starts_with('/'))
        {
            Some(relative) => public_dir.contains_file(relative),
            None => false,
        }
    }
}

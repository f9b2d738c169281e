//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the bridge.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BridgeConfig {
    /// Host settings (bind address, root, base, public dir, TLS).
    pub server: ServerConfig,

    /// Dev-server bridge settings.
    pub dev: DevConfig,

    /// Build planning settings.
    pub build: BuildConfig,

    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Dev server host configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:5173").
    pub bind_address: String,

    /// Project root; `index.html` is looked up here.
    pub root: PathBuf,

    /// Public base path the app is mounted at.
    pub base: String,

    /// Public asset directory, relative to `root` unless absolute.
    pub public_dir: Option<PathBuf>,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:5173".to_string(),
            root: PathBuf::from("."),
            base: "/".to_string(),
            public_dir: Some(PathBuf::from("public")),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: PathBuf,

    /// Path to private key file (PEM).
    pub key_path: PathBuf,
}

/// A route pattern as written in the config file.
///
/// Plain strings are literals, or prefix wildcards when they end in `*`.
/// `{ regex = "..." }` is a regular expression.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PatternConfig {
    Text(String),
    Regex { regex: String },
}

impl PatternConfig {
    pub fn regex(source: &str) -> Self {
        PatternConfig::Regex {
            regex: source.to_string(),
        }
    }
}

impl From<&str> for PatternConfig {
    fn from(text: &str) -> Self {
        PatternConfig::Text(text.to_string())
    }
}

/// Bridge configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DevConfig {
    /// Entry module handed to the module loader. Also the server build input.
    pub entry: String,

    /// Paths deferred to the host. `None` uses [`default_exclude`].
    pub exclude: Option<Vec<PatternConfig>>,

    /// Paths forwarded to the handler. Empty enables legacy index matching.
    pub server_routes: Vec<PatternConfig>,

    /// Inject the live-reload client into HTML responses.
    pub inject_client_script: bool,

    /// URL the live-reload client is served from.
    pub client_script: String,

    /// URL of the live-reload event stream.
    pub events_path: String,

    /// Watch the project root and push reloads on change.
    pub watch: bool,
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            entry: "./src/server.rs".to_string(),
            exclude: None,
            server_routes: Vec::new(),
            inject_client_script: true,
            client_script: "/@bridge/client".to_string(),
            events_path: "/@bridge/events".to_string(),
            watch: true,
        }
    }
}

/// Exclusions used when the config does not list any: source files,
/// stylesheets, images, tooling paths and dependencies.
pub fn default_exclude() -> Vec<PatternConfig> {
    [
        r".*\.tsx?$",
        r".*\.ts$",
        r".*\.jsx?$",
        r".*\.css$",
        r".*\.scss$",
        r".*\.sass$",
        r".*\.less$",
        r".*\.styl$",
        r".*\.png$",
        r".*\.jpg$",
        r".*\.jpeg$",
        r".*\.gif$",
        r".*\.svg$",
        r".*\.webp$",
        r"^/@.+$",
        r"^/node_modules/.*",
    ]
    .into_iter()
    .map(PatternConfig::regex)
    .collect()
}

/// Deployment target for the server build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    Vercel,
}

/// Build planning configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Output root for both builds.
    pub out_dir: PathBuf,

    /// Server bundle file name (standard target).
    pub server_out_file: String,

    /// Client output directory, under `out_dir`.
    pub client_out_dir: String,

    /// Empty the client output directory before building.
    pub client_empty_out_dir: bool,

    /// Explicit deployment target.
    pub framework: Option<Framework>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("dist"),
            server_out_file: "server.js".to_string(),
            client_out_dir: "public".to_string(),
            client_empty_out_dir: true,
            framework: None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (e.g. "info" or "fetch_bridge=debug,tower_http=info").
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

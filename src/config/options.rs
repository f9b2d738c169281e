//! Compiled, immutable options.
//!
//! Built once from a validated [`BridgeConfig`] at startup and shared via
//! `Arc`; nothing is merged per request.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::config::loader::ConfigError;
use crate::config::schema::{default_exclude, BridgeConfig, PatternConfig, TlsConfig};
use crate::config::validation::{validate_config, ValidationError};
use crate::http::response::ClientScript;
use crate::routing::{MatchOptions, PublicDir, RoutePattern};

/// Everything the bridge and its host need at runtime.
#[derive(Debug, Clone)]
pub struct BridgeOptions {
    pub bind_address: SocketAddr,
    pub root: PathBuf,
    pub tls: Option<TlsConfig>,
    pub entry: String,
    pub match_options: MatchOptions,
    /// `None` disables injection.
    pub client_script: Option<ClientScript>,
    /// Where the live-reload client is served, whether or not it is injected.
    pub client_script_path: String,
    pub events_path: String,
    pub watch: bool,
    /// Directory ignored by the watcher (build output).
    pub out_dir: PathBuf,
}

impl BridgeOptions {
    /// Validate `config` and compile it.
    pub fn from_config(config: &BridgeConfig) -> Result<Self, ConfigError> {
        validate_config(config).map_err(ConfigError::Validation)?;

        let exclude = match &config.dev.exclude {
            Some(patterns) => compile_patterns("dev.exclude", patterns)?,
            None => compile_patterns("dev.exclude", &default_exclude())?,
        };
        let server_routes = compile_patterns("dev.server_routes", &config.dev.server_routes)?;

        let root = config.server.root.clone();
        let public_dir = config
            .server
            .public_dir
            .as_ref()
            .map(|dir| PublicDir::new(resolve(&root, dir)));

        let bind_address = config.server.bind_address.parse().map_err(|_| {
            ConfigError::Validation(vec![ValidationError {
                field: "server.bind_address".into(),
                message: "not a socket address".into(),
            }])
        })?;

        Ok(Self {
            bind_address,
            tls: config.server.tls.clone(),
            entry: config.dev.entry.clone(),
            match_options: MatchOptions {
                exclude,
                server_routes,
                public_dir,
                base: normalize_base(&config.server.base),
            },
            client_script: config
                .dev
                .inject_client_script
                .then(|| ClientScript::new(config.dev.client_script.clone())),
            client_script_path: config.dev.client_script.clone(),
            events_path: config.dev.events_path.clone(),
            watch: config.dev.watch,
            out_dir: resolve(&root, &config.build.out_dir),
            root,
        })
    }

    /// Path to the SPA entry document.
    pub fn index_html(&self) -> PathBuf {
        self.root.join("index.html")
    }

    pub fn public_dir(&self) -> Option<&Path> {
        self.match_options.public_dir.as_ref().map(PublicDir::root)
    }
}

/// `/` becomes empty, `/app/` becomes `/app`.
pub fn normalize_base(base: &str) -> String {
    base.trim_end_matches('/').to_string()
}

fn resolve(root: &Path, dir: &Path) -> PathBuf {
    if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        root.join(dir)
    }
}

fn compile_patterns(field: &str, patterns: &[PatternConfig]) -> Result<Vec<RoutePattern>, ConfigError> {
    patterns
        .iter()
        .enumerate()
        .map(|(i, pattern)| match pattern {
            PatternConfig::Text(text) => Ok(RoutePattern::parse(text)),
            PatternConfig::Regex { regex } => RoutePattern::regex(regex).map_err(|e| {
                ConfigError::Validation(vec![ValidationError {
                    field: format!("{}[{}]", field, i),
                    message: format!("invalid regex: {}", e),
                }])
            }),
        })
        .collect()
}

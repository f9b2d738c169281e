//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check addresses, paths and URL prefixes are well formed
//! - Compile-check every regex pattern
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BridgeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is compiled into BridgeOptions

use std::net::SocketAddr;

use crate::config::schema::{BridgeConfig, PatternConfig};

/// A single semantic problem in the config.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a parsed config.
pub fn validate_config(config: &BridgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("`{}` is not a socket address", config.server.bind_address),
        ));
    }

    if !config.server.base.starts_with('/') {
        errors.push(ValidationError::new("server.base", "must start with `/`"));
    }

    if let Some(tls) = &config.server.tls {
        if tls.cert_path.as_os_str().is_empty() {
            errors.push(ValidationError::new("server.tls.cert_path", "must not be empty"));
        }
        if tls.key_path.as_os_str().is_empty() {
            errors.push(ValidationError::new("server.tls.key_path", "must not be empty"));
        }
    }

    if config.dev.entry.trim().is_empty() {
        errors.push(ValidationError::new("dev.entry", "must not be empty"));
    }

    for (field, path) in [
        ("dev.client_script", &config.dev.client_script),
        ("dev.events_path", &config.dev.events_path),
    ] {
        if !path.starts_with('/') {
            errors.push(ValidationError::new(field, "must start with `/`"));
        }
    }

    if config.dev.client_script == config.dev.events_path {
        errors.push(ValidationError::new(
            "dev.events_path",
            "must differ from dev.client_script",
        ));
    }

    if let Some(exclude) = &config.dev.exclude {
        check_patterns("dev.exclude", exclude, false, &mut errors);
    }
    check_patterns("dev.server_routes", &config.dev.server_routes, true, &mut errors);

    if config.build.server_out_file.trim().is_empty() {
        errors.push(ValidationError::new("build.server_out_file", "must not be empty"));
    }

    if tracing_subscriber::EnvFilter::try_new(&config.logging.level).is_err() {
        errors.push(ValidationError::new(
            "logging.level",
            format!("`{}` is not a valid filter directive", config.logging.level),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_patterns(
    field: &str,
    patterns: &[PatternConfig],
    require_slash: bool,
    errors: &mut Vec<ValidationError>,
) {
    for (i, pattern) in patterns.iter().enumerate() {
        match pattern {
            PatternConfig::Regex { regex } => {
                if let Err(e) = regex::Regex::new(regex) {
                    errors.push(ValidationError::new(
                        format!("{}[{}]", field, i),
                        format!("invalid regex: {}", e),
                    ));
                }
            }
            PatternConfig::Text(text) if text.is_empty() => {
                errors.push(ValidationError::new(format!("{}[{}]", field, i), "must not be empty"));
            }
            PatternConfig::Text(text) if require_slash && !text.starts_with('/') => {
                errors.push(ValidationError::new(
                    format!("{}[{}]", field, i),
                    format!("`{}` must start with `/`", text),
                ));
            }
            PatternConfig::Text(_) => {}
        }
    }
}

//! Server and client build plans.
//!
//! # Responsibilities
//! - Decide which plan applies to a (command, mode) pair
//! - Resolve output locations for the standard and Vercel targets
//!
//! # Design Decisions
//! - Environment lookup is injected so detection is testable
//! - Plans are plain data, serializable for the `plan` CLI command

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::config::{BridgeConfig, Framework};

/// Mode name that selects the server build.
pub const SERVER_MODE: &str = "server";

/// Environment variable set by the Vercel build environment.
pub const VERCEL_ENV: &str = "VERCEL";

/// Host command being run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildCommand {
    Serve,
    Build,
}

/// Where the server bundle will be deployed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployTarget {
    /// Run as a standalone server.
    Standard,
    /// Vercel edge function under `api/`.
    Vercel,
}

impl fmt::Display for DeployTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployTarget::Standard => f.write_str("standard"),
            DeployTarget::Vercel => f.write_str("vercel"),
        }
    }
}

/// Module format of the server bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Esm,
}

/// Explicit `framework = "vercel"`, or `VERCEL=1` in the environment.
pub fn detect_target<F>(framework: Option<Framework>, env: F) -> DeployTarget
where
    F: Fn(&str) -> Option<String>,
{
    if framework == Some(Framework::Vercel) || env(VERCEL_ENV).as_deref() == Some("1") {
        DeployTarget::Vercel
    } else {
        DeployTarget::Standard
    }
}

/// Environment lookup against the real process environment.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Server-side rendering build of the handler entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerBuildPlan {
    pub target: DeployTarget,
    pub ssr: bool,
    pub input: String,
    pub out_dir: PathBuf,
    pub out_file: String,
    pub format: OutputFormat,
    pub copy_public_dir: bool,
    pub empty_out_dir: bool,
}

impl ServerBuildPlan {
    pub fn applies(command: BuildCommand, mode: &str) -> bool {
        command == BuildCommand::Build && mode == SERVER_MODE
    }

    pub fn new(config: &BridgeConfig, target: DeployTarget) -> Self {
        let build = &config.build;
        let (out_dir, out_file) = match target {
            DeployTarget::Vercel => (build.out_dir.join("api"), "index.js".to_string()),
            DeployTarget::Standard => (build.out_dir.clone(), build.server_out_file.clone()),
        };

        Self {
            target,
            ssr: true,
            input: config.dev.entry.clone(),
            out_dir,
            out_file,
            format: OutputFormat::Esm,
            copy_public_dir: false,
            empty_out_dir: false,
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.out_dir.join(&self.out_file)
    }
}

/// Static client build, emitted next to the server bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientBuildPlan {
    pub out_dir: PathBuf,
    pub empty_out_dir: bool,
}

impl ClientBuildPlan {
    pub fn applies(command: BuildCommand, mode: &str) -> bool {
        command == BuildCommand::Build && mode != SERVER_MODE
    }

    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            out_dir: config.build.out_dir.join(&config.build.client_out_dir),
            empty_out_dir: config.build.client_empty_out_dir,
        }
    }
}

/// The plan selected for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BuildPlan {
    Server(ServerBuildPlan),
    Client(ClientBuildPlan),
}

impl BuildPlan {
    /// Pick the plan for `command` and `mode`; `None` when serving.
    pub fn select<F>(command: BuildCommand, mode: &str, config: &BridgeConfig, env: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if ServerBuildPlan::applies(command, mode) {
            let target = detect_target(config.build.framework, env);
            Some(BuildPlan::Server(ServerBuildPlan::new(config, target)))
        } else if ClientBuildPlan::applies(command, mode) {
            Some(BuildPlan::Client(ClientBuildPlan::new(config)))
        } else {
            None
        }
    }

    pub fn out_dir(&self) -> &std::path::Path {
        match self {
            BuildPlan::Server(plan) => &plan.out_dir,
            BuildPlan::Client(plan) => &plan.out_dir,
        }
    }
}

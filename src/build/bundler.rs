//! Bundler capability and build driver.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::build::plan::{BuildCommand, BuildPlan};
use crate::build::report::log_report;
use crate::config::BridgeConfig;

/// Error type for builds.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Nothing to build for this command/mode.
    #[error("no build plan applies to `{command:?}` in mode `{mode}`")]
    NotApplicable { command: BuildCommand, mode: String },

    /// The bundler reported a failure.
    #[error("bundler failed: {0}")]
    Bundler(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl BuildError {
    pub fn bundler(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        BuildError::Bundler(err.into())
    }
}

/// What a bundler produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOutput {
    pub files: Vec<PathBuf>,
}

/// Something that turns a plan into files on disk.
#[async_trait]
pub trait Bundler: Send + Sync {
    async fn bundle(&self, plan: &BuildPlan) -> Result<BuildOutput, BuildError>;
}

/// Result of [`run_build`].
#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub plan: BuildPlan,
    pub output: BuildOutput,
    pub duration: Duration,
}

/// Select the plan, hand it to `bundler`, and log the report.
pub async fn run_build<B, F>(
    bundler: &B,
    command: BuildCommand,
    mode: &str,
    config: &BridgeConfig,
    env: F,
) -> Result<BuildSummary, BuildError>
where
    B: Bundler + ?Sized,
    F: Fn(&str) -> Option<String>,
{
    let plan = BuildPlan::select(command, mode, config, env).ok_or_else(|| BuildError::NotApplicable {
        command,
        mode: mode.to_string(),
    })?;

    tracing::info!(out_dir = ?plan.out_dir(), mode = %mode, "Build starting");
    let start = Instant::now();

    let output = match bundler.bundle(&plan).await {
        Ok(output) => output,
        Err(e) => {
            tracing::error!(error = %e, "Build failed");
            return Err(e);
        }
    };

    let summary = BuildSummary {
        plan,
        output,
        duration: start.elapsed(),
    };
    log_report(&summary);
    Ok(summary)
}

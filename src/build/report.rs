//! Post-build report: where the output went and how to run or deploy it.

use crate::build::bundler::BuildSummary;
use crate::build::plan::{BuildPlan, DeployTarget};

/// Human-readable next steps for a plan.
pub fn deployment_hints(plan: &BuildPlan) -> Vec<String> {
    match plan {
        BuildPlan::Server(server) => {
            let output = server.output_path();
            match server.target {
                DeployTarget::Vercel => vec![
                    "Configure vercel.json with {\"functions\": {\"dist/api/**\": {\"runtime\": \"edge\"}}}".to_string(),
                    "Run: vercel deploy".to_string(),
                    format!("{} is the edge function", output.display()),
                ],
                DeployTarget::Standard => vec![
                    format!("Run your app with a fetch-compatible runtime: {}", output.display()),
                    "Static files are served from the client output directory".to_string(),
                ],
            }
        }
        BuildPlan::Client(client) => vec![format!(
            "Client assets written to {}",
            client.out_dir.display()
        )],
    }
}

/// Log the outcome of a build.
pub fn log_report(summary: &BuildSummary) {
    match &summary.plan {
        BuildPlan::Server(server) => tracing::info!(
            output = %server.output_path().display(),
            target = %server.target,
            files = summary.output.files.len(),
            duration_ms = summary.duration.as_millis() as u64,
            "Server built successfully"
        ),
        BuildPlan::Client(client) => tracing::info!(
            out_dir = %client.out_dir.display(),
            files = summary.output.files.len(),
            duration_ms = summary.duration.as_millis() as u64,
            "Client built successfully"
        ),
    }

    for hint in deployment_hints(&summary.plan) {
        tracing::info!("{}", hint);
    }
}

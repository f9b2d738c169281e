//! Build planning subsystem.
//!
//! # Data Flow
//! ```text
//! (command, mode) + BridgeConfig + environment
//!     → plan.rs (BuildPlan::select: server or client)
//!     → bundler.rs (Bundler::bundle, host-provided)
//!     → report.rs (output path, run/deploy hints)
//! ```
//!
//! # Design Decisions
//! - The bundler is a capability; this crate only decides what to ask for
//! - `serve` never builds

pub mod bundler;
pub mod plan;
pub mod report;

pub use bundler::{run_build, BuildError, BuildOutput, BuildSummary, Bundler};
pub use plan::{
    detect_target, process_env, BuildCommand, BuildPlan, ClientBuildPlan, DeployTarget,
    OutputFormat, ServerBuildPlan, SERVER_MODE,
};
pub use report::deployment_hints;

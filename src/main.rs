//! fetch-bridge CLI.
//!
//! ```text
//! fetch-bridge dev   [-c bridge.toml] [--bind ADDR] [--no-watch]
//! fetch-bridge check [-c bridge.toml]
//! fetch-bridge plan  [-c bridge.toml] [--mode server|production]
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use fetch_bridge::build::{deployment_hints, process_env, BuildCommand, BuildPlan};
use fetch_bridge::config::{load_or_default, BridgeConfig, BridgeOptions};
use fetch_bridge::lifecycle::shutdown_on_signal;
use fetch_bridge::observability::init_logging;
use fetch_bridge::{DevServer, ModuleRegistry};

#[derive(Parser)]
#[command(name = "fetch-bridge")]
#[command(about = "Dev server bridge for fetch-style request handlers", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./bridge.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the dev server
    Dev {
        /// Override server.bind_address
        #[arg(long)]
        bind: Option<String>,

        /// Disable the file watcher
        #[arg(long)]
        no_watch: bool,
    },
    /// Load and validate the config, then print a summary
    Check,
    /// Print the build plan for a mode as JSON
    Plan {
        /// Build mode; `server` selects the server build
        #[arg(long, default_value = "production")]
        mode: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = load_or_default(cli.config.as_deref())?;

    init_logging(&config.logging.level)?;
    tracing::info!("fetch-bridge v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Dev { bind, no_watch } => {
            if let Some(bind) = bind {
                config.server.bind_address = bind;
            }
            if no_watch {
                config.dev.watch = false;
            }
            dev(&config).await?;
        }
        Commands::Check => check(&config)?,
        Commands::Plan { mode } => plan(&config, &mode)?,
    }

    Ok(())
}

async fn dev(config: &BridgeConfig) -> Result<(), Box<dyn std::error::Error>> {
    let options = BridgeOptions::from_config(config)?;

    // The standalone binary has no compiled-in handlers; embedders register
    // theirs on a ModuleRegistry and build the DevServer themselves.
    tracing::warn!(
        entry = %options.entry,
        "No handler modules registered, server routes will pass through"
    );
    let server = DevServer::new(options, Arc::new(ModuleRegistry::new()));

    shutdown_on_signal(server.shutdown_handle());
    server.serve().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn check(config: &BridgeConfig) -> Result<(), Box<dyn std::error::Error>> {
    let options = BridgeOptions::from_config(config)?;
    let routes: Vec<String> = options
        .match_options
        .server_routes
        .iter()
        .map(ToString::to_string)
        .collect();

    println!("Configuration OK");
    println!("  bind address:   {}", options.bind_address);
    println!("  root:           {}", options.root.display());
    println!("  entry:          {}", options.entry);
    println!("  exclude:        {} pattern(s)", options.match_options.exclude.len());
    if routes.is_empty() {
        println!("  server routes:  all except index");
    } else {
        println!("  server routes:  {}", routes.join(", "));
    }
    println!("  client script:  {}", if options.client_script.is_some() { "injected" } else { "off" });
    println!("  tls:            {}", if options.tls.is_some() { "on" } else { "off" });
    Ok(())
}

fn plan(config: &BridgeConfig, mode: &str) -> Result<(), Box<dyn std::error::Error>> {
    let plan = BuildPlan::select(BuildCommand::Build, mode, config, process_env)
        .ok_or("no build plan applies")?;

    println!("{}", serde_json::to_string_pretty(&plan)?);
    for hint in deployment_hints(&plan) {
        println!("# {}", hint);
    }
    Ok(())
}

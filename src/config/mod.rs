//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → options.rs (compile patterns, resolve paths)
//!     → BridgeOptions (validated, immutable)
//!     → shared via Arc by the bridge and the host
//! ```
//!
//! # Design Decisions
//! - Options are compiled once at startup; nothing is merged per request
//! - All fields have defaults to allow minimal (or absent) config files
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod options;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, ConfigError};
pub use options::BridgeOptions;
pub use schema::{BridgeConfig, BuildConfig, DevConfig, Framework, PatternConfig, ServerConfig, TlsConfig};
pub use validation::ValidationError;

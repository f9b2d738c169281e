//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with structured fields (request_id, class, state)
//!     → logging.rs (subscriber: env filter + fmt layer)
//!     → stdout
//! ```
//!
//! # Design Decisions
//! - Request ID flows through all bridge log lines
//! - `RUST_LOG` wins over the configured level

pub mod logging;

pub use logging::{init_logging, LoggingError};

//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! bind_address
//!     → plain TCP (tokio TcpListener, axum::serve)
//!     → or tls.rs (rustls config from PEM files, axum-server)
//!     → DevServer router
//! ```

pub mod tls;

pub use tls::{load_tls_config, TlsError};

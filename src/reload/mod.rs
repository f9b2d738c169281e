//! Live reload subsystem.
//!
//! # Data Flow
//! ```text
//! file change under root
//!     → watcher.rs (filter ignored dirs, debounce)
//!     → hub.rs (ReloadHub::notify, broadcast channel)
//!     → SSE stream per browser tab (events_path)
//!     → client script (client_script path) calls location.reload()
//! ```
//!
//! # Design Decisions
//! - One broadcast channel; slow subscribers skip lagged events
//! - Events are JSON so the client can grow new kinds without a new endpoint
//! - The watcher lives on notify's thread; sending on a broadcast channel
//!   never blocks it

pub mod hub;
pub mod watcher;

pub use hub::{client_script_handler, events_handler, render_client_script, ReloadEvent, ReloadHub};
pub use watcher::SourceWatcher;

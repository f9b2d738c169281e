//! Fetch-handler dev server bridge.
//!
//! Runs a `fetch(Request) -> Response` handler inside an interactive dev
//! server, and plans the server/client builds that ship it.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ─────────────▶ http::server ──▶ http::middleware::bridge ──┬──▶ routing (classify)
//!                    (request id,      │                         ├──▶ module (load handler)
//!                     trace, TLS)      │                         ├──▶ http::request (adapt)
//!                                      │                         └──▶ http::response (write)
//!                                      ▼
//!                    public dir / 404 (pass-through)
//!
//!     reload::watcher ──▶ reload::hub ──SSE──▶ browser (reload client)
//!     config ──▶ BridgeOptions          build ──▶ Bundler (plan, report)
//! ```

// Core subsystems
pub mod config;
pub mod http;
pub mod module;
pub mod routing;

// Host
pub mod net;
pub mod reload;

// Build
pub mod build;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::{BridgeConfig, BridgeOptions};
pub use http::{bridge_middleware, Bridge, DevServer};
pub use lifecycle::Shutdown;
pub use module::{fetch_fn, FetchHandler, FetchRequest, FetchResponse, HandlerModule, ModuleLoader, ModuleRegistry};

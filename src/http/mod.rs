//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, request ID, tracing, connection info)
//!     → middleware/bridge.rs (classify, load, invoke)
//!     → request.rs (transport request → FetchRequest)
//!     → handler
//!     → response.rs (FetchResponse → ResponseSink, HTML injection)
//!     → sink.rs (ChannelSink → axum Response)
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;
pub mod sink;

pub use middleware::{bridge_middleware, Bridge, Dispatch};
pub use request::{adapt_request, ConnectionInfo, Duplex, MakeRequestUuid, X_REQUEST_ID};
pub use response::{ClientScript, ResponseWriter, WriteOutcome};
pub use server::{DevServer, ServerError};
pub use sink::{ChannelSink, ResponseSink, SinkClosed};

//! Middleware layers.

pub mod bridge;

pub use bridge::{bridge_middleware, Bridge, BridgeState, Dispatch};

//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request target (path + query)
//!     → pattern.rs (strip query, evaluate patterns)
//!     → matcher.rs (exclude → public file → server routes / index)
//!     → Return: RouteClass
//!
//! Pattern Compilation (at startup):
//!     config strings / { regex = ".." }
//!     → RoutePattern::parse / RoutePattern::regex
//!     → Freeze in immutable MatchOptions
//! ```
//!
//! # Design Decisions
//! - Patterns compiled once, immutable at runtime
//! - Deterministic: same target always yields the same class
//! - First matching exclude pattern wins

pub mod matcher;
pub mod pattern;

pub use matcher::{MatchOptions, PublicDir, RouteClass, RouteMatcher};
pub use pattern::RoutePattern;

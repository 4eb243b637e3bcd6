//! Energy-balance simulation for local micro-systems of intermittent
//! generation, flexible demand and optional storage.

/// TOML demo configuration and presets.
pub mod config;
/// Synthetic power profiles and battery storage.
pub mod devices;
pub mod error;
/// CSV export.
pub mod io;
/// Validated scenario description and its builder.
pub mod scenario;
/// Timestamp-aligned power series.
pub mod series;
/// Orchestrator, flexibility engine and metrics.
pub mod sim;

pub use error::{Error, Result};

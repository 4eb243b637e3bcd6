//! Device models: synthetic power profiles and battery storage.

/// Residential base-load profile generator.
pub mod baseload;
/// Ideal battery storage model.
pub mod battery;
/// Flat bioenergy generation model.
pub mod bioenergy;
/// Solar photovoltaic generation model.
pub mod solar;
pub mod types;
/// Wind generation model with correlated variability.
pub mod wind;

// Re-export the main types for convenience
pub use baseload::BaseLoad;
pub use battery::{Battery, BatteryTrace};
pub use bioenergy::BioenergyPlant;
pub use solar::SolarPv;
pub use types::{Device, DeviceContext, sample};
pub use wind::WindTurbine;

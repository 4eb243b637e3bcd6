use rand::{SeedableRng, rngs::StdRng};

use crate::devices::types::{Device, DeviceContext, daylight_frac, gaussian_noise};
use crate::error::{Error, Result};

/// A solar PV generator that models power generation based on daylight hours.
///
/// `SolarPv` creates a half-sine generation profile between sunrise and sunset
/// with configurable peak power and multiplicative noise standing in for
/// passing clouds. Output is a non-negative production in watts.
#[derive(Debug, Clone)]
pub struct SolarPv {
    /// Maximum power output in watts under ideal conditions.
    pub peak_w: f64,

    /// Hour of day when generation starts (inclusive).
    pub sunrise_h: f64,

    /// Hour of day when generation stops (exclusive).
    pub sunset_h: f64,

    /// Standard deviation of the noise as a fraction of output.
    pub noise_std: f64,

    rng: StdRng,
}

impl SolarPv {
    /// Creates a new solar PV generator.
    ///
    /// # Arguments
    ///
    /// * `peak_w` - Maximum power output in watts (negative values clamp to 0)
    /// * `sunrise_h` - Hour of day when generation starts
    /// * `sunset_h` - Hour of day when generation stops
    /// * `noise_std` - Relative noise (e.g., 0.05 for +/-5% variation)
    /// * `seed` - Random seed for reproducible noise generation
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] unless `0 <= sunrise_h < sunset_h <= 24`.
    pub fn new(
        peak_w: f64,
        sunrise_h: f64,
        sunset_h: f64,
        noise_std: f64,
        seed: u64,
    ) -> Result<Self> {
        if !(0.0 <= sunrise_h && sunrise_h < sunset_h && sunset_h <= 24.0) {
            return Err(Error::config(
                "solar.sunrise_h",
                format!("expected 0 <= sunrise_h < sunset_h <= 24, got {sunrise_h}..{sunset_h}"),
            ));
        }
        Ok(Self {
            peak_w: peak_w.max(0.0),
            sunrise_h,
            sunset_h,
            noise_std: noise_std.max(0.0),
            rng: StdRng::seed_from_u64(seed),
        })
    }
}

impl Device for SolarPv {
    /// Returns 0.0 at night.
    fn power_w(&mut self, context: &DeviceContext) -> f64 {
        let frac = daylight_frac(context.hour_of_day, self.sunrise_h, self.sunset_h);
        if frac <= 0.0 {
            return 0.0;
        }

        let noise_mult = 1.0 + gaussian_noise(&mut self.rng, self.noise_std);
        (self.peak_w * frac * noise_mult).max(0.0)
    }

    fn device_type(&self) -> &'static str {
        "SolarPV"
    }
}

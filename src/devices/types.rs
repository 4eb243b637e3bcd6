//! Common types and traits for synthetic power profiles.

use chrono::{NaiveDateTime, TimeDelta, Timelike};
use rand::{Rng, rngs::StdRng};
use tracing::debug;

use crate::error::{Error, Result};
use crate::series::TimeSeries;

/// Contextual information passed to devices when sampling power.
pub struct DeviceContext {
    /// Hour of day in `[0, 24)`, including the fractional part.
    pub hour_of_day: f64,
}

impl DeviceContext {
    pub fn new(timestamp: NaiveDateTime) -> Self {
        Self {
            hour_of_day: f64::from(timestamp.num_seconds_from_midnight()) / 3600.0,
        }
    }
}

/// A device that produces or consumes electricity over time.
///
/// Values are magnitudes in watts: a load returns what it draws, a generator
/// what it produces. Devices may carry random state, so successive calls
/// must be made in time order.
pub trait Device {
    /// Returns the power in watts at the context's timestamp.
    fn power_w(&mut self, context: &DeviceContext) -> f64;

    /// Returns a human-readable type name for the device.
    fn device_type(&self) -> &'static str;
}

/// Samples `steps` values of `device` starting at `start`, `step` apart.
///
/// # Errors
///
/// Returns [`Error::Domain`] if `step` is not positive.
pub fn sample(
    device: &mut impl Device,
    start: NaiveDateTime,
    step: TimeDelta,
    steps: usize,
) -> Result<TimeSeries> {
    if step <= TimeDelta::zero() {
        return Err(Error::Domain(format!(
            "sampling step must be positive, got {step}"
        )));
    }
    let timestamps: Vec<NaiveDateTime> = std::iter::successors(Some(start), |t| Some(*t + step))
        .take(steps)
        .collect();
    let values = timestamps
        .iter()
        .map(|&t| device.power_w(&DeviceContext::new(t)))
        .collect();
    let series = TimeSeries::new(timestamps, values)?;
    debug!(
        device = device.device_type(),
        steps,
        mean_w = series.average(),
        "sampled device profile"
    );
    Ok(series)
}

/// Half-sine daylight shape: 0 outside `[sunrise_h, sunset_h)`, 1 midway.
pub fn daylight_frac(hour_of_day: f64, sunrise_h: f64, sunset_h: f64) -> f64 {
    if hour_of_day < sunrise_h || hour_of_day >= sunset_h {
        return 0.0;
    }
    let x = (hour_of_day - sunrise_h) / (sunset_h - sunrise_h);
    (std::f64::consts::PI * x).sin().max(0.0)
}

/// Gaussian noise with mean 0 via the Box-Muller transform.
pub fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }

    let u1: f64 = rng.random::<f64>().clamp(1e-12, 1.0);
    let u2: f64 = rng.random::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    z0 * std_dev
}

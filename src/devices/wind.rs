//! Wind turbine model with temporally correlated output (AR(1) process).

use rand::{SeedableRng, rngs::StdRng};

use crate::devices::types::{Device, DeviceContext, gaussian_noise};
use crate::error::{Error, Result};

/// Wind generator whose capacity factor follows a first-order autoregressive
/// process, so calm and windy spells persist over several samples.
///
/// The capacity factor evolves as:
/// ```text
/// c(t) = alpha * c(t-1) + (1 - alpha) * (mean + epsilon(t))
/// ```
/// where `epsilon` is Gaussian noise and `alpha` controls temporal
/// correlation. The factor is clamped to \[0, 1\] and starts at `mean`.
#[derive(Debug, Clone)]
pub struct WindTurbine {
    /// Rated (maximum) power in watts.
    pub rated_w: f64,

    /// Long-run average capacity factor (0.0-1.0).
    pub mean_capacity_factor: f64,

    /// AR(1) correlation coefficient (0.0 = uncorrelated, 1.0 = frozen).
    pub alpha: f64,

    /// Standard deviation of the AR(1) innovation noise.
    pub noise_std: f64,

    capacity_factor: f64,
    rng: StdRng,
}

impl WindTurbine {
    /// Creates a new wind turbine.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `mean_capacity_factor` or `alpha` lies
    /// outside `[0, 1]`.
    pub fn new(
        rated_w: f64,
        mean_capacity_factor: f64,
        alpha: f64,
        noise_std: f64,
        seed: u64,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&mean_capacity_factor) {
            return Err(Error::config(
                "wind.mean_capacity_factor",
                format!("must be in [0.0, 1.0], got {mean_capacity_factor}"),
            ));
        }
        if !(0.0..=1.0).contains(&alpha) {
            return Err(Error::config(
                "wind.alpha",
                format!("must be in [0.0, 1.0], got {alpha}"),
            ));
        }
        Ok(Self {
            rated_w: rated_w.max(0.0),
            mean_capacity_factor,
            alpha,
            noise_std: noise_std.max(0.0),
            capacity_factor: mean_capacity_factor,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    fn advance(&mut self) -> f64 {
        let epsilon = gaussian_noise(&mut self.rng, self.noise_std);
        self.capacity_factor = (self.alpha * self.capacity_factor
            + (1.0 - self.alpha) * (self.mean_capacity_factor + epsilon))
            .clamp(0.0, 1.0);
        self.capacity_factor
    }
}

impl Device for WindTurbine {
    fn power_w(&mut self, _context: &DeviceContext) -> f64 {
        self.rated_w * self.advance()
    }

    fn device_type(&self) -> &'static str {
        "WindTurbine"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::sample;
    use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid date")
    }

    #[test]
    fn test_invalid_parameters() {
        assert_eq!(
            WindTurbine::new(1000.0, 1.5, 0.9, 0.1, 1).unwrap_err().field(),
            Some("wind.mean_capacity_factor")
        );
        assert_eq!(
            WindTurbine::new(1000.0, 0.3, -0.1, 0.1, 1).unwrap_err().field(),
            Some("wind.alpha")
        );
    }

    #[test]
    fn test_noiseless_output_is_flat_at_mean() {
        let mut wt = WindTurbine::new(2000.0, 0.35, 0.9, 0.0, 1).unwrap();
        let series = sample(&mut wt, t0(), TimeDelta::hours(1), 24).unwrap();
        assert!(series.values().iter().all(|&v| (v - 700.0).abs() < 1e-9));
    }

    #[test]
    fn test_output_within_rating() {
        let mut wt = WindTurbine::new(2000.0, 0.5, 0.8, 2.0, 9).unwrap();
        let series = sample(&mut wt, t0(), TimeDelta::hours(1), 500).unwrap();
        assert!(series.values().iter().all(|&v| (0.0..=2000.0).contains(&v)));
    }

    #[test]
    fn test_high_alpha_is_smoother() {
        let roughness = |alpha: f64| {
            let mut wt = WindTurbine::new(1000.0, 0.4, alpha, 0.5, 3).unwrap();
            let s = sample(&mut wt, t0(), TimeDelta::hours(1), 400).unwrap();
            s.values()
                .windows(2)
                .map(|w| (w[1] - w[0]).abs())
                .sum::<f64>()
        };
        assert!(roughness(0.95) < roughness(0.1));
    }

    #[test]
    fn test_deterministic_with_same_seed() {
        let mut a = WindTurbine::new(1000.0, 0.4, 0.9, 0.3, 42).unwrap();
        let mut b = WindTurbine::new(1000.0, 0.4, 0.9, 0.3, 42).unwrap();
        assert_eq!(
            sample(&mut a, t0(), TimeDelta::hours(1), 48).unwrap(),
            sample(&mut b, t0(), TimeDelta::hours(1), 48).unwrap()
        );
    }
}

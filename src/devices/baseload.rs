use rand::{SeedableRng, rngs::StdRng};

use crate::devices::types::{Device, DeviceContext, gaussian_noise};

/// A baseload generator that models daily electricity consumption patterns.
///
/// `BaseLoad` creates a sinusoidal power demand pattern with configurable baseline,
/// amplitude, phase, and random noise to simulate a household's daily demand.
///
/// # Examples
///
/// ```
/// use balance_sim::devices::{BaseLoad, sample};
/// use chrono::{NaiveDate, TimeDelta};
///
/// let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
/// let mut load = BaseLoad::new(
///     1000.0, // base_w - average consumption
///     500.0,  // amp_w - daily variation
///     0.0,    // phase_rad - no phase shift
///     50.0,   // noise_std_w - small random variation
///     42,     // seed - for reproducible randomness
/// );
/// let day = sample(&mut load, start, TimeDelta::hours(1), 24).unwrap();
/// assert_eq!(day.len(), 24);
/// ```
#[derive(Debug, Clone)]
pub struct BaseLoad {
    /// Baseline power consumption in watts
    pub base_w: f64,

    /// Amplitude of the sinusoidal variation in watts
    pub amp_w: f64,

    /// Phase offset of the sinusoidal pattern in radians
    pub phase_rad: f64,

    /// Standard deviation of the Gaussian noise in watts
    pub noise_std_w: f64,

    rng: StdRng,
}

impl BaseLoad {
    /// Creates a new baseload generator.
    ///
    /// # Arguments
    ///
    /// * `base_w` - The baseline power consumption in watts
    /// * `amp_w` - The amplitude of sinusoidal daily variation in watts
    /// * `phase_rad` - The phase offset in radians
    /// * `noise_std_w` - The standard deviation of Gaussian noise in watts
    /// * `seed` - Random seed for reproducible noise generation
    pub fn new(base_w: f64, amp_w: f64, phase_rad: f64, noise_std_w: f64, seed: u64) -> Self {
        Self {
            base_w,
            amp_w,
            phase_rad,
            noise_std_w: noise_std_w.max(0.0),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Device for BaseLoad {
    /// Baseline plus a one-day sinusoid plus noise, never negative.
    fn power_w(&mut self, context: &DeviceContext) -> f64 {
        let day_pos = context.hour_of_day / 24.0;
        let angle = 2.0 * std::f64::consts::PI * day_pos + self.phase_rad;
        let noise = gaussian_noise(&mut self.rng, self.noise_std_w);
        (self.base_w + self.amp_w * angle.sin() + noise).max(0.0)
    }

    fn device_type(&self) -> &'static str {
        "BaseLoad"
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

    fn ctx(hour: i64) -> DeviceContext {
        DeviceContext::new(t0() + TimeDelta::hours(hour))
    }

    #[test]
    fn test_noiseless_shape() {
        let mut load = BaseLoad::new(1000.0, 500.0, 0.0, 0.0, 42);
        assert!((load.power_w(&ctx(0)) - 1000.0).abs() < 1e-9);
        assert!((load.power_w(&ctx(6)) - 1500.0).abs() < 1e-9);
        assert!((load.power_w(&ctx(18)) - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_never_negative() {
        let mut load = BaseLoad::new(100.0, 500.0, 0.0, 200.0, 7);
        let series = sample(&mut load, t0(), TimeDelta::hours(1), 72).unwrap();
        assert!(series.values().iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_deterministic_with_same_seed() {
        let mut a = BaseLoad::new(800.0, 300.0, 1.2, 50.0, 42);
        let mut b = BaseLoad::new(800.0, 300.0, 1.2, 50.0, 42);
        let sa = sample(&mut a, t0(), TimeDelta::hours(1), 48).unwrap();
        let sb = sample(&mut b, t0(), TimeDelta::hours(1), 48).unwrap();
        assert_eq!(sa, sb);
    }

    #[test]
    fn test_different_seeds_differ() {
        let mut a = BaseLoad::new(800.0, 300.0, 1.2, 50.0, 42);
        let mut b = BaseLoad::new(800.0, 300.0, 1.2, 50.0, 43);
        let sa = sample(&mut a, t0(), TimeDelta::hours(1), 24).unwrap();
        let sb = sample(&mut b, t0(), TimeDelta::hours(1), 24).unwrap();
        assert_ne!(sa, sb);
    }
}

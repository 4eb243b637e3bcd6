use rand::{SeedableRng, rngs::StdRng};

use crate::devices::types::{Device, DeviceContext, gaussian_noise};

/// A dispatchable bioenergy plant running at a flat setpoint with small
/// random deviations.
#[derive(Debug, Clone)]
pub struct BioenergyPlant {
    /// Nominal output in watts.
    pub nominal_w: f64,

    /// Standard deviation of the Gaussian deviation in watts.
    pub noise_std_w: f64,

    rng: StdRng,
}

impl BioenergyPlant {
    pub fn new(nominal_w: f64, noise_std_w: f64, seed: u64) -> Self {
        Self {
            nominal_w: nominal_w.max(0.0),
            noise_std_w: noise_std_w.max(0.0),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Device for BioenergyPlant {
    fn power_w(&mut self, _context: &DeviceContext) -> f64 {
        (self.nominal_w + gaussian_noise(&mut self.rng, self.noise_std_w)).max(0.0)
    }

    fn device_type(&self) -> &'static str {
        "Bioenergy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::sample;
    use chrono::{NaiveDate, TimeDelta};

    #[test]
    fn test_flat_without_noise() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid date");
        let mut plant = BioenergyPlant::new(300.0, 0.0, 5);
        let series = sample(&mut plant, start, TimeDelta::hours(1), 10).unwrap();
        assert!(series.values().iter().all(|&v| v == 300.0));
        assert_eq!(series.average(), 300.0);
    }
}

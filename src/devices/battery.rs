use chrono::NaiveDateTime;

use crate::error::{Error, Result};
use crate::series::TimeSeries;

/// An ideal energy store that absorbs surplus production and releases it
/// when consumption exceeds production.
///
/// The battery holds no per-run state: [`Battery::dispatch`] folds the surplus
/// series with a single stored-energy accumulator, starting empty, so one
/// `Battery` can be shared across any number of independent runs.
///
/// Each sample is treated as one hour of power, so a value in W moves the
/// same number of Wh.
///
/// # Power Convention
/// - Positive power: charging (energy taken from the surplus)
/// - Negative power: discharging (energy returned to cover a deficit)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Battery {
    /// Usable capacity in watt-hours.
    capacity_wh: f64,
}

impl Battery {
    /// Creates a battery with the given usable capacity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the capacity is negative or not finite.
    pub fn new(capacity_wh: f64) -> Result<Self> {
        if !capacity_wh.is_finite() || capacity_wh < 0.0 {
            return Err(Error::config(
                "battery.capacity",
                format!("must be a finite value >= 0, got {capacity_wh}"),
            ));
        }
        Ok(Self { capacity_wh })
    }

    pub fn capacity_wh(&self) -> f64 {
        self.capacity_wh
    }

    /// Energy actually moved for one step given the stored energy and the
    /// surplus (positive) or deficit (negative).
    fn step_power(&self, stored_wh: f64, surplus: f64) -> f64 {
        if surplus > 0.0 {
            surplus.min(self.capacity_wh - stored_wh)
        } else if surplus < 0.0 {
            -(-surplus).min(stored_wh)
        } else {
            0.0
        }
    }

    /// Runs the battery over a production-minus-consumption surplus series.
    ///
    /// Whatever the battery cannot absorb or supply passes through into
    /// [`BatteryTrace::residual`]. A zero-capacity battery passes everything
    /// through.
    pub fn dispatch(&self, surplus: &TimeSeries) -> BatteryTrace {
        let (soc, power): (Vec<f64>, Vec<f64>) = surplus
            .values()
            .iter()
            .scan(0.0_f64, |stored_wh, &s| {
                let p = self.step_power(*stored_wh, s);
                *stored_wh = (*stored_wh + p).clamp(0.0, self.capacity_wh);
                Some((*stored_wh, p))
            })
            .unzip();

        let state_of_charge = surplus.with_values(soc);
        let power = surplus.with_values(power);
        let residual = surplus.with_values(
            surplus
                .values()
                .iter()
                .zip(power.values())
                .map(|(s, p)| s - p)
                .collect(),
        );

        BatteryTrace {
            capacity_wh: self.capacity_wh,
            state_of_charge,
            power,
            residual,
        }
    }
}

/// Outputs of one [`Battery::dispatch`] run, aligned to the input surplus.
#[derive(Debug, Clone, PartialEq)]
pub struct BatteryTrace {
    /// Capacity of the battery that produced this trace (Wh).
    pub capacity_wh: f64,
    /// Stored energy after each step (Wh).
    pub state_of_charge: TimeSeries,
    /// Battery power per step (W; positive = charge, negative = discharge).
    pub power: TimeSeries,
    /// Surplus left after the battery acted (W; negative = unmet deficit).
    pub residual: TimeSeries,
}

impl BatteryTrace {
    /// Restricts every curve of the trace to `[begin, end)`.
    pub fn slice_window(&self, begin: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Self {
        Self {
            capacity_wh: self.capacity_wh,
            state_of_charge: self.state_of_charge.slice_window(begin, end),
            power: self.power.slice_window(begin, end),
            residual: self.residual.slice_window(begin, end),
        }
    }

    /// Applies [`TimeSeries::rolling_average`] to every curve of the trace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Domain`] if `width` is zero.
    pub fn rolling_average(&self, width: usize) -> Result<Self> {
        Ok(Self {
            capacity_wh: self.capacity_wh,
            state_of_charge: self.state_of_charge.rolling_average(width)?,
            power: self.power.rolling_average(width)?,
            residual: self.residual.rolling_average(width)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn surplus(values: Vec<f64>) -> TimeSeries {
        let t0 = NaiveDate::from_ymd_opt(2024, 6, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid date");
        TimeSeries::hourly(t0, values)
    }

    #[test]
    fn test_invalid_capacity() {
        assert!(Battery::new(-1.0).is_err());
        assert!(Battery::new(f64::NAN).is_err());
        assert!(Battery::new(0.0).is_ok());
    }

    #[test]
    fn test_charge_then_discharge_sequence() {
        let battery = Battery::new(5.0).unwrap();
        let trace = battery.dispatch(&surplus(vec![3.0, 3.0, -4.0, -4.0]));
        assert_eq!(trace.state_of_charge.values(), &[3.0, 5.0, 1.0, 0.0]);
        assert_eq!(trace.power.values(), &[3.0, 2.0, -4.0, -1.0]);
        assert_eq!(trace.residual.values(), &[0.0, 1.0, 0.0, -3.0]);
    }

    #[test]
    fn test_zero_capacity_passes_through() {
        let battery = Battery::new(0.0).unwrap();
        let input = surplus(vec![2.0, -1.0, 0.0]);
        let trace = battery.dispatch(&input);
        assert!(trace.power.values().iter().all(|&p| p == 0.0));
        assert_eq!(trace.residual, input);
    }

    #[test]
    fn test_dispatch_is_reentrant() {
        let battery = Battery::new(4.0).unwrap();
        let input = surplus(vec![5.0, -2.0, 1.0, -6.0]);
        assert_eq!(battery.dispatch(&input), battery.dispatch(&input));
    }

    #[test]
    fn test_trace_keeps_input_timestamps() {
        let input = surplus(vec![1.0, -1.0]);
        let trace = Battery::new(1.0).unwrap().dispatch(&input);
        assert_eq!(trace.power.timestamps(), input.timestamps());
        assert_eq!(trace.state_of_charge.timestamps(), input.timestamps());
    }

    proptest! {
        #[test]
        fn soc_stays_within_bounds(
            capacity in 0.0f64..50.0,
            values in proptest::collection::vec(-20.0f64..20.0, 0..64),
        ) {
            let trace = Battery::new(capacity).unwrap().dispatch(&surplus(values));
            for &soc in trace.state_of_charge.values() {
                prop_assert!((0.0..=capacity).contains(&soc));
            }
        }

        #[test]
        fn power_plus_residual_equals_surplus(
            capacity in 0.0f64..50.0,
            values in proptest::collection::vec(-20.0f64..20.0, 0..64),
        ) {
            let input = surplus(values);
            let trace = Battery::new(capacity).unwrap().dispatch(&input);
            let rebuilt = trace.power.try_add(&trace.residual).unwrap();
            for (a, b) in rebuilt.values().iter().zip(input.values()) {
                prop_assert!((a - b).abs() < 1e-9);
            }
            // stored energy equals the integral of battery power
            let stored = trace.state_of_charge.values().last().copied().unwrap_or(0.0);
            prop_assert!((stored - trace.power.sum()).abs() < 1e-9);
        }
    }
}

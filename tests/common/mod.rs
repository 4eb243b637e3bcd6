//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use balance_sim::devices::{BaseLoad, SolarPv, WindTurbine, sample};
use balance_sim::scenario::ScenarioBuilder;
use balance_sim::series::TimeSeries;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

/// Midnight on 2024-06-01.
pub fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("valid date")
}

/// Hourly series starting at [`start`].
pub fn hourly(values: &[f64]) -> TimeSeries {
    TimeSeries::hourly(start(), values.to_vec())
}

/// `days` of hourly household demand (800 W base, 400 W swing).
pub fn household(days: usize, seed: u64) -> TimeSeries {
    let mut load = BaseLoad::new(800.0, 400.0, 1.2, 50.0, seed);
    sample(&mut load, start(), TimeDelta::hours(1), days * 24).expect("hourly sampling")
}

/// `days` of hourly PV output (3 kW peak, 6h-20h).
pub fn solar(days: usize, seed: u64) -> TimeSeries {
    let mut pv = SolarPv::new(3000.0, 6.0, 20.0, 0.05, seed).expect("valid solar window");
    sample(&mut pv, start(), TimeDelta::hours(1), days * 24).expect("hourly sampling")
}

/// `days` of hourly wind output (3 kW rated, AR(1)).
pub fn wind(days: usize, seed: u64) -> TimeSeries {
    let mut wt = WindTurbine::new(3000.0, 0.3, 0.9, 0.4, seed).expect("valid wind parameters");
    sample(&mut wt, start(), TimeDelta::hours(1), days * 24).expect("hourly sampling")
}

/// Three households with solar and wind, ready for storage and
/// flexibility switches.
pub fn mixed_builder(days: usize) -> ScenarioBuilder {
    ScenarioBuilder::new()
        .consumers((0..3).map(|i| household(days, 100 + i)))
        .consumer_contrib(vec![1.0, 1.0, 1.0])
        .has_solar(true)
        .solar_curve(solar(days, 1))
        .solar_power(1200.0)
        .has_wind(true)
        .wind_curve(wind(days, 2))
        .wind_power(900.0)
}

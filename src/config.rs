//! TOML-based demo configuration and preset definitions.
//!
//! A [`DemoConfig`] describes synthetic curves (households, solar, wind,
//! bioenergy) plus the storage and flexibility switches, and turns into a
//! validated [`ScenarioConfig`] through [`DemoConfig::to_scenario`].

use std::fs;
use std::path::Path;

use chrono::{NaiveDateTime, TimeDelta};
use serde::Deserialize;

use crate::devices::{BaseLoad, BioenergyPlant, SolarPv, WindTurbine, sample};
use crate::error::{Error, Result};
use crate::scenario::ScenarioConfig;
use crate::sim::FlexibilityWindow;

/// Top-level demo configuration parsed from TOML.
///
/// All fields have defaults matching the baseline preset. Load from
/// TOML with [`DemoConfig::from_toml_file`] or use
/// [`DemoConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DemoConfig {
    /// Simulated period and master seed.
    pub simulation: SimulationConfig,
    /// Household consumption parameters.
    pub consumer: ConsumerConfig,
    /// Solar PV parameters.
    pub solar: SolarConfig,
    /// Wind turbine parameters.
    pub wind: WindConfig,
    /// Bioenergy plant parameters.
    pub bioenergy: BioenergyConfig,
    /// Battery storage parameters.
    pub battery: BatteryConfig,
    /// Demand flexibility parameters.
    pub flexibility: FlexibilityConfig,
}

/// Simulated period and master seed.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// First timestamp, ISO 8601 without offset (`2024-06-01T00:00:00`).
    pub start: String,
    /// Number of days to simulate (must be > 0).
    pub days: usize,
    /// Sampling step in minutes (must divide a day).
    pub step_minutes: u32,
    /// Master random seed.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start: "2024-06-01T00:00:00".to_string(),
            days: 7,
            step_minutes: 60,
            seed: 42,
        }
    }
}

/// Household consumption parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsumerConfig {
    /// Number of households (must be > 0).
    pub households: usize,
    /// Baseline consumption per household (W).
    pub base_w: f64,
    /// Sinusoidal amplitude (W).
    pub amp_w: f64,
    /// Phase offset (radians).
    pub phase_rad: f64,
    /// Gaussian noise standard deviation (W).
    pub noise_std_w: f64,
    /// Scale each household curve to `power_w` on average.
    pub scaling: bool,
    /// Target average power per household when scaling (W).
    pub power_w: f64,
    /// Fraction of daily energy that may be shifted (0.0-1.0).
    pub flex_ratio: f64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            households: 4,
            base_w: 800.0,
            amp_w: 400.0,
            phase_rad: 1.2,
            noise_std_w: 50.0,
            scaling: false,
            power_w: 0.0,
            flex_ratio: 0.0,
        }
    }
}

/// Solar PV parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolarConfig {
    pub enabled: bool,
    /// Peak generation (W).
    pub peak_w: f64,
    /// Hour of day generation starts.
    pub sunrise_h: f64,
    /// Hour of day generation stops.
    pub sunset_h: f64,
    /// Relative noise standard deviation.
    pub noise_std: f64,
    /// Scale the curve to `power_w` on average.
    pub scaling: bool,
    /// Target average power when scaling (W).
    pub power_w: f64,
}

impl Default for SolarConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            peak_w: 3000.0,
            sunrise_h: 6.0,
            sunset_h: 20.0,
            noise_std: 0.05,
            scaling: false,
            power_w: 0.0,
        }
    }
}

/// Wind turbine parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindConfig {
    pub enabled: bool,
    /// Rated power (W).
    pub rated_w: f64,
    /// Long-run average capacity factor (0.0-1.0).
    pub mean_capacity_factor: f64,
    /// AR(1) correlation coefficient (0.0-1.0).
    pub alpha: f64,
    /// AR(1) innovation noise standard deviation.
    pub noise_std: f64,
    /// Scale the curve to `power_w` on average.
    pub scaling: bool,
    /// Target average power when scaling (W).
    pub power_w: f64,
}

impl Default for WindConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            rated_w: 3000.0,
            mean_capacity_factor: 0.3,
            alpha: 0.9,
            noise_std: 0.4,
            scaling: false,
            power_w: 0.0,
        }
    }
}

/// Bioenergy plant parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BioenergyConfig {
    pub enabled: bool,
    /// Nominal output (W).
    pub nominal_w: f64,
    /// Gaussian noise standard deviation (W).
    pub noise_std_w: f64,
    /// Scale the curve to `power_w` on average.
    pub scaling: bool,
    /// Target average power when scaling (W).
    pub power_w: f64,
}

impl Default for BioenergyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            nominal_w: 300.0,
            noise_std_w: 10.0,
            scaling: false,
            power_w: 0.0,
        }
    }
}

/// Battery storage parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatteryConfig {
    pub enabled: bool,
    /// Usable capacity (Wh).
    pub capacity_wh: f64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            capacity_wh: 5000.0,
        }
    }
}

/// Demand flexibility parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FlexibilityConfig {
    pub enabled: bool,
    /// Window kind: `"calendar_day"` or `"fixed"`.
    pub window: String,
    /// Window length for the `"fixed"` kind (hours, must be > 0).
    pub window_hours: u32,
}

impl Default for FlexibilityConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            window: "calendar_day".to_string(),
            window_hours: 24,
        }
    }
}

impl DemoConfig {
    /// Returns the baseline scenario: four households and a rooftop PV array.
    pub fn baseline() -> Self {
        Self::default()
    }

    /// Returns the solar-battery preset: larger PV array backed by storage.
    pub fn solar_battery() -> Self {
        Self {
            solar: SolarConfig {
                peak_w: 6000.0,
                noise_std: 0.1,
                ..SolarConfig::default()
            },
            battery: BatteryConfig {
                enabled: true,
                capacity_wh: 10_000.0,
            },
            ..Self::default()
        }
    }

    /// Returns the flexible-wind preset: wind and bioenergy with shiftable demand.
    pub fn flexible_wind() -> Self {
        Self {
            consumer: ConsumerConfig {
                flex_ratio: 0.2,
                ..ConsumerConfig::default()
            },
            solar: SolarConfig {
                enabled: false,
                ..SolarConfig::default()
            },
            wind: WindConfig {
                enabled: true,
                scaling: true,
                power_w: 2500.0,
                ..WindConfig::default()
            },
            bioenergy: BioenergyConfig {
                enabled: true,
                ..BioenergyConfig::default()
            },
            flexibility: FlexibilityConfig {
                enabled: true,
                ..FlexibilityConfig::default()
            },
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "solar_battery", "flexible_wind"];

    /// Loads a configuration from a named preset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "solar_battery" => Ok(Self::solar_battery()),
            "flexible_wind" => Ok(Self::flexible_wind()),
            _ => Err(Error::config(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::config("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| Error::config("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<Error> {
        let mut errors = Vec::new();
        let s = &self.simulation;

        if let Err(e) = s.start.parse::<NaiveDateTime>() {
            errors.push(Error::config(
                "simulation.start",
                format!("expected YYYY-MM-DDTHH:MM:SS, got \"{}\": {e}", s.start),
            ));
        }
        if s.days == 0 {
            errors.push(Error::config("simulation.days", "must be > 0"));
        }
        if s.step_minutes == 0 || (24 * 60) % s.step_minutes != 0 {
            errors.push(Error::config(
                "simulation.step_minutes",
                format!("must be > 0 and divide 1440, got {}", s.step_minutes),
            ));
        }

        let c = &self.consumer;
        if c.households == 0 {
            errors.push(Error::config("consumer.households", "must be > 0"));
        }
        if !(0.0..=1.0).contains(&c.flex_ratio) {
            errors.push(Error::config(
                "consumer.flex_ratio",
                "must be in [0.0, 1.0]",
            ));
        }

        let sol = &self.solar;
        if sol.enabled && !(0.0 <= sol.sunrise_h && sol.sunrise_h < sol.sunset_h && sol.sunset_h <= 24.0)
        {
            errors.push(Error::config(
                "solar.sunrise_h",
                "must satisfy 0 <= sunrise_h < sunset_h <= 24",
            ));
        }

        let w = &self.wind;
        if w.enabled && !(0.0..=1.0).contains(&w.mean_capacity_factor) {
            errors.push(Error::config(
                "wind.mean_capacity_factor",
                "must be in [0.0, 1.0]",
            ));
        }
        if w.enabled && !(0.0..=1.0).contains(&w.alpha) {
            errors.push(Error::config("wind.alpha", "must be in [0.0, 1.0]"));
        }

        let bat = &self.battery;
        if bat.enabled && bat.capacity_wh < 0.0 {
            errors.push(Error::config("battery.capacity_wh", "must be >= 0"));
        }

        let flex = &self.flexibility;
        if flex.window != "calendar_day" && flex.window != "fixed" {
            errors.push(Error::config(
                "flexibility.window",
                format!(
                    "must be \"calendar_day\" or \"fixed\", got \"{}\"",
                    flex.window
                ),
            ));
        }
        if flex.window == "fixed" && flex.window_hours == 0 {
            errors.push(Error::config("flexibility.window_hours", "must be > 0"));
        }

        errors
    }

    /// Samples the synthetic curves and builds a validated scenario.
    ///
    /// Each device draws from its own generator seeded from
    /// `simulation.seed`, so the same configuration always yields the same
    /// curves.
    ///
    /// # Errors
    ///
    /// Returns the first [`DemoConfig::validate`] error, or any error raised
    /// while building the scenario.
    pub fn to_scenario(&self) -> Result<ScenarioConfig> {
        if let Some(e) = self.validate().into_iter().next() {
            return Err(e);
        }
        let sim = &self.simulation;
        let start: NaiveDateTime = sim
            .start
            .parse()
            .map_err(|e| Error::config("simulation.start", format!("{e}")))?;
        let step = TimeDelta::minutes(i64::from(sim.step_minutes));
        let steps = sim.days * (24 * 60 / sim.step_minutes as usize);
        let seed = sim.seed;

        let c = &self.consumer;
        let households = (0..c.households as u64)
            .map(|i| {
                let mut load = BaseLoad::new(
                    c.base_w,
                    c.amp_w,
                    c.phase_rad,
                    c.noise_std_w,
                    seed.wrapping_add(100 + i),
                );
                sample(&mut load, start, step, steps)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut builder = ScenarioConfig::builder()
            .consumers(households)
            .consumer_scaling(c.scaling)
            .consumer_power(c.power_w)
            .flex_ratio(c.flex_ratio);

        if self.solar.enabled {
            let s = &self.solar;
            let mut pv = SolarPv::new(s.peak_w, s.sunrise_h, s.sunset_h, s.noise_std, seed)?;
            builder = builder
                .has_solar(true)
                .solar_curve(sample(&mut pv, start, step, steps)?)
                .solar_scaling(s.scaling)
                .solar_power(s.power_w);
        }
        if self.wind.enabled {
            let w = &self.wind;
            let mut turbine = WindTurbine::new(
                w.rated_w,
                w.mean_capacity_factor,
                w.alpha,
                w.noise_std,
                seed.wrapping_add(1),
            )?;
            builder = builder
                .has_wind(true)
                .wind_curve(sample(&mut turbine, start, step, steps)?)
                .wind_scaling(w.scaling)
                .wind_power(w.power_w);
        }
        if self.bioenergy.enabled {
            let b = &self.bioenergy;
            let mut plant = BioenergyPlant::new(b.nominal_w, b.noise_std_w, seed.wrapping_add(2));
            builder = builder
                .has_bioenergy(true)
                .bioenergy_curve(sample(&mut plant, start, step, steps)?)
                .bioenergy_scaling(b.scaling)
                .bioenergy_power(b.power_w);
        }

        let window = match self.flexibility.window.as_str() {
            "fixed" => FlexibilityWindow::Fixed(TimeDelta::hours(i64::from(
                self.flexibility.window_hours,
            ))),
            _ => FlexibilityWindow::CalendarDay,
        };

        builder
            .has_battery(self.battery.enabled)
            .battery_capacity(self.battery.capacity_wh)
            .has_flexibility(self.flexibility.enabled)
            .flexibility_window(window)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_preset_valid() {
        let cfg = DemoConfig::baseline();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "baseline should be valid: {errors:?}");
    }

    #[test]
    fn from_preset_unknown() {
        let err = DemoConfig::from_preset("nonexistent").unwrap_err();
        assert_eq!(err.field(), Some("preset"));
        assert!(err.to_string().contains("unknown preset"));
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[simulation]
start = "2024-03-01T00:00:00"
days = 2
step_minutes = 30
seed = 99

[consumer]
households = 2
base_w = 1000.0
amp_w = 500.0
phase_rad = 0.0
noise_std_w = 20.0
flex_ratio = 0.3

[solar]
enabled = false

[wind]
enabled = true
rated_w = 4000.0
mean_capacity_factor = 0.35
alpha = 0.85
noise_std = 0.3

[battery]
enabled = true
capacity_wh = 8000.0

[flexibility]
enabled = true
window = "fixed"
window_hours = 12
"#;
        let cfg = DemoConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.simulation.days, 2);
        assert_eq!(cfg.simulation.step_minutes, 30);
        assert!(cfg.wind.enabled);
        assert!(!cfg.solar.enabled);
        assert_eq!(cfg.flexibility.window, "fixed");
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[simulation]
days = 2
bogus_field = true
"#;
        let err = DemoConfig::from_toml_str(toml).unwrap_err();
        assert_eq!(err.field(), Some("toml"));
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let cfg = DemoConfig::from_toml_str("[simulation]\nseed = 7\n").unwrap();
        assert_eq!(cfg.simulation.seed, 7);
        assert_eq!(cfg.simulation.days, 7);
        assert_eq!(cfg.solar.peak_w, 3000.0);
    }

    #[test]
    fn validation_catches_bad_fields() {
        let mut cfg = DemoConfig::baseline();
        cfg.simulation.start = "yesterday".to_string();
        cfg.simulation.step_minutes = 7;
        cfg.consumer.households = 0;
        cfg.flexibility.window = "weekly".to_string();
        let fields: Vec<_> = cfg
            .validate()
            .iter()
            .filter_map(|e| e.field().map(str::to_string))
            .collect();
        for expected in [
            "simulation.start",
            "simulation.step_minutes",
            "consumer.households",
            "flexibility.window",
        ] {
            assert!(fields.iter().any(|f| f == expected), "missing {expected}");
        }
    }

    #[test]
    fn all_presets_are_valid_and_build() {
        for name in DemoConfig::PRESETS {
            let cfg = DemoConfig::from_preset(name).unwrap();
            let errors = cfg.validate();
            assert!(errors.is_empty(), "preset \"{name}\" should be valid: {errors:?}");
            let scenario = cfg.to_scenario().unwrap();
            assert_eq!(scenario.timestamps().len(), 7 * 24);
        }
    }

    #[test]
    fn to_scenario_reflects_switches() {
        let scenario = DemoConfig::flexible_wind().to_scenario().unwrap();
        assert!(scenario.solar().is_none());
        assert!(scenario.wind().is_some());
        assert!(scenario.bioenergy().is_some());
        assert!(scenario.battery().is_none());
        assert_eq!(scenario.flexibility(), Some(FlexibilityWindow::CalendarDay));
        assert_eq!(scenario.consumers().len(), 4);

        let wind = scenario.wind().unwrap().output().unwrap();
        assert!((wind.average() - 2500.0).abs() < 1e-6);
    }

    #[test]
    fn to_scenario_is_deterministic() {
        let cfg = DemoConfig::solar_battery();
        assert_eq!(cfg.to_scenario().unwrap(), cfg.to_scenario().unwrap());
    }

    #[test]
    fn invalid_config_does_not_build() {
        let mut cfg = DemoConfig::baseline();
        cfg.simulation.days = 0;
        assert_eq!(
            cfg.to_scenario().unwrap_err().field(),
            Some("simulation.days")
        );
    }
}

//! Validated scenario description consumed by [`crate::sim::simulate`].
//!
//! A [`ScenarioConfig`] can only be obtained through [`ScenarioBuilder::build`],
//! which normalizes per-consumer parameters, checks that every enabled
//! capability has its curve, and slices all active curves to one common
//! timestamp support. A built config is simulate-able without further checks.

use chrono::NaiveDateTime;
use tracing::debug;

use crate::devices::Battery;
use crate::error::{Error, Result};
use crate::series::TimeSeries;
use crate::sim::flexibility::FlexibilityWindow;

/// A per-consumer parameter given either once for every consumer or as one
/// value per consumer curve.
#[derive(Debug, Clone, PartialEq)]
pub enum PerConsumer<T> {
    /// Same value for every consumer.
    Uniform(T),
    /// One value per consumer, in consumer order.
    Each(Vec<T>),
}

impl<T: Clone> PerConsumer<T> {
    /// Expands into exactly `n` values.
    fn expand(&self, n: usize, field: &str) -> Result<Vec<T>> {
        match self {
            Self::Uniform(v) => Ok(vec![v.clone(); n]),
            Self::Each(values) if values.len() == n => Ok(values.clone()),
            Self::Each(values) => Err(Error::config(
                field,
                format!("expected {n} values (one per consumer), got {}", values.len()),
            )),
        }
    }
}

impl From<f64> for PerConsumer<f64> {
    fn from(v: f64) -> Self {
        Self::Uniform(v)
    }
}

impl From<Vec<f64>> for PerConsumer<f64> {
    fn from(v: Vec<f64>) -> Self {
        Self::Each(v)
    }
}

impl From<bool> for PerConsumer<bool> {
    fn from(v: bool) -> Self {
        Self::Uniform(v)
    }
}

impl From<Vec<bool>> for PerConsumer<bool> {
    fn from(v: Vec<bool>) -> Self {
        Self::Each(v)
    }
}

/// Builder-side state of one generation source.
#[derive(Debug, Clone)]
struct SourceSlot {
    enabled: bool,
    curve: Option<TimeSeries>,
    scaling: bool,
    power_w: f64,
}

impl Default for SourceSlot {
    fn default() -> Self {
        Self {
            enabled: false,
            curve: None,
            scaling: true,
            power_w: 0.0,
        }
    }
}

/// Mutable, unvalidated scenario description.
///
/// Every setter consumes and returns the builder so scenarios read as a
/// single expression:
///
/// ```
/// use balance_sim::scenario::ScenarioBuilder;
/// use balance_sim::series::TimeSeries;
/// use chrono::NaiveDate;
///
/// let t0 = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
/// let config = ScenarioBuilder::new()
///     .consumer(TimeSeries::hourly(t0, vec![5.0, 15.0, 10.0]))
///     .has_solar(true)
///     .solar_curve(TimeSeries::hourly(t0, vec![10.0, 10.0, 10.0]))
///     .solar_power(10.0)
///     .build()
///     .unwrap();
/// assert_eq!(config.timestamps().len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct ScenarioBuilder {
    consumers: Vec<TimeSeries>,
    consumer_scaling: PerConsumer<bool>,
    consumer_power: PerConsumer<f64>,
    consumer_contrib: Option<Vec<f64>>,
    flex_ratio: PerConsumer<f64>,
    solar: SourceSlot,
    wind: SourceSlot,
    bioenergy: SourceSlot,
    has_battery: bool,
    battery_capacity_wh: f64,
    has_flexibility: bool,
    flexibility_window: FlexibilityWindow,
    begin: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
}

impl Default for ScenarioBuilder {
    fn default() -> Self {
        Self {
            consumers: Vec::new(),
            consumer_scaling: PerConsumer::Uniform(false),
            consumer_power: PerConsumer::Uniform(0.0),
            consumer_contrib: None,
            flex_ratio: PerConsumer::Uniform(0.0),
            solar: SourceSlot::default(),
            wind: SourceSlot::default(),
            bioenergy: SourceSlot::default(),
            has_battery: false,
            battery_capacity_wh: 0.0,
            has_flexibility: false,
            flexibility_window: FlexibilityWindow::default(),
            begin: None,
            end: None,
        }
    }
}

impl ScenarioBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one consumer curve.
    pub fn consumer(mut self, curve: TimeSeries) -> Self {
        self.consumers.push(curve);
        self
    }

    /// Replaces the consumer curves.
    pub fn consumers(mut self, curves: impl IntoIterator<Item = TimeSeries>) -> Self {
        self.consumers = curves.into_iter().collect();
        self
    }

    /// Whether each consumer curve is scaled to its configured average power.
    pub fn consumer_scaling(mut self, scaling: impl Into<PerConsumer<bool>>) -> Self {
        self.consumer_scaling = scaling.into();
        self
    }

    /// Target average power (W) of each scaled consumer.
    pub fn consumer_power(mut self, power_w: impl Into<PerConsumer<f64>>) -> Self {
        self.consumer_power = power_w.into();
        self
    }

    /// Weight applied to each consumer when aggregating. Defaults to `1/n`.
    pub fn consumer_contrib(mut self, weights: Vec<f64>) -> Self {
        self.consumer_contrib = Some(weights);
        self
    }

    /// Fraction of each consumer's daily energy that may be shifted.
    pub fn flex_ratio(mut self, ratio: impl Into<PerConsumer<f64>>) -> Self {
        self.flex_ratio = ratio.into();
        self
    }

    pub fn has_solar(mut self, enabled: bool) -> Self {
        self.solar.enabled = enabled;
        self
    }

    pub fn solar_curve(mut self, curve: TimeSeries) -> Self {
        self.solar.curve = Some(curve);
        self
    }

    pub fn solar_scaling(mut self, scaling: bool) -> Self {
        self.solar.scaling = scaling;
        self
    }

    pub fn solar_power(mut self, power_w: f64) -> Self {
        self.solar.power_w = power_w;
        self
    }

    pub fn has_wind(mut self, enabled: bool) -> Self {
        self.wind.enabled = enabled;
        self
    }

    pub fn wind_curve(mut self, curve: TimeSeries) -> Self {
        self.wind.curve = Some(curve);
        self
    }

    pub fn wind_scaling(mut self, scaling: bool) -> Self {
        self.wind.scaling = scaling;
        self
    }

    pub fn wind_power(mut self, power_w: f64) -> Self {
        self.wind.power_w = power_w;
        self
    }

    pub fn has_bioenergy(mut self, enabled: bool) -> Self {
        self.bioenergy.enabled = enabled;
        self
    }

    pub fn bioenergy_curve(mut self, curve: TimeSeries) -> Self {
        self.bioenergy.curve = Some(curve);
        self
    }

    pub fn bioenergy_scaling(mut self, scaling: bool) -> Self {
        self.bioenergy.scaling = scaling;
        self
    }

    pub fn bioenergy_power(mut self, power_w: f64) -> Self {
        self.bioenergy.power_w = power_w;
        self
    }

    pub fn has_battery(mut self, enabled: bool) -> Self {
        self.has_battery = enabled;
        self
    }

    pub fn battery_capacity(mut self, capacity_wh: f64) -> Self {
        self.battery_capacity_wh = capacity_wh;
        self
    }

    pub fn has_flexibility(mut self, enabled: bool) -> Self {
        self.has_flexibility = enabled;
        self
    }

    pub fn flexibility_window(mut self, window: FlexibilityWindow) -> Self {
        self.flexibility_window = window;
        self
    }

    /// Inclusive start of the simulated period.
    pub fn begin(mut self, begin: NaiveDateTime) -> Self {
        self.begin = Some(begin);
        self
    }

    /// Exclusive end of the simulated period.
    pub fn end(mut self, end: NaiveDateTime) -> Self {
        self.end = Some(end);
        self
    }

    /// Validates and normalizes the scenario.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] for a missing consumer or generation curve, a
    ///   per-consumer list of the wrong length, an out-of-range parameter, or
    ///   curves that share no timestamp inside `[begin, end)`.
    /// - [`Error::Domain`] when a scaled curve averages zero but a non-zero
    ///   target power was requested.
    pub fn build(self) -> Result<ScenarioConfig> {
        let n = self.consumers.len();
        if n == 0 {
            return Err(Error::config(
                "consumers",
                "at least one consumer curve is required",
            ));
        }

        let scaling = self.consumer_scaling.expand(n, "consumers.scaling")?;
        let power = self.consumer_power.expand(n, "consumers.power")?;
        let contrib = match self.consumer_contrib {
            Some(weights) => PerConsumer::Each(weights).expand(n, "consumers.contrib")?,
            None => vec![1.0 / n as f64; n],
        };
        let flex_ratio = self.flex_ratio.expand(n, "consumers.flex_ratio")?;

        if let Some(r) = flex_ratio.iter().find(|r| !(0.0..=1.0).contains(*r)) {
            return Err(Error::config(
                "consumers.flex_ratio",
                format!("must be in [0.0, 1.0], got {r}"),
            ));
        }
        if let Some(w) = contrib.iter().find(|w| !w.is_finite()) {
            return Err(Error::config(
                "consumers.contrib",
                format!("must be finite, got {w}"),
            ));
        }
        if let Some(p) = power.iter().find(|p| !p.is_finite()) {
            return Err(Error::config(
                "consumers.power",
                format!("must be finite, got {p}"),
            ));
        }

        let solar = self.solar.activate("solar")?;
        let wind = self.wind.activate("wind")?;
        let bioenergy = self.bioenergy.activate("bioenergy")?;

        let battery = if self.has_battery {
            Some(Battery::new(self.battery_capacity_wh)?)
        } else {
            None
        };

        let flexibility = if self.has_flexibility {
            if let FlexibilityWindow::Fixed(bucket) = self.flexibility_window {
                if bucket.num_seconds() <= 0 {
                    return Err(Error::config(
                        "flexibility.window",
                        format!("fixed window must be positive, got {bucket}"),
                    ));
                }
            }
            Some(self.flexibility_window)
        } else {
            None
        };

        if let (Some(begin), Some(end)) = (self.begin, self.end) {
            if begin >= end {
                return Err(Error::config(
                    "window",
                    format!("begin ({begin}) must be before end ({end})"),
                ));
            }
        }

        let timestamps = {
            let mut active: Vec<&TimeSeries> = self.consumers.iter().collect();
            active.extend(
                [&solar, &wind, &bioenergy]
                    .into_iter()
                    .flatten()
                    .map(|s| &s.curve),
            );
            let common = TimeSeries::intersect(&active);
            let lo = self.begin.map_or(0, |b| common.partition_point(|t| *t < b));
            let hi = self
                .end
                .map_or(common.len(), |e| common.partition_point(|t| *t < e));
            common[lo..hi.max(lo)].to_vec()
        };
        if timestamps.is_empty() {
            return Err(Error::config(
                "curves",
                "active curves share no timestamp inside the requested window",
            ));
        }

        let consumers = self
            .consumers
            .iter()
            .enumerate()
            .map(|(i, curve)| Consumer {
                curve: curve.slice(&timestamps),
                scaling: scaling[i],
                power_w: power[i],
                contrib: contrib[i],
                flex_ratio: flex_ratio[i],
            })
            .collect::<Vec<_>>();
        let restrict = |source: Option<GenerationSource>| {
            source.map(|s| GenerationSource {
                curve: s.curve.slice(&timestamps),
                ..s
            })
        };
        let config = ScenarioConfig {
            consumers,
            solar: restrict(solar),
            wind: restrict(wind),
            bioenergy: restrict(bioenergy),
            battery,
            flexibility,
            begin: self.begin,
            end: self.end,
            timestamps,
        };

        for (i, c) in config.consumers.iter().enumerate() {
            if c.scaling {
                c.curve.scale_to_average(c.power_w).map_err(|e| {
                    Error::Domain(format!("consumer {i}: {e}"))
                })?;
            }
        }
        for (name, source) in config.sources() {
            if source.scaling {
                source
                    .curve
                    .scale_to_average(source.power_w)
                    .map_err(|e| Error::Domain(format!("{name}: {e}")))?;
            }
        }

        debug!(
            consumers = n,
            samples = config.timestamps.len(),
            solar = config.solar.is_some(),
            wind = config.wind.is_some(),
            bioenergy = config.bioenergy.is_some(),
            battery = config.battery.is_some(),
            flexibility = config.flexibility.is_some(),
            "scenario normalized"
        );
        Ok(config)
    }
}

impl SourceSlot {
    fn activate(self, name: &str) -> Result<Option<GenerationSource>> {
        if !self.enabled {
            return Ok(None);
        }
        if !self.power_w.is_finite() {
            return Err(Error::config(
                format!("{name}.power"),
                format!("must be finite, got {}", self.power_w),
            ));
        }
        let curve = self.curve.ok_or_else(|| {
            Error::config(
                format!("{name}.curve"),
                format!("required when has_{name} is set"),
            )
        })?;
        Ok(Some(GenerationSource {
            curve,
            scaling: self.scaling,
            power_w: self.power_w,
        }))
    }
}

/// One consumer of a validated scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct Consumer {
    /// Raw curve restricted to the scenario support.
    pub curve: TimeSeries,
    /// Whether the curve is scaled to [`Consumer::power_w`] on average.
    pub scaling: bool,
    /// Target average power (W) when scaling.
    pub power_w: f64,
    /// Aggregation weight.
    pub contrib: f64,
    /// Fraction of daily energy that may be shifted.
    pub flex_ratio: f64,
}

impl Consumer {
    /// The curve after optional scaling and weighting.
    pub fn weighted_curve(&self) -> Result<TimeSeries> {
        let curve = if self.scaling {
            self.curve.scale_to_average(self.power_w)?
        } else {
            self.curve.clone()
        };
        Ok(curve.scaled(self.contrib))
    }
}

/// One enabled generation source of a validated scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSource {
    /// Raw curve restricted to the scenario support.
    pub curve: TimeSeries,
    /// Whether the curve is scaled to [`GenerationSource::power_w`] on average.
    pub scaling: bool,
    /// Target average power (W) when scaling.
    pub power_w: f64,
}

impl GenerationSource {
    /// The curve after optional scaling.
    pub fn output(&self) -> Result<TimeSeries> {
        if self.scaling {
            self.curve.scale_to_average(self.power_w)
        } else {
            Ok(self.curve.clone())
        }
    }
}

/// Immutable, validated scenario.
///
/// All owned curves share [`ScenarioConfig::timestamps`] exactly. Use
/// [`ScenarioConfig::to_builder`] to derive a modified scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioConfig {
    consumers: Vec<Consumer>,
    solar: Option<GenerationSource>,
    wind: Option<GenerationSource>,
    bioenergy: Option<GenerationSource>,
    battery: Option<Battery>,
    flexibility: Option<FlexibilityWindow>,
    begin: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
    timestamps: Vec<NaiveDateTime>,
}

impl ScenarioConfig {
    /// Shorthand for [`ScenarioBuilder::new`].
    pub fn builder() -> ScenarioBuilder {
        ScenarioBuilder::new()
    }

    /// The common timestamp support of every active curve.
    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn consumers(&self) -> &[Consumer] {
        &self.consumers
    }

    pub fn solar(&self) -> Option<&GenerationSource> {
        self.solar.as_ref()
    }

    pub fn wind(&self) -> Option<&GenerationSource> {
        self.wind.as_ref()
    }

    pub fn bioenergy(&self) -> Option<&GenerationSource> {
        self.bioenergy.as_ref()
    }

    /// The battery, when storage is enabled.
    pub fn battery(&self) -> Option<Battery> {
        self.battery
    }

    /// The flexibility window, when demand flexibility is enabled.
    pub fn flexibility(&self) -> Option<FlexibilityWindow> {
        self.flexibility
    }

    pub fn begin(&self) -> Option<NaiveDateTime> {
        self.begin
    }

    pub fn end(&self) -> Option<NaiveDateTime> {
        self.end
    }

    /// Enabled generation sources with their names, in wind, solar,
    /// bioenergy order.
    pub fn sources(&self) -> impl Iterator<Item = (&'static str, &GenerationSource)> {
        [
            ("wind", self.wind.as_ref()),
            ("solar", self.solar.as_ref()),
            ("bioenergy", self.bioenergy.as_ref()),
        ]
        .into_iter()
        .filter_map(|(name, s)| s.map(|s| (name, s)))
    }

    /// Scaled and weighted curve of the consumer at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `index` is out of range.
    pub fn consumer_curve(&self, index: usize) -> Result<TimeSeries> {
        let consumer = self.consumers.get(index).ok_or_else(|| {
            Error::config(
                "consumers",
                format!(
                    "index {index} out of range for {} consumers",
                    self.consumers.len()
                ),
            )
        })?;
        consumer.weighted_curve()
    }

    /// Sum of every weighted consumer curve.
    pub fn consumption_curve(&self) -> Result<TimeSeries> {
        self.consumers
            .iter()
            .try_fold(self.zeros()?, |acc, c| acc.try_add(&c.weighted_curve()?))
    }

    /// Sum of every enabled generation source; zero when none is enabled.
    pub fn production_curve(&self) -> Result<TimeSeries> {
        self.sources()
            .try_fold(self.zeros()?, |acc, (_, s)| acc.try_add(&s.output()?))
    }

    /// Re-opens this scenario for modification.
    pub fn to_builder(&self) -> ScenarioBuilder {
        let source_slot = |source: &Option<GenerationSource>| match source {
            Some(s) => SourceSlot {
                enabled: true,
                curve: Some(s.curve.clone()),
                scaling: s.scaling,
                power_w: s.power_w,
            },
            None => SourceSlot::default(),
        };
        ScenarioBuilder {
            consumers: self.consumers.iter().map(|c| c.curve.clone()).collect(),
            consumer_scaling: PerConsumer::Each(self.consumers.iter().map(|c| c.scaling).collect()),
            consumer_power: PerConsumer::Each(self.consumers.iter().map(|c| c.power_w).collect()),
            consumer_contrib: Some(self.consumers.iter().map(|c| c.contrib).collect()),
            flex_ratio: PerConsumer::Each(self.consumers.iter().map(|c| c.flex_ratio).collect()),
            solar: source_slot(&self.solar),
            wind: source_slot(&self.wind),
            bioenergy: source_slot(&self.bioenergy),
            has_battery: self.battery.is_some(),
            battery_capacity_wh: self.battery.map_or(0.0, |b| b.capacity_wh()),
            has_flexibility: self.flexibility.is_some(),
            flexibility_window: self.flexibility.unwrap_or_default(),
            begin: self.begin,
            end: self.end,
        }
    }

    fn zeros(&self) -> Result<TimeSeries> {
        TimeSeries::constant(self.timestamps.clone(), 0.0)
    }
}

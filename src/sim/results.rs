//! Curves produced by one simulation run.

use chrono::NaiveDateTime;

use crate::devices::BatteryTrace;
use crate::error::Result;
use crate::series::TimeSeries;

/// Every intermediate and final curve of a run.
///
/// All power curves share the scenario's timestamp support. The
/// flexibility-usage curve holds one sample per flexibility window instead.
#[derive(Debug, Clone, PartialEq)]
pub struct SimResults {
    /// Aggregated consumption after demand flexibility.
    pub total_consumption: TimeSeries,
    /// Aggregated consumption before demand flexibility.
    pub consumption_before_flexibility: TimeSeries,
    /// Generation before storage acts.
    pub production_before_storage: TimeSeries,
    /// Generation net of battery charge and discharge.
    pub total_production: TimeSeries,
    /// Power drawn from the grid (≥ 0).
    pub imported_power: TimeSeries,
    /// Power sent to the grid (≥ 0).
    pub exported_power: TimeSeries,
    /// Shifted fraction of consumption energy per flexibility window.
    pub flexibility_usage: TimeSeries,
    /// Battery trace when storage is enabled.
    pub battery: Option<BatteryTrace>,
}

impl SimResults {
    /// Restricts every curve to `[begin, end)`.
    pub fn slice_window(&self, begin: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Self {
        Self {
            total_consumption: self.total_consumption.slice_window(begin, end),
            consumption_before_flexibility: self
                .consumption_before_flexibility
                .slice_window(begin, end),
            production_before_storage: self.production_before_storage.slice_window(begin, end),
            total_production: self.total_production.slice_window(begin, end),
            imported_power: self.imported_power.slice_window(begin, end),
            exported_power: self.exported_power.slice_window(begin, end),
            flexibility_usage: self.flexibility_usage.slice_window(begin, end),
            battery: self.battery.as_ref().map(|b| b.slice_window(begin, end)),
        }
    }

    /// Smooths every curve with a trailing mean over `width` samples.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Domain`] if `width` is zero.
    pub fn rolling_average(&self, width: usize) -> Result<Self> {
        Ok(Self {
            total_consumption: self.total_consumption.rolling_average(width)?,
            consumption_before_flexibility: self
                .consumption_before_flexibility
                .rolling_average(width)?,
            production_before_storage: self.production_before_storage.rolling_average(width)?,
            total_production: self.total_production.rolling_average(width)?,
            imported_power: self.imported_power.rolling_average(width)?,
            exported_power: self.exported_power.rolling_average(width)?,
            flexibility_usage: self.flexibility_usage.rolling_average(width)?,
            battery: self
                .battery
                .as_ref()
                .map(|b| b.rolling_average(width))
                .transpose()?,
        })
    }

    /// Battery capacity in Wh, or `None` without storage.
    pub fn battery_capacity_wh(&self) -> Option<f64> {
        self.battery.as_ref().map(|b| b.capacity_wh)
    }
}

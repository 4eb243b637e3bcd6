//! Scalar indicators derived from a simulation run.

use std::fmt;

use serde::Serialize;

use crate::error::Result;
use crate::series::TimeSeries;

use super::results::SimResults;

/// Fixed summary of one [`SimResults`].
///
/// Ratios whose denominator averages zero are reported as `0.0`, except
/// `storage_use`, which is `1.0` without a battery or with zero capacity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedMetrics {
    /// Average charging power over battery capacity.
    pub storage_use: f64,
    /// Average imported power (W).
    pub imported_power: f64,
    /// Average exported power (W).
    pub exported_power: f64,
    /// Fraction of samples with a non-zero import.
    pub imported_time: f64,
    /// Fraction of samples with a non-zero export.
    pub exported_time: f64,
    /// 5th percentile of consumption (W).
    pub low_consumption_peak: f64,
    /// 95th percentile of consumption (W).
    pub high_consumption_peak: f64,
    /// 5th percentile of imports (W).
    pub low_import_peak: f64,
    /// 95th percentile of imports (W).
    pub high_import_peak: f64,
    /// Average shifted fraction per flexibility window.
    pub flexibility_use: f64,
    /// Largest export (W).
    pub export_max: f64,
    /// Largest import (W).
    pub import_max: f64,
    /// Average consumption over average production.
    pub coverage: f64,
    /// Average of the pointwise consumption / production ratio.
    pub coverage_avg: f64,
    /// Share of production consumed locally.
    pub autoconsumption: f64,
    /// Share of consumption met locally.
    pub autoproduction: f64,
}

impl AggregatedMetrics {
    /// Computes every indicator from a run.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Alignment`] if the power curves of `results`
    /// do not share timestamps, which cannot happen for the output of
    /// [`crate::sim::simulate`].
    pub fn from_results(results: &SimResults) -> Result<Self> {
        let consumption = &results.total_consumption;
        let production = &results.total_production;
        let imported = &results.imported_power;
        let exported = &results.exported_power;

        let storage_use = match &results.battery {
            Some(trace) if trace.capacity_wh > 0.0 => {
                trace.power.bigger_than(0.0).average() / trace.capacity_wh
            }
            _ => 1.0,
        };

        let self_consumed = production.try_sub(exported)?;
        let self_supplied = consumption.try_sub(imported)?;

        Ok(Self {
            storage_use,
            imported_power: imported.average(),
            exported_power: exported.average(),
            imported_time: time_fraction(imported),
            exported_time: time_fraction(exported),
            low_consumption_peak: consumption.percentile(5.0),
            high_consumption_peak: consumption.percentile(95.0),
            low_import_peak: imported.percentile(5.0),
            high_import_peak: imported.percentile(95.0),
            flexibility_use: results.flexibility_usage.average(),
            export_max: exported.max().unwrap_or(0.0),
            import_max: imported.max().unwrap_or(0.0),
            coverage: ratio_or_zero(consumption.average(), production.average()),
            coverage_avg: consumption.try_div_or(production, 0.0)?.average(),
            autoconsumption: ratio_or_zero(self_consumed.average(), production.average()),
            autoproduction: ratio_or_zero(self_supplied.average(), consumption.average()),
        })
    }
}

/// Reduces a run to its [`AggregatedMetrics`].
///
/// # Errors
///
/// See [`AggregatedMetrics::from_results`].
pub fn summarize(results: &SimResults) -> Result<AggregatedMetrics> {
    AggregatedMetrics::from_results(results)
}

fn time_fraction(series: &TimeSeries) -> f64 {
    if series.is_empty() {
        0.0
    } else {
        series.count_greater_than(0.0) as f64 / series.len() as f64
    }
}

fn ratio_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

impl fmt::Display for AggregatedMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Metrics Report ---")?;
        writeln!(f, "Storage use:           {:.3}", self.storage_use)?;
        writeln!(f, "Average import:        {:.2} W", self.imported_power)?;
        writeln!(f, "Average export:        {:.2} W", self.exported_power)?;
        writeln!(f, "Time importing:        {:.1}%", 100.0 * self.imported_time)?;
        writeln!(f, "Time exporting:        {:.1}%", 100.0 * self.exported_time)?;
        writeln!(
            f,
            "Consumption p5/p95:    {:.2} / {:.2} W",
            self.low_consumption_peak, self.high_consumption_peak
        )?;
        writeln!(
            f,
            "Import p5/p95:         {:.2} / {:.2} W",
            self.low_import_peak, self.high_import_peak
        )?;
        writeln!(f, "Flexibility use:       {:.3}", self.flexibility_use)?;
        writeln!(f, "Peak import:           {:.2} W", self.import_max)?;
        writeln!(f, "Peak export:           {:.2} W", self.export_max)?;
        writeln!(f, "Coverage:              {:.3}", self.coverage)?;
        writeln!(f, "Coverage (pointwise):  {:.3}", self.coverage_avg)?;
        writeln!(f, "Autoconsumption:       {:.3}", self.autoconsumption)?;
        write!(f, "Autoproduction:        {:.3}", self.autoproduction)
    }
}

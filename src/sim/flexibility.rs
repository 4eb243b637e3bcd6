//! Intra-day demand flexibility.
//!
//! Within each window (a calendar day, or a fixed-length bucket) a fraction of
//! the window's consumption energy is moved away from the timesteps with the
//! largest deficit and added back at the timesteps with the smallest one.
//! The total consumption of every window is preserved to within
//! [`TOLERATED_ERROR`]. The bound is absolute for watt-scale inputs; once a
//! window's total reaches the order of 1e7 W it becomes relative, since f64
//! sums of that size cannot resolve an absolute 1e-8 difference.

use chrono::{Datelike, NaiveDateTime, TimeDelta};
use tracing::debug;

use crate::error::{Error, Result};
use crate::series::TimeSeries;

/// Remaining energy below which a redistribution pass stops.
pub const TOLERATED_ERROR: f64 = 1e-8;

/// How timesteps are grouped before redistribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlexibilityWindow {
    /// One window per calendar date of the timestamps.
    #[default]
    CalendarDay,
    /// Consecutive buckets of fixed length starting at the first timestamp.
    Fixed(TimeDelta),
}

/// Curves produced by a flexibility run.
#[derive(Debug, Clone, PartialEq)]
pub struct FlexOutcome {
    /// Production curve, unchanged.
    pub production: TimeSeries,
    /// Consumption after redistribution, aligned with `production`.
    pub consumption: TimeSeries,
    /// Shifted fraction of consumption energy, one sample per window stamped
    /// with the window's first timestamp.
    pub usage: TimeSeries,
}

/// Redistributes consumption within `window`-sized groups.
///
/// # Errors
///
/// Returns [`Error::Alignment`] if the curves are not aligned and
/// [`Error::Domain`] for a ratio outside `[0, 1]` or a non-positive fixed
/// window.
pub fn shift(
    production: &TimeSeries,
    consumption: &TimeSeries,
    ratio: f64,
    window: FlexibilityWindow,
) -> Result<FlexOutcome> {
    match window {
        FlexibilityWindow::CalendarDay => shift_daily(production, consumption, ratio),
        FlexibilityWindow::Fixed(bucket) => shift_bucketed(production, consumption, ratio, bucket),
    }
}

/// Redistributes consumption independently within each calendar day.
///
/// # Errors
///
/// See [`shift`].
pub fn shift_daily(
    production: &TimeSeries,
    consumption: &TimeSeries,
    ratio: f64,
) -> Result<FlexOutcome> {
    check_inputs(production, consumption, ratio)?;
    run_windows(production, consumption, ratio, |t| {
        i64::from(t.date().num_days_from_ce())
    })
}

/// Redistributes consumption within fixed-length buckets measured from the
/// first timestamp. A 24 h bucket starting at midnight matches
/// [`shift_daily`].
///
/// # Errors
///
/// See [`shift`].
pub fn shift_bucketed(
    production: &TimeSeries,
    consumption: &TimeSeries,
    ratio: f64,
    bucket: TimeDelta,
) -> Result<FlexOutcome> {
    check_inputs(production, consumption, ratio)?;
    let bucket_secs = bucket.num_seconds();
    if bucket_secs <= 0 {
        return Err(Error::Domain(format!(
            "flexibility bucket must be at least one second, got {bucket}"
        )));
    }
    let Some(origin) = production.start() else {
        return Ok(empty_outcome(production, consumption));
    };
    run_windows(production, consumption, ratio, |t| {
        (t - origin).num_seconds().div_euclid(bucket_secs)
    })
}

fn check_inputs(production: &TimeSeries, consumption: &TimeSeries, ratio: f64) -> Result<()> {
    if !production.is_aligned_with(consumption) {
        return Err(Error::Alignment(
            "production and consumption must share timestamps for flexibility".into(),
        ));
    }
    if !(0.0..=1.0).contains(&ratio) {
        return Err(Error::Domain(format!(
            "flexibility ratio must be in [0, 1], got {ratio}"
        )));
    }
    Ok(())
}

fn empty_outcome(production: &TimeSeries, consumption: &TimeSeries) -> FlexOutcome {
    FlexOutcome {
        production: production.clone(),
        consumption: consumption.clone(),
        usage: TimeSeries::default(),
    }
}

/// Groups consecutive timesteps sharing the same `key` and redistributes each
/// group in place.
fn run_windows(
    production: &TimeSeries,
    consumption: &TimeSeries,
    ratio: f64,
    key: impl Fn(NaiveDateTime) -> i64,
) -> Result<FlexOutcome> {
    let timestamps = production.timestamps();
    let mut flexed = consumption.values().to_vec();
    let mut usage_ts = Vec::new();
    let mut usage = Vec::new();

    let mut start = 0;
    while start < timestamps.len() {
        let k = key(timestamps[start]);
        let len = timestamps[start..]
            .iter()
            .take_while(|&&t| key(t) == k)
            .count();
        let end = start + len;
        let shifted = redistribute(
            &mut flexed[start..end],
            &production.values()[start..end],
            ratio,
        );
        usage_ts.push(timestamps[start]);
        usage.push(shifted);
        start = end;
    }

    debug!(
        windows = usage.len(),
        ratio, "redistributed consumption across flexibility windows"
    );

    Ok(FlexOutcome {
        production: production.clone(),
        consumption: consumption.with_values(flexed),
        usage: TimeSeries::new(usage_ts, usage)?,
    })
}

/// Levels the highest deficits down and the lowest deficits up by
/// `ratio * Σ consumption` each. Returns the fraction of the window's
/// consumption energy that moved.
fn redistribute(consumption: &mut [f64], production: &[f64], ratio: f64) -> f64 {
    let n = consumption.len();
    if n == 0 {
        return 0.0;
    }
    let before = consumption.to_vec();
    let total: f64 = before.iter().sum();

    let mut deficit: Vec<f64> = consumption
        .iter()
        .zip(production)
        .map(|(c, p)| c - p)
        .collect();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| deficit[a].total_cmp(&deficit[b]));

    // Downward pass: widen the leveled group from the top of the ranking.
    let budget = ratio * total;
    let mut remaining = budget;
    let mut j = n - 1;
    while remaining > TOLERATED_ERROR {
        let count = n - j;
        let amount = if j == 0 {
            remaining
        } else {
            let gap = (deficit[order[n - 1]] - deficit[order[j - 1]]).max(0.0);
            (gap * count as f64).min(remaining)
        };
        let share = amount / count as f64;
        for &k in &order[j..] {
            consumption[k] -= share;
            deficit[k] -= share;
        }
        remaining -= amount;
        j = j.saturating_sub(1);
    }

    // Upward pass: give back exactly what was removed, from the bottom.
    let mut remaining = budget - remaining;
    let mut j = 0;
    while remaining > TOLERATED_ERROR {
        let count = j + 1;
        let amount = if j == n - 1 {
            remaining
        } else {
            let gap = (deficit[order[j + 1]] - deficit[order[0]]).max(0.0);
            (gap * count as f64).min(remaining)
        };
        let share = amount / count as f64;
        for &k in &order[..=j] {
            consumption[k] += share;
            deficit[k] += share;
        }
        remaining -= amount;
        j = (j + 1).min(n - 1);
    }

    if total == 0.0 {
        return 0.0;
    }
    let moved: f64 = consumption
        .iter()
        .zip(&before)
        .map(|(a, b)| (a - b).abs())
        .sum();
    moved / (2.0 * total.abs())
}

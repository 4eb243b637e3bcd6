//! Timestamp-aligned power curves.
//!
//! [`TimeSeries`] is the container every other stage consumes and produces.
//! It is immutable: each transform returns a new series. Elementwise
//! arithmetic between two series only succeeds when both carry the exact same
//! timestamp sequence; align them first with [`TimeSeries::intersect`] and
//! [`TimeSeries::slice`].

use chrono::NaiveDateTime;

use crate::error::{Error, Result};

/// Ordered `(timestamp, value)` samples, values in watts.
///
/// Invariants: timestamps are strictly increasing, and there is exactly one
/// value per timestamp.
///
/// # Examples
///
/// ```
/// use balance_sim::series::TimeSeries;
/// use chrono::NaiveDate;
///
/// let t0 = NaiveDate::from_ymd_opt(2024, 1, 1)
///     .and_then(|d| d.and_hms_opt(0, 0, 0))
///     .unwrap();
/// let series = TimeSeries::hourly(t0, vec![1.0, 2.0, 3.0]);
/// assert_eq!(series.len(), 3);
/// assert_eq!(series.average(), 2.0);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeSeries {
    timestamps: Vec<NaiveDateTime>,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Creates a series from parallel timestamp and value vectors.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSeries`] if the lengths differ or timestamps are
    /// not strictly increasing.
    pub fn new(timestamps: Vec<NaiveDateTime>, values: Vec<f64>) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(Error::InvalidSeries(format!(
                "{} timestamps but {} values",
                timestamps.len(),
                values.len()
            )));
        }
        if let Some(i) = timestamps.windows(2).position(|w| w[0] >= w[1]) {
            return Err(Error::InvalidSeries(format!(
                "timestamps must be strictly increasing (index {} at {})",
                i + 1,
                timestamps[i + 1]
            )));
        }
        Ok(Self { timestamps, values })
    }

    /// Creates a series from `(timestamp, value)` pairs.
    ///
    /// # Errors
    ///
    /// Same as [`TimeSeries::new`].
    pub fn from_pairs(pairs: impl IntoIterator<Item = (NaiveDateTime, f64)>) -> Result<Self> {
        let (timestamps, values) = pairs.into_iter().unzip();
        Self::new(timestamps, values)
    }

    /// Creates an hourly series starting at `start`.
    pub fn hourly(start: NaiveDateTime, values: Vec<f64>) -> Self {
        let timestamps = (0..values.len())
            .map(|i| start + chrono::TimeDelta::hours(i as i64))
            .collect();
        Self { timestamps, values }
    }

    /// Creates a series with the same value at every given timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSeries`] if timestamps are not strictly increasing.
    pub fn constant(timestamps: Vec<NaiveDateTime>, value: f64) -> Result<Self> {
        let values = vec![value; timestamps.len()];
        Self::new(timestamps, values)
    }

    /// Same timestamps, new values. Callers guarantee equal lengths.
    pub(crate) fn with_values(&self, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), self.timestamps.len());
        Self {
            timestamps: self.timestamps.clone(),
            values,
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the series holds no samples.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// First timestamp, if any.
    pub fn start(&self) -> Option<NaiveDateTime> {
        self.timestamps.first().copied()
    }

    /// Last timestamp, if any.
    pub fn end(&self) -> Option<NaiveDateTime> {
        self.timestamps.last().copied()
    }

    /// Iterates over `(timestamp, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDateTime, f64)> + '_ {
        self.timestamps
            .iter()
            .copied()
            .zip(self.values.iter().copied())
    }

    /// Returns `true` if both series share the exact same timestamp sequence.
    pub fn is_aligned_with(&self, other: &Self) -> bool {
        self.timestamps == other.timestamps
    }

    fn zip_with(&self, other: &Self, op: &str, f: impl Fn(f64, f64) -> f64) -> Result<Self> {
        if !self.is_aligned_with(other) {
            return Err(Error::Alignment(format!(
                "cannot {op} series of {} and {} samples with different timestamps",
                self.len(),
                other.len()
            )));
        }
        let values = self
            .values
            .iter()
            .zip(&other.values)
            .map(|(&a, &b)| f(a, b))
            .collect();
        Ok(self.with_values(values))
    }

    /// Elementwise sum.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Alignment`] if the timestamp sequences differ.
    pub fn try_add(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, "add", |a, b| a + b)
    }

    /// Elementwise difference `self - other`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Alignment`] if the timestamp sequences differ.
    pub fn try_sub(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, "subtract", |a, b| a - b)
    }

    /// Elementwise product.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Alignment`] if the timestamp sequences differ.
    pub fn try_mul(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, "multiply", |a, b| a * b)
    }

    /// Elementwise quotient `self / other`, with `fallback` wherever the
    /// divisor is zero.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Alignment`] if the timestamp sequences differ.
    pub fn try_div_or(&self, other: &Self, fallback: f64) -> Result<Self> {
        self.zip_with(other, "divide", |a, b| if b == 0.0 { fallback } else { a / b })
    }

    /// Multiplies every value by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        self.map(|v| v * factor)
    }

    /// Adds `offset` to every value.
    pub fn shifted(&self, offset: f64) -> Self {
        self.map(|v| v + offset)
    }

    /// Applies `f` to every value, keeping timestamps.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        self.with_values(self.values.iter().map(|&v| f(v)).collect())
    }

    /// Sorted timestamps present in every given series.
    ///
    /// Returns an empty vector when `series` is empty.
    pub fn intersect(series: &[&TimeSeries]) -> Vec<NaiveDateTime> {
        let Some((first, rest)) = series.split_first() else {
            return Vec::new();
        };
        rest.iter().fold(first.timestamps.clone(), |acc, s| {
            intersect_sorted(&acc, &s.timestamps)
        })
    }

    /// Keeps only the samples whose timestamp is in `timestamps`.
    ///
    /// `timestamps` must be sorted; entries absent from the series are ignored.
    pub fn slice(&self, timestamps: &[NaiveDateTime]) -> Self {
        let mut out_ts = Vec::with_capacity(timestamps.len().min(self.len()));
        let mut out_v = Vec::with_capacity(out_ts.capacity());
        let (mut i, mut j) = (0, 0);
        while i < self.timestamps.len() && j < timestamps.len() {
            match self.timestamps[i].cmp(&timestamps[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    out_ts.push(self.timestamps[i]);
                    out_v.push(self.values[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        Self {
            timestamps: out_ts,
            values: out_v,
        }
    }

    /// Restricts the series to the half-open window `[begin, end)`.
    ///
    /// A `None` bound leaves that side open.
    pub fn slice_window(&self, begin: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Self {
        let (lo, hi) = self.window_bounds(begin, end);
        Self {
            timestamps: self.timestamps[lo..hi].to_vec(),
            values: self.values[lo..hi].to_vec(),
        }
    }

    fn window_bounds(
        &self,
        begin: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> (usize, usize) {
        let lo = begin.map_or(0, |b| self.timestamps.partition_point(|t| *t < b));
        let hi = end.map_or(self.len(), |e| self.timestamps.partition_point(|t| *t < e));
        (lo, hi.max(lo))
    }

    /// Sum of all values.
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Arithmetic mean of the values; `0.0` for an empty series.
    pub fn average(&self) -> f64 {
        mean(&self.values)
    }

    /// Arithmetic mean over the half-open window `[begin, end)`.
    pub fn average_over(&self, begin: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> f64 {
        let (lo, hi) = self.window_bounds(begin, end);
        mean(&self.values[lo..hi])
    }

    /// Returns a copy rescaled so its average equals `target`.
    ///
    /// A zero-average source with a zero target is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Domain`] when the current average is zero and
    /// `target` is not.
    pub fn scale_to_average(&self, target: f64) -> Result<Self> {
        let current = self.average();
        if current == 0.0 {
            if target == 0.0 {
                return Ok(self.clone());
            }
            return Err(Error::Domain(format!(
                "cannot scale a zero-average series to average {target}"
            )));
        }
        Ok(self.scaled(target / current))
    }

    /// Percentile `p` (0–100) with linear interpolation between the two
    /// nearest ranks; `0.0` for an empty series.
    pub fn percentile(&self, p: f64) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let mut sorted = self.values.clone();
        sorted.sort_by(f64::total_cmp);
        let rank = p.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
        let lo = rank.floor() as usize;
        let hi = rank.ceil() as usize;
        let frac = rank - lo as f64;
        sorted[lo] + (sorted[hi] - sorted[lo]) * frac
    }

    /// Largest value, if any.
    pub fn max(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::max)
    }

    /// Smallest value, if any.
    pub fn min(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::min)
    }

    /// Trailing mean over `width` consecutive samples.
    ///
    /// The first `width - 1` samples have no full window and are dropped, so
    /// the output holds `len - width + 1` samples stamped with the last
    /// timestamp of each window. A series shorter than `width` yields an empty
    /// series.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Domain`] if `width` is zero.
    pub fn rolling_average(&self, width: usize) -> Result<Self> {
        if width == 0 {
            return Err(Error::Domain("rolling average width must be > 0".into()));
        }
        if self.len() < width {
            return Ok(Self::default());
        }
        let mut values = Vec::with_capacity(self.len() - width + 1);
        let mut window_sum: f64 = self.values[..width].iter().sum();
        values.push(window_sum / width as f64);
        for i in width..self.len() {
            window_sum += self.values[i] - self.values[i - width];
            values.push(window_sum / width as f64);
        }
        Ok(Self {
            timestamps: self.timestamps[width - 1..].to_vec(),
            values,
        })
    }

    /// Running mean from the first sample through each point.
    pub fn cumulative_average(&self) -> Self {
        let values = self
            .values
            .iter()
            .scan(0.0, |acc, &v| {
                *acc += v;
                Some(*acc)
            })
            .enumerate()
            .map(|(i, total)| total / (i + 1) as f64)
            .collect();
        self.with_values(values)
    }

    /// Values not strictly greater than `threshold` are replaced by zero.
    pub fn bigger_than(&self, threshold: f64) -> Self {
        self.map(|v| if v > threshold { v } else { 0.0 })
    }

    /// Values not strictly smaller than `threshold` are replaced by zero.
    pub fn smaller_than(&self, threshold: f64) -> Self {
        self.map(|v| if v < threshold { v } else { 0.0 })
    }

    /// Number of samples strictly greater than `threshold`.
    pub fn count_greater_than(&self, threshold: f64) -> usize {
        self.values.iter().filter(|&&v| v > threshold).count()
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn intersect_sorted(a: &[NaiveDateTime], b: &[NaiveDateTime]) -> Vec<NaiveDateTime> {
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}

//! Trailing moving-window statistics
//!
//! All functions in this module use trailing ("rolling") windows: the value at
//! position `i` summarizes `seq[max(0, i + 1 - len)..=i]`, never a centered
//! range. Missing values are represented by `NaN`; they are skipped inside a
//! window and do not count toward [`Window::min_periods`]. A position whose
//! window holds fewer than `min_periods` observed values is `NaN` in the output.
//!
//! Every output has the same length as its input.
//!
//! # Examples
//!
//! ```
//! use tapstat_stats::window::{Window, moving_mean};
//!
//! let window = Window::new(3, 1).unwrap();
//! let means = moving_mean(&[1.0, 2.0, 3.0, 4.0, 5.0], window);
//! assert_eq!(means, vec![1.0, 1.5, 2.0, 3.0, 4.0]);
//! ```

use crate::descriptive::ratio_or_nan;

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum WindowError {
    #[display("window length must be at least 1")]
    ZeroLength,
    #[display("min_periods must be between 1 and the window length {len}, got {min_periods}")]
    MinPeriodsOutOfRange { len: usize, min_periods: usize },
}

/// Window length plus the number of observations required before a value is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    len: usize,
    min_periods: usize,
}

impl Window {
    pub fn new(len: usize, min_periods: usize) -> Result<Self, WindowError> {
        if len == 0 {
            return Err(WindowError::ZeroLength);
        }
        if min_periods == 0 || min_periods > len {
            return Err(WindowError::MinPeriodsOutOfRange { len, min_periods });
        }
        Ok(Self { len, min_periods })
    }

    /// A window that emits a value as soon as one observation is available.
    pub fn warm(len: usize) -> Result<Self, WindowError> {
        Self::new(len, 1)
    }

    #[must_use]
    pub fn len(self) -> usize {
        self.len
    }

    #[must_use]
    pub fn min_periods(self) -> usize {
        self.min_periods
    }
}

/// Running sums over the observed values of the current window.
///
/// Values are accumulated relative to `offset` (the first observed value of
/// the sequence) to keep the squared sums small for large-magnitude data.
#[derive(Debug, Default)]
struct RunningSums {
    offset: f64,
    count: usize,
    sum: f64,
    sum_sq: f64,
}

impl RunningSums {
    fn push(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }
        let d = value - self.offset;
        self.count += 1;
        self.sum += d;
        self.sum_sq += d * d;
    }

    fn pop(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }
        let d = value - self.offset;
        self.count -= 1;
        if self.count == 0 {
            self.sum = 0.0;
            self.sum_sq = 0.0;
        } else {
            self.sum -= d;
            self.sum_sq -= d * d;
        }
    }

    #[expect(clippy::cast_precision_loss)]
    fn mean(&self) -> f64 {
        self.offset + self.sum / self.count as f64
    }

    #[expect(clippy::cast_precision_loss)]
    fn sample_variance(&self) -> f64 {
        if self.count < 2 {
            return f64::NAN;
        }
        let n = self.count as f64;
        ((self.sum_sq - self.sum * self.sum / n) / (n - 1.0)).max(0.0)
    }
}

fn rolling<F>(seq: &[f64], window: Window, mut finish: F) -> Vec<f64>
where
    F: FnMut(&RunningSums) -> f64,
{
    let mut sums = RunningSums {
        offset: seq.iter().copied().find(|v| !v.is_nan()).unwrap_or(0.0),
        ..RunningSums::default()
    };
    let mut out = Vec::with_capacity(seq.len());
    for (i, &value) in seq.iter().enumerate() {
        sums.push(value);
        if i >= window.len {
            sums.pop(seq[i - window.len]);
        }
        if sums.count >= window.min_periods {
            out.push(finish(&sums));
        } else {
            out.push(f64::NAN);
        }
    }
    out
}

/// Trailing moving mean.
#[must_use]
pub fn moving_mean(seq: &[f64], window: Window) -> Vec<f64> {
    rolling(seq, window, RunningSums::mean)
}

/// Trailing moving sample standard deviation.
///
/// A window with a single observation has no sample deviation and yields `NaN`
/// even when `min_periods` is 1.
///
/// ```
/// # use tapstat_stats::window::{Window, moving_std};
/// let stds = moving_std(&[1.0, 3.0, 5.0], Window::warm(2).unwrap());
/// assert!(stds[0].is_nan());
/// assert!((stds[1] - 2.0_f64.sqrt()).abs() < 1e-12);
/// ```
#[must_use]
pub fn moving_std(seq: &[f64], window: Window) -> Vec<f64> {
    rolling(seq, window, |sums| sums.sample_variance().sqrt())
}

/// Fraction bound for an error given in whole-number percent.
#[must_use]
pub fn error_bound(error_pct: f64) -> f64 {
    error_pct / 100.0
}

/// Whether a signed fractional error lies inside `±error_pct / 100` (inclusive).
#[must_use]
pub fn within_error(value: f64, error_pct: f64) -> bool {
    let bound = error_bound(error_pct);
    -bound <= value && value <= bound
}

/// Trailing success percentage of a sequence of signed fractional errors.
///
/// Each position reports `100 * hits / observed` over its window, where a hit
/// is a value inside the inclusive band `±error_pct / 100`.
///
/// ```
/// # use tapstat_stats::window::{Window, success_rate};
/// let losses = [0.0, 0.2, -0.05, 0.1];
/// let rate = success_rate(&losses, 10.0, Window::warm(2).unwrap());
/// assert_eq!(rate, vec![100.0, 50.0, 50.0, 100.0]);
/// ```
#[must_use]
pub fn success_rate(seq: &[f64], error_pct: f64, window: Window) -> Vec<f64> {
    let hits = seq
        .iter()
        .map(|&v| {
            if v.is_nan() {
                f64::NAN
            } else if within_error(v, error_pct) {
                1.0
            } else {
                0.0
            }
        })
        .collect::<Vec<_>>();
    rolling(&hits, window, |sums| sums.mean() * 100.0)
}

/// Smoothed trailing coefficient of variation.
///
/// Computes `moving_std / moving_mean` pointwise over `window`, then smooths
/// the ratio with a trailing moving mean of width `smoothing_len` that emits
/// as soon as one ratio is available. A zero or missing mean gives a missing
/// ratio.
pub fn coefficient_of_variation(
    seq: &[f64],
    window: Window,
    smoothing_len: usize,
) -> Result<Vec<f64>, WindowError> {
    let smoothing = Window::warm(smoothing_len)?;
    let ratio = rolling(seq, window, |sums| {
        ratio_or_nan(sums.sample_variance().sqrt(), sums.mean())
    });
    Ok(moving_mean(&ratio, smoothing))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
            if e.is_nan() {
                assert!(a.is_nan(), "position {i}: expected NaN, got {a}");
            } else {
                assert!((a - e).abs() < 1e-9, "position {i}: expected {e}, got {a}");
            }
        }
    }

    #[test]
    fn test_window_validation() {
        assert_eq!(Window::new(0, 1), Err(WindowError::ZeroLength));
        assert!(matches!(
            Window::new(3, 0),
            Err(WindowError::MinPeriodsOutOfRange { .. })
        ));
        assert!(matches!(
            Window::new(3, 4),
            Err(WindowError::MinPeriodsOutOfRange { .. })
        ));
        assert!(Window::new(3, 3).is_ok());
    }

    #[test]
    fn test_moving_mean_is_trailing() {
        let out = moving_mean(&[1.0, 2.0, 3.0, 4.0, 5.0], Window::new(3, 1).unwrap());
        assert_close(&out, &[1.0, 1.5, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_moving_mean_min_periods_warm_up() {
        let out = moving_mean(&[1.0, 2.0, 3.0, 4.0, 5.0], Window::new(3, 2).unwrap());
        assert_close(&out, &[f64::NAN, 1.5, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_missing_values_do_not_count_toward_min_periods() {
        let out = moving_mean(&[1.0, f64::NAN, 3.0, f64::NAN], Window::new(2, 2).unwrap());
        assert_close(&out, &[f64::NAN, f64::NAN, f64::NAN, f64::NAN]);

        let out = moving_mean(&[1.0, f64::NAN, 3.0, f64::NAN], Window::new(3, 2).unwrap());
        assert_close(&out, &[f64::NAN, f64::NAN, 2.0, f64::NAN]);
    }

    #[test]
    fn test_moving_mean_stays_accurate_over_long_sequences() {
        let seq = (0..100_000)
            .map(|i| 700.0 + f64::from(i % 7) * 13.0)
            .collect::<Vec<_>>();
        let out = moving_mean(&seq, Window::new(1000, 100).unwrap());
        let last = &seq[seq.len() - 1000..];
        let expected = last.iter().sum::<f64>() / 1000.0;
        assert!((out[out.len() - 1] - expected).abs() < 1e-6);
    }

    #[test]
    fn test_moving_std_matches_sample_std() {
        let out = moving_std(&[2.0, 4.0, 4.0, 4.0, 5.0], Window::new(3, 2).unwrap());
        let expected_last = {
            let m = 13.0 / 3.0;
            let ss = (4.0_f64 - m).powi(2) * 2.0 + (5.0_f64 - m).powi(2);
            (ss / 2.0).sqrt()
        };
        assert!(out[0].is_nan());
        assert!((out[1] - 2.0_f64.sqrt()).abs() < 1e-9);
        assert!((out[4] - expected_last).abs() < 1e-9);
    }

    #[test]
    fn test_success_rate_boundary_is_inclusive() {
        let window = Window::warm(1).unwrap();
        assert_eq!(success_rate(&[0.10], 10.0, window), vec![100.0]);
        assert_eq!(success_rate(&[-0.10], 10.0, window), vec![100.0]);
        assert_eq!(success_rate(&[0.100_000_1], 10.0, window), vec![0.0]);
        assert_eq!(success_rate(&[-0.100_000_1], 10.0, window), vec![0.0]);
    }

    #[test]
    fn test_success_rate_skips_missing() {
        let out = success_rate(&[0.0, f64::NAN, 0.5], 10.0, Window::warm(3).unwrap());
        assert_close(&out, &[100.0, 100.0, 50.0]);
    }

    #[test]
    fn test_cv_zero_mean_is_missing_not_infinite() {
        let out = coefficient_of_variation(&[-1.0, 1.0, -1.0, 1.0], Window::new(2, 2).unwrap(), 1)
            .unwrap();
        assert!(out.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_cv_smoothing() {
        let seq = [10.0, 12.0, 10.0, 14.0];
        let window = Window::new(2, 2).unwrap();
        let raw = coefficient_of_variation(&seq, window, 1).unwrap();
        let smoothed = coefficient_of_variation(&seq, window, 2).unwrap();
        assert!(raw[0].is_nan());
        // first smoothed value only sees one ratio
        assert!((smoothed[1] - raw[1]).abs() < 1e-12);
        assert!((smoothed[2] - (raw[1] + raw[2]) / 2.0).abs() < 1e-12);
        assert!((smoothed[3] - (raw[2] + raw[3]) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_cv_rejects_zero_smoothing() {
        assert_eq!(
            coefficient_of_variation(&[1.0], Window::warm(1).unwrap(), 0),
            Err(WindowError::ZeroLength)
        );
    }
}

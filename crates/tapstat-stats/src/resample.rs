//! Length normalization of ordered sequences
//!
//! Two complementary strategies bring a sequence of length `L` to a target
//! length `T` while keeping its temporal order:
//!
//! - [`interpolate_linear`] stretches a short sequence (`L < T`) by sampling
//!   a piecewise-linear curve through the original points.
//! - [`subsample`] shrinks a long sequence (`L >= T`) by drawing `T` distinct
//!   positions uniformly at random and keeping them in their original order.
//!
//! Random subsampling is preferred over truncation because truncation always
//! drops the tail of a sequence.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Range of source positions covered by [`interpolate_linear`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationSpan {
    /// Sample over `[0, L - 2]`, leaving the last source point unused.
    #[default]
    ExcludeLast,
    /// Sample over `[0, L - 1]`.
    Full,
}

impl InterpolationSpan {
    #[expect(clippy::cast_precision_loss)]
    fn upper(self, len: usize) -> f64 {
        let upper = match self {
            Self::ExcludeLast => len.saturating_sub(2),
            Self::Full => len.saturating_sub(1),
        };
        upper as f64
    }
}

/// Samples `target_len` evenly spaced points of the piecewise-linear curve
/// through `values` (x = source index).
///
/// Returns an empty vector if `values` is empty.
///
/// # Examples
///
/// ```
/// use tapstat_stats::resample::{InterpolationSpan, interpolate_linear};
///
/// let out = interpolate_linear(&[0.0, 10.0, 20.0], 5, InterpolationSpan::Full);
/// assert_eq!(out, vec![0.0, 5.0, 10.0, 15.0, 20.0]);
/// ```
#[expect(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
#[must_use]
pub fn interpolate_linear(values: &[f64], target_len: usize, span: InterpolationSpan) -> Vec<f64> {
    if values.is_empty() || target_len == 0 {
        return vec![];
    }
    let upper = span.upper(values.len());
    let step = if target_len > 1 {
        upper / (target_len - 1) as f64
    } else {
        0.0
    };

    (0..target_len)
        .map(|j| {
            // pin the last sample to the end of the span
            let x = if j + 1 == target_len {
                upper
            } else {
                j as f64 * step
            };
            let i = (x.floor() as usize).min(values.len() - 1);
            let frac = x - i as f64;
            match values.get(i + 1) {
                Some(next) if frac > 0.0 => values[i] + frac * (next - values[i]),
                _ => values[i],
            }
        })
        .collect()
}

/// Draws `target_len` distinct positions of `values` uniformly without
/// replacement and returns them in their original order.
///
/// If `target_len >= values.len()` the input is returned unchanged.
///
/// ```
/// use rand::SeedableRng as _;
/// use rand_pcg::Pcg64;
/// use tapstat_stats::resample::subsample;
///
/// let mut rng = Pcg64::seed_from_u64(7);
/// let values = (0..100).map(f64::from).collect::<Vec<_>>();
/// let picked = subsample(&values, 10, &mut rng);
/// assert_eq!(picked.len(), 10);
/// assert!(picked.is_sorted());
/// ```
#[must_use]
pub fn subsample<R>(values: &[f64], target_len: usize, rng: &mut R) -> Vec<f64>
where
    R: Rng + ?Sized,
{
    if target_len >= values.len() {
        return values.to_vec();
    }
    let mut picked = rand::seq::index::sample(rng, values.len(), target_len).into_vec();
    picked.sort_unstable();
    picked.into_iter().map(|i| values[i]).collect()
}

/// Resamples `values` to exactly `target_len` points.
///
/// Interpolates when the sequence is shorter than the target and subsamples
/// otherwise, so a sequence already of the target length is returned as is.
#[must_use]
pub fn resample<R>(
    values: &[f64],
    target_len: usize,
    span: InterpolationSpan,
    rng: &mut R,
) -> Vec<f64>
where
    R: Rng + ?Sized,
{
    if values.len() < target_len {
        interpolate_linear(values, target_len, span)
    } else {
        subsample(values, target_len, rng)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64;

    use super::*;

    #[test]
    fn test_resample_same_length_is_identity() {
        let mut rng = Pcg64::seed_from_u64(1);
        let values = [5.0, 1.0, 4.0, 2.0, 3.0];
        let out = resample(&values, values.len(), InterpolationSpan::default(), &mut rng);
        assert_eq!(out, values);
    }

    #[test]
    fn test_interpolation_stays_within_monotone_range() {
        let values = (0..10).map(|i| f64::from(i) * 3.0 + 1.0).collect::<Vec<_>>();
        let out = interpolate_linear(&values, 20, InterpolationSpan::ExcludeLast);
        assert_eq!(out.len(), 20);
        assert!((out[0] - values[0]).abs() < 1e-9);
        // the default span ends at the second-to-last source point
        assert!((out[19] - values[8]).abs() < 1e-9);
        assert!(out.is_sorted());
        assert!(out.iter().all(|v| (values[0]..=values[9]).contains(v)));
    }

    #[test]
    fn test_interpolation_full_span_reaches_last_point() {
        let values = [2.0, 4.0, 8.0];
        let out = interpolate_linear(&values, 7, InterpolationSpan::Full);
        assert_eq!(out.first(), Some(&2.0));
        assert_eq!(out.last(), Some(&8.0));
    }

    #[test]
    fn test_interpolation_degenerate_inputs() {
        assert!(interpolate_linear(&[], 4, InterpolationSpan::Full).is_empty());
        assert_eq!(
            interpolate_linear(&[3.0], 3, InterpolationSpan::ExcludeLast),
            vec![3.0, 3.0, 3.0]
        );
        assert_eq!(
            interpolate_linear(&[1.0, 2.0], 1, InterpolationSpan::Full),
            vec![2.0]
        );
    }

    #[test]
    fn test_subsample_keeps_distinct_ordered_elements() {
        let mut rng = Pcg64::seed_from_u64(42);
        let values = (0..1000).map(f64::from).collect::<Vec<_>>();
        let out = subsample(&values, 250, &mut rng);
        assert_eq!(out.len(), 250);
        assert!(out.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_subsample_is_reproducible_with_seed() {
        let values = (0..500).map(f64::from).collect::<Vec<_>>();
        let a = subsample(&values, 50, &mut Pcg64::seed_from_u64(9));
        let b = subsample(&values, 50, &mut Pcg64::seed_from_u64(9));
        assert_eq!(a, b);
    }
}

use serde::Serialize;

/// Descriptive statistics summarizing a dataset.
///
/// Missing values (`NaN`) are skipped, so the statistics describe only the
/// observed values of a sequence.
#[derive(Debug, Clone, Serialize)]
pub struct DescriptiveStats {
    /// Number of non-missing values.
    pub count: usize,
    /// The minimum value in the dataset.
    pub min: f64,
    /// The maximum value in the dataset.
    pub max: f64,
    /// The arithmetic mean (average) of the dataset.
    pub mean: f64,
    /// The median value of the dataset (mean of the two middle values for even counts).
    pub median: f64,
    /// The sample standard deviation (`n - 1` denominator).
    ///
    /// `NaN` when fewer than two values are present.
    pub std_dev: f64,
}

impl DescriptiveStats {
    /// Computes descriptive statistics from unsorted values.
    ///
    /// # Returns
    ///
    /// * `Some(DescriptiveStats)` - if the dataset contains at least one non-missing value
    /// * `None` - if the dataset is empty or entirely missing
    ///
    /// # Examples
    ///
    /// ```
    /// # use tapstat_stats::descriptive::DescriptiveStats;
    /// let values = [5.0, 2.0, f64::NAN, 4.0, 1.0, 3.0];
    /// let stats = DescriptiveStats::new(values).unwrap();
    /// assert_eq!(stats.count, 5);
    /// assert_eq!(stats.min, 1.0);
    /// assert_eq!(stats.max, 5.0);
    /// assert_eq!(stats.mean, 3.0);
    /// assert_eq!(stats.median, 3.0);
    /// ```
    #[must_use]
    pub fn new<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut values = values
            .into_iter()
            .filter(|v| !v.is_nan())
            .collect::<Vec<_>>();
        values.sort_by(f64::total_cmp);
        Self::from_sorted(&values)
    }

    /// Computes descriptive statistics from pre-sorted, non-missing values.
    ///
    /// # Panics
    ///
    /// Panics if `sorted_values` is not sorted in ascending order.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_sorted(sorted_values: &[f64]) -> Option<Self> {
        assert!(
            sorted_values.is_sorted_by(|a, b| a <= b),
            "values must be sorted in ascending order"
        );

        let min = *sorted_values.first()?;
        let max = *sorted_values.last()?;
        let count = sorted_values.len();
        let n = count as f64;
        let mean = sorted_values.iter().sum::<f64>() / n;
        let median = median_of_sorted(sorted_values);
        let std_dev = if count < 2 {
            f64::NAN
        } else {
            let sum_sq = sorted_values
                .iter()
                .map(|v| (v - mean).powi(2))
                .sum::<f64>();
            (sum_sq / (n - 1.0)).sqrt()
        };

        Some(Self {
            count,
            min,
            max,
            mean,
            median,
            std_dev,
        })
    }

    /// Coefficient of variation (`std_dev / mean`).
    ///
    /// `NaN` when the mean is zero or the deviation is undefined.
    #[must_use]
    pub fn variation(&self) -> f64 {
        ratio_or_nan(self.std_dev, self.mean)
    }
}

/// A named summary statistic over a sequence with missing values.
///
/// Used wherever the caller picks the statistic at runtime: per-session
/// summary columns, chunked series, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, derive_more::FromStr, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    #[display("mean")]
    Mean,
    #[display("median")]
    Median,
    #[display("min")]
    Min,
    #[display("max")]
    Max,
    #[display("std")]
    Std,
    /// Coefficient of variation.
    #[display("cv")]
    Cv,
}

impl Statistic {
    /// Applies the statistic, ignoring missing values.
    ///
    /// Returns `NaN` when no value is present.
    ///
    /// ```
    /// # use tapstat_stats::descriptive::Statistic;
    /// assert_eq!(Statistic::Max.apply(&[1.0, f64::NAN, 4.0]), 4.0);
    /// assert!(Statistic::Mean.apply(&[f64::NAN]).is_nan());
    /// ```
    #[must_use]
    pub fn apply(self, values: &[f64]) -> f64 {
        let Some(stats) = DescriptiveStats::new(values.iter().copied()) else {
            return f64::NAN;
        };
        match self {
            Self::Mean => stats.mean,
            Self::Median => stats.median,
            Self::Min => stats.min,
            Self::Max => stats.max,
            Self::Std => stats.std_dev,
            Self::Cv => stats.variation(),
        }
    }
}

/// Median of pre-sorted values; `NaN` for an empty slice.
#[must_use]
pub fn median_of_sorted(sorted_values: &[f64]) -> f64 {
    let n = sorted_values.len();
    match n {
        0 => f64::NAN,
        _ if n % 2 == 1 => sorted_values[n / 2],
        _ => f64::midpoint(sorted_values[n / 2 - 1], sorted_values[n / 2]),
    }
}

/// `numerator / denominator`, or `NaN` if the denominator is zero or missing.
#[must_use]
pub fn ratio_or_nan(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || denominator.is_nan() || numerator.is_nan() {
        f64::NAN
    } else {
        numerator / denominator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_all_missing() {
        assert!(DescriptiveStats::new([]).is_none());
        assert!(DescriptiveStats::new([f64::NAN, f64::NAN]).is_none());
    }

    #[test]
    fn test_even_median_averages_middle_values() {
        let stats = DescriptiveStats::new([4.0, 1.0, 3.0, 2.0]).unwrap();
        assert!((stats.median - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_sample_std_dev() {
        let stats = DescriptiveStats::new([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        // population std is 2.0; sample std is sqrt(32 / 7)
        assert!((stats.std_dev - (32.0_f64 / 7.0).sqrt()).abs() < 1e-12);
        assert!(DescriptiveStats::new([1.0]).unwrap().std_dev.is_nan());
    }

    #[test]
    fn test_variation_with_zero_mean_is_missing() {
        let stats = DescriptiveStats::new([-1.0, 1.0]).unwrap();
        assert!(stats.variation().is_nan());
    }

    #[test]
    fn test_statistic_from_str() {
        assert_eq!("Mean".parse::<Statistic>().unwrap(), Statistic::Mean);
        assert_eq!("std".parse::<Statistic>().unwrap(), Statistic::Std);
        assert!("mode".parse::<Statistic>().is_err());
        assert_eq!(Statistic::Cv.to_string(), "cv");
    }
}

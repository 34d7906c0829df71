//! Windowed statistics over group averages
//!
//! A group metric aligns one column of every subject at a condition, averages
//! it across subjects and then applies a trailing window to the average:
//!
//! | metric        | averaged column | windowed statistic                          |
//! |---------------|-----------------|---------------------------------------------|
//! | `<column>`    | `<column>`      | moving mean                                 |
//! | `success`     | `loss`          | success rate within `±error_pct` percent    |
//! | `cv`          | `interval`      | smoothed coefficient of variation           |

use std::{convert::Infallible, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use tapstat_records::table::{INTERVAL, LOSS};
use tapstat_stats::{
    descriptive::ratio_or_nan,
    window::{Window, WindowError, coefficient_of_variation, moving_mean, success_rate},
};

use crate::{
    AnalysisError,
    align::{AlignOptions, align},
    average::{Cut, GroupAverage},
    group::ConditionGroup,
    subject::Cohort,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Moving mean of a numeric trial column.
    Column(String),
    /// Moving success rate of the averaged loss.
    Success,
    /// Smoothed moving coefficient of variation of the averaged interval.
    Cv,
}

impl Metric {
    /// Trial column that is averaged across subjects.
    #[must_use]
    pub fn source_column(&self) -> &str {
        match self {
            Self::Column(name) => name,
            Self::Success => LOSS,
            Self::Cv => INTERVAL,
        }
    }
}

impl FromStr for Metric {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "success" => Self::Success,
            "cv" => Self::Cv,
            column => Self::Column(column.to_owned()),
        })
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column(name) => f.write_str(name),
            Self::Success => f.write_str("success"),
            Self::Cv => f.write_str("cv"),
        }
    }
}

/// Window settings shared by the group metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricOptions {
    pub window_len: usize,
    pub min_periods: usize,
    /// Success band in whole percent.
    pub error_pct: f64,
    /// Width of the moving mean that smooths the CV ratio.
    pub smoothing_len: usize,
    pub align: AlignOptions,
}

impl Default for MetricOptions {
    fn default() -> Self {
        Self {
            window_len: 1000,
            min_periods: 100,
            error_pct: 10.0,
            smoothing_len: 300,
            align: AlignOptions::default(),
        }
    }
}

impl MetricOptions {
    pub fn window(&self) -> Result<Window, WindowError> {
        Window::new(self.window_len, self.min_periods)
    }
}

/// A windowed statistic of one condition's group average.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSeries {
    pub target: f64,
    pub metric: String,
    pub subjects: Vec<String>,
    pub reference_len: usize,
    pub cuts: Vec<Cut>,
    pub values: Vec<f64>,
}

/// Averages `metric`'s source column at `target` and applies the window.
///
/// # Arguments
///
/// * `cohort` - Subjects to average
/// * `target` - Condition to select sessions by
/// * `metric` - Column or derived metric to compute
/// * `options` - Window, success band and alignment settings
///
/// # Errors
///
/// Returns [`AnalysisError::EmptyGroup`] when no subject has trials at the
/// target, and a table error when the source column is missing.
pub fn group_metric(
    cohort: &Cohort,
    target: f64,
    metric: &Metric,
    options: &MetricOptions,
) -> Result<GroupSeries, AnalysisError> {
    let window = options.window()?;
    let average = group_average(cohort, target, metric.source_column(), &options.align)?;
    let values = match metric {
        Metric::Column(_) => moving_mean(&average.mean, window),
        Metric::Success => success_rate(&average.mean, options.error_pct, window),
        Metric::Cv => coefficient_of_variation(&average.mean, window, options.smoothing_len)?,
    };
    log::debug!(
        "{metric} at {target}: {} subjects, reference length {}",
        average.subjects.len(),
        average.reference_len
    );
    Ok(GroupSeries {
        target,
        metric: metric.to_string(),
        subjects: average.subjects,
        reference_len: average.reference_len,
        cuts: average.cuts,
        values,
    })
}

/// Collects, aligns and averages one column at a condition.
pub fn group_average(
    cohort: &Cohort,
    target: f64,
    column: &str,
    options: &AlignOptions,
) -> Result<GroupAverage, AnalysisError> {
    let group = ConditionGroup::collect(cohort, target, column)?;
    let aligned = align(&group, options)?;
    Ok(GroupAverage::new(&aligned))
}

/// Difference of moving means between two conditions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Delta {
    pub from_target: f64,
    pub to_target: f64,
    pub column: String,
    pub normalized: bool,
    pub values: Vec<f64>,
}

/// Moving-mean difference `to - from` of `column` between two conditions.
///
/// Both moving means are truncated to the shorter of the two. With
/// `normalize` every difference is divided by `to_target - from_target`,
/// which gives missing values when the targets are equal.
///
/// # Errors
///
/// Returns [`AnalysisError::EmptyGroup`] when either condition has no
/// usable series.
pub fn delta_between(
    cohort: &Cohort,
    from_target: f64,
    to_target: f64,
    column: &str,
    options: &MetricOptions,
    normalize: bool,
) -> Result<Delta, AnalysisError> {
    let window = options.window()?;
    let from = group_average(cohort, from_target, column, &options.align)?;
    let to = group_average(cohort, to_target, column, &options.align)?;
    let from = moving_mean(&from.mean, window);
    let to = moving_mean(&to.mean, window);

    let len = from.len().min(to.len());
    if len == 0 {
        return Err(AnalysisError::EmptyGroup {
            target: if from.is_empty() { from_target } else { to_target },
        });
    }
    if from.len() != to.len() {
        log::debug!(
            "truncating delta of {column} to {len} trials ({} vs {})",
            from.len(),
            to.len()
        );
    }
    let scale = to_target - from_target;
    let values = from
        .iter()
        .zip(&to)
        .map(|(a, b)| {
            let diff = b - a;
            if normalize { ratio_or_nan(diff, scale) } else { diff }
        })
        .collect();
    Ok(Delta {
        from_target,
        to_target,
        column: column.to_owned(),
        normalized: normalize,
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert_eq!("success".parse::<Metric>().unwrap(), Metric::Success);
        assert_eq!("cv".parse::<Metric>().unwrap(), Metric::Cv);
        let column = "tap_1_len".parse::<Metric>().unwrap();
        assert_eq!(column.source_column(), "tap_1_len");
        assert_eq!(column.to_string(), "tap_1_len");
        assert_eq!(Metric::Success.source_column(), LOSS);
        assert_eq!(Metric::Cv.source_column(), INTERVAL);
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: MetricOptions =
            serde_json::from_str(r#"{"window_len": 50, "align": {"reference": "maximum"}}"#).unwrap();
        assert_eq!(options.window_len, 50);
        assert_eq!(options.min_periods, 100);
        assert_eq!(options.align.min_session_len, 50);
        // min_periods may not exceed the window
        assert!(options.window().is_err());
    }
}

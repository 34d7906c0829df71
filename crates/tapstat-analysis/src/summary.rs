//! Tabular summaries of a condition
//!
//! - [`tail_summary`]: performance over each subject's last trials
//! - [`chunk_summary`]: a statistic per fixed-size chunk, averaged across subjects

use serde::Serialize;
use tapstat_records::table::{INTERVAL, LOSS};
use tapstat_stats::{
    chunk::RemainderPolicy,
    descriptive::{DescriptiveStats, Statistic},
    fit::LinearFit,
    window::within_error,
};

use crate::{
    AnalysisError,
    align::{AlignedSeries, align_chunks},
    average::{Cut, GroupAverage},
    group::ConditionGroup,
    subject::Cohort,
};

/// One subject's performance over its last trials at a condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectTail {
    pub subject: String,
    /// Trials summarised; fewer than requested when the subject ran fewer.
    pub trials: usize,
    pub mean_interval: f64,
    /// Coefficient of variation of the interval.
    pub cv: f64,
    /// Percentage of trials whose loss lies within the error band.
    pub success_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TailSummary {
    pub target: f64,
    pub last_n: usize,
    pub error_pct: f64,
    pub subjects: Vec<SubjectTail>,
    pub mean_interval: f64,
    pub cv: f64,
    pub success_pct: f64,
}

/// Summarises the last `last_n` trials of every subject at `target`.
///
/// Subjects without trials at the target are left out; the group values are
/// the unweighted means over the remaining subjects.
pub fn tail_summary(
    cohort: &Cohort,
    target: f64,
    last_n: usize,
    error_pct: f64,
) -> Result<TailSummary, AnalysisError> {
    let mut subjects = vec![];
    for subject in cohort.subjects() {
        let selection = subject
            .table
            .trials_for_target(target)
            .map_err(subject.table_error())?;
        if selection.is_empty() {
            log::debug!("{}: no trials at target {target}", subject.name);
            continue;
        }
        let intervals = selection.numeric(INTERVAL).map_err(subject.table_error())?;
        let losses = selection.numeric(LOSS).map_err(subject.table_error())?;
        let start = selection.len().saturating_sub(last_n);
        let stats = DescriptiveStats::new(intervals[start..].iter().copied());
        subjects.push(SubjectTail {
            subject: subject.name.clone(),
            trials: selection.len() - start,
            mean_interval: stats.as_ref().map_or(f64::NAN, |s| s.mean),
            cv: stats.as_ref().map_or(f64::NAN, DescriptiveStats::variation),
            success_pct: success_pct(&losses[start..], error_pct),
        });
    }
    if subjects.is_empty() {
        return Err(AnalysisError::EmptyGroup { target });
    }

    let group_mean = |f: fn(&SubjectTail) -> f64| {
        Statistic::Mean.apply(&subjects.iter().map(f).collect::<Vec<_>>())
    };
    Ok(TailSummary {
        target,
        last_n,
        error_pct,
        mean_interval: group_mean(|s| s.mean_interval),
        cv: group_mean(|s| s.cv),
        success_pct: group_mean(|s| s.success_pct),
        subjects,
    })
}

#[expect(clippy::cast_precision_loss)]
fn success_pct(losses: &[f64], error_pct: f64) -> f64 {
    let observed = losses.iter().filter(|v| !v.is_nan());
    let total = observed.clone().count();
    if total == 0 {
        return f64::NAN;
    }
    let hits = observed.filter(|&&v| within_error(v, error_pct)).count();
    100.0 * hits as f64 / total as f64
}

/// A chunked statistic per subject and its across-subject average.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkSummary {
    pub target: f64,
    pub column: String,
    pub chunk_len: usize,
    pub stat: Statistic,
    /// Per-subject chunk values, padded with missing values to the longest.
    pub series: Vec<AlignedSeries>,
    pub mean: Vec<f64>,
    /// Tier boundaries in chunk units.
    pub cuts: Vec<Cut>,
    /// Least-squares trend of the mean over chunk index.
    pub trend: Option<LinearFit>,
}

/// Applies `stat` to consecutive chunks of `chunk_len` trials of every
/// subject at `target` and averages the chunk series.
///
/// # Errors
///
/// Returns [`AnalysisError::ZeroChunkLength`] for a zero chunk length and
/// [`AnalysisError::EmptyGroup`] when no subject fills a single chunk.
pub fn chunk_summary(
    cohort: &Cohort,
    target: f64,
    column: &str,
    chunk_len: usize,
    stat: Statistic,
    policy: RemainderPolicy,
) -> Result<ChunkSummary, AnalysisError> {
    if chunk_len == 0 {
        return Err(AnalysisError::ZeroChunkLength);
    }
    let group = ConditionGroup::collect(cohort, target, column)?;
    let aligned = align_chunks(&group, chunk_len, policy, stat)?;
    let average = GroupAverage::new(&aligned);
    Ok(ChunkSummary {
        target,
        column: column.to_owned(),
        chunk_len,
        stat,
        trend: LinearFit::over_index(&average.mean),
        mean: average.mean,
        cuts: average.cuts,
        series: aligned.series,
    })
}

//! Cross-subject aggregation of interval-timing trials
//!
//! This crate combines the record tables of several subjects into one
//! reference series per experimental condition (session target) and computes
//! windowed statistics over it.
//!
//! # Overview
//!
//! ## Averaging Workflow
//!
//! 1. **Collect Subjects** ([`subject::Cohort`]): one [`RecordTable`] per subject
//! 2. **Group by Condition** ([`group::ConditionGroup`]): every subject's trials at
//!    one target, split by session
//! 3. **Align Lengths** ([`align::align`]): truncate, pad or resample each subject to
//!    a common reference length
//! 4. **Average** ([`average::GroupAverage`]): per-position mean plus cut tiers that
//!    record where subjects stop contributing
//! 5. **Apply Windows** ([`metrics::group_metric`]): moving mean, success rate or
//!    coefficient of variation of the average
//!
//! ## Summaries
//!
//! - [`metrics::delta_between`]: moving-mean difference between two conditions
//! - [`summary::tail_summary`]: interval, CV and success over each subject's last trials
//! - [`summary::chunk_summary`]: a statistic per fixed-size chunk with a linear trend
//!
//! # Examples
//!
//! ```
//! use tapstat_analysis::{
//!     metrics::{Metric, MetricOptions, group_metric},
//!     subject::{Cohort, Subject},
//! };
//! use tapstat_records::{frame::Frame, table::RecordTable, value::Value};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//!
//! // one session at a 700 ms target
//! let subject = |name: &str, intervals: &[f64]| -> Result<Subject, Box<dyn std::error::Error>> {
//!     let n = intervals.len();
//!     let trials = Frame::from_columns([
//!         ("session_id".to_owned(), vec![Value::Int(1); n]),
//!         ("position_in_session".to_owned(), (1..=n as i64).map(Value::Int).collect()),
//!         ("interval".to_owned(), intervals.iter().copied().map(Value::Float).collect()),
//!     ])?;
//!     let sessions = Frame::from_columns([
//!         ("session_id".to_owned(), vec![Value::Int(1)]),
//!         ("target".to_owned(), vec![Value::Int(700)]),
//!     ])?;
//!     Ok(Subject::new(name, RecordTable::new(trials, sessions)?))
//! };
//! let cohort = Cohort::new(vec![
//!     subject("a", &[600.0, 700.0, 800.0])?,
//!     subject("b", &[800.0, 900.0])?,
//! ]);
//!
//! let options = MetricOptions { window_len: 1, min_periods: 1, ..MetricOptions::default() };
//! let series = group_metric(&cohort, 700.0, &Metric::Column("interval".into()), &options)?;
//! // the shortest subject sets the reference length
//! assert_eq!(series.values, [700.0, 800.0]);
//! # Ok(())
//! # }
//! ```
//!
//! [`RecordTable`]: tapstat_records::table::RecordTable

use tapstat_records::table::TableError;
use tapstat_stats::window::WindowError;

pub mod align;
pub mod average;
pub mod group;
pub mod metrics;
pub mod subject;
pub mod summary;

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum AnalysisError {
    #[display("no subject has usable trials at target {target}")]
    EmptyGroup { target: f64 },
    #[display("subject '{subject}': {source}")]
    Table { subject: String, source: TableError },
    #[display("{_0}")]
    Window(WindowError),
    #[display("chunk length must be at least 1")]
    ZeroChunkLength,
    #[display("fixed reference length must be at least 1")]
    ZeroReferenceLength,
}

impl From<WindowError> for AnalysisError {
    fn from(err: WindowError) -> Self {
        Self::Window(err)
    }
}

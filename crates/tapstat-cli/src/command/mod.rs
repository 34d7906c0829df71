use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tapstat_analysis::{
    align::{ReferenceLength, Truncation},
    subject::Cohort,
};
use tapstat_stats::resample::InterpolationSpan;

use crate::{
    config::AnalysisConfig,
    util::{self, SubjectSource},
};

use self::{
    average::AverageArg, chunks::ChunksArg, delta::DeltaArg, edit::EditArg, overview::OverviewArg,
    query::QueryArg, sessions::SessionsArg, tail::TailArg,
};

mod average;
mod chunks;
mod delta;
mod edit;
mod overview;
mod query;
mod sessions;
mod tail;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// What analysis to run
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Print sessions, trials and conditions of every subject
    Overview(#[clap(flatten)] OverviewArg),
    /// Filter one subject's trials or sessions by a condition
    Query(#[clap(flatten)] QueryArg),
    /// Windowed statistic of the cross-subject average at a target
    Average(#[clap(flatten)] AverageArg),
    /// Moving-mean difference between two targets
    Delta(#[clap(flatten)] DeltaArg),
    /// Interval, CV and success over each subject's last trials
    Tail(#[clap(flatten)] TailArg),
    /// Statistic per fixed-size chunk, averaged across subjects
    Chunks(#[clap(flatten)] ChunksArg),
    /// Per-session success rate of one subject
    Sessions(#[clap(flatten)] SessionsArg),
    /// Edit one subject's records and overwrite its CSV files
    Edit(#[clap(flatten)] EditArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::Overview(arg) => overview::run(&arg)?,
        Mode::Query(arg) => query::run(&arg)?,
        Mode::Average(arg) => average::run(&arg)?,
        Mode::Delta(arg) => delta::run(&arg)?,
        Mode::Tail(arg) => tail::run(&arg)?,
        Mode::Chunks(arg) => chunks::run(&arg)?,
        Mode::Sessions(arg) => sessions::run(&arg)?,
        Mode::Edit(arg) => edit::run(&arg)?,
    }
    Ok(())
}

/// Subjects to load plus the shared config file
#[derive(Debug, Clone, Args)]
pub(crate) struct CohortArg {
    /// Subject as NAME=TRIALS.csv,SESSIONS.csv[,LAST_SESSION] (repeatable)
    #[arg(long = "subject", required = true)]
    pub subjects: Vec<SubjectSource>,

    /// JSON analysis config; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl CohortArg {
    pub fn load(&self) -> anyhow::Result<(AnalysisConfig, Cohort)> {
        let config = AnalysisConfig::load(self.config.as_deref())?;
        let cohort = util::load_cohort(&self.subjects, &config.predicate_options())?;
        Ok((config, cohort))
    }
}

/// Window and alignment overrides
#[derive(Debug, Clone, Default, Args)]
pub(crate) struct WindowArg {
    /// Moving window length in trials
    #[arg(long)]
    pub window: Option<usize>,
    /// Observed values required before a window emits
    #[arg(long)]
    pub min_periods: Option<usize>,
    /// Success band in whole percent
    #[arg(long)]
    pub error: Option<f64>,
    /// Smoothing window of the CV ratio
    #[arg(long)]
    pub smoothing: Option<usize>,
    /// Reference length: minimum, median, maximum or a trial count
    #[arg(long)]
    pub reference: Option<ReferenceLength>,
    /// Side kept when truncating (start or end)
    #[arg(long)]
    pub truncation: Option<Truncation>,
    /// Interpolate over the full session instead of excluding its last trial
    #[arg(long)]
    pub full_span: bool,
    /// Sessions this short or shorter are skipped by median alignment
    #[arg(long)]
    pub min_session_len: Option<usize>,
    /// Seed of the subsampling generator
    #[arg(long)]
    pub seed: Option<u64>,
}

impl WindowArg {
    /// Overrides the config with the given flags and validates the result.
    pub fn apply(&self, config: &mut AnalysisConfig) -> anyhow::Result<()> {
        let metrics = &mut config.metrics;
        if let Some(window) = self.window {
            metrics.window_len = window;
        }
        if let Some(min_periods) = self.min_periods {
            metrics.min_periods = min_periods;
        }
        if let Some(error) = self.error {
            metrics.error_pct = error;
        }
        if let Some(smoothing) = self.smoothing {
            metrics.smoothing_len = smoothing;
        }
        if let Some(reference) = self.reference {
            metrics.align.reference = reference;
        }
        if let Some(truncation) = self.truncation {
            metrics.align.truncation = truncation;
        }
        if self.full_span {
            metrics.align.span = InterpolationSpan::Full;
        }
        if let Some(min_session_len) = self.min_session_len {
            metrics.align.min_session_len = min_session_len;
        }
        if let Some(seed) = self.seed {
            metrics.align.seed = seed;
        }
        config.validate()
    }
}

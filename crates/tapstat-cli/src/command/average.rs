use std::path::PathBuf;

use clap::Args;
use tapstat_analysis::metrics::{Metric, group_metric};

use crate::{
    command::{CohortArg, WindowArg},
    util::Output,
};

#[derive(Debug, Clone, Args)]
pub(crate) struct AverageArg {
    #[clap(flatten)]
    pub cohort: CohortArg,
    #[clap(flatten)]
    pub window: WindowArg,
    /// Session target (condition) to average
    #[arg(long)]
    pub target: f64,
    /// `success`, `cv` or the name of a numeric trial column
    #[arg(long, default_value = "interval")]
    pub metric: Metric,
    /// Output file path
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub(crate) fn run(arg: &AverageArg) -> anyhow::Result<()> {
    let (mut config, cohort) = arg.cohort.load()?;
    arg.window.apply(&mut config)?;
    let series = group_metric(&cohort, arg.target, &arg.metric, &config.metrics)?;
    log::info!(
        "{} at {}: {} subjects, {} trials",
        series.metric,
        series.target,
        series.subjects.len(),
        series.values.len()
    );
    Output::save_json(&series, arg.output.as_deref())
}

use std::path::PathBuf;

use clap::Args;
use tapstat_analysis::metrics::delta_between;

use crate::{
    command::{CohortArg, WindowArg},
    util::Output,
};

#[derive(Debug, Clone, Args)]
pub(crate) struct DeltaArg {
    #[clap(flatten)]
    cohort: CohortArg,
    #[clap(flatten)]
    window: WindowArg,
    /// Baseline target
    #[arg(long)]
    from: f64,
    /// Target compared against the baseline
    #[arg(long)]
    to: f64,
    /// Trial column to compare
    #[arg(long, default_value = "interval")]
    column: String,
    /// Divide the difference by the difference of the targets
    #[arg(long)]
    normalize: bool,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &DeltaArg) -> anyhow::Result<()> {
    let (mut config, cohort) = arg.cohort.load()?;
    arg.window.apply(&mut config)?;
    let delta = delta_between(
        &cohort,
        arg.from,
        arg.to,
        &arg.column,
        &config.metrics,
        arg.normalize,
    )?;
    Output::save_json(&delta, arg.output.as_deref())
}

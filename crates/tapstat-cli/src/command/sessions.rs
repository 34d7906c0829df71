use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use crate::{command::CohortArg, util::Output};

#[derive(Debug, Clone, Args)]
pub(crate) struct SessionsArg {
    #[clap(flatten)]
    cohort: CohortArg,
    /// Subject to report (defaults to the first one)
    #[arg(long)]
    name: Option<String>,
    /// Success band in whole percent [default: config `metrics.error_pct`]
    #[arg(long)]
    error: Option<f64>,
    /// Sessions in the moving average [default: config `session_window`]
    #[arg(long)]
    window: Option<usize>,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &SessionsArg) -> anyhow::Result<()> {
    let (config, cohort) = arg.cohort.load()?;
    let subject = match &arg.name {
        Some(name) => cohort
            .get(name)
            .with_context(|| format!("Subject '{name}' was not given"))?,
        None => cohort.subjects().first().context("No subject given")?,
    };
    let success = subject.table.session_success(
        arg.error.unwrap_or(config.metrics.error_pct),
        arg.window.unwrap_or(config.session_window),
    )?;
    Output::save_json(&success, arg.output.as_deref())
}

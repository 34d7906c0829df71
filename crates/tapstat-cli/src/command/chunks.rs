use std::path::PathBuf;

use clap::Args;
use tapstat_analysis::summary::chunk_summary;
use tapstat_stats::{chunk::RemainderPolicy, descriptive::Statistic};

use crate::{command::CohortArg, util::Output};

#[derive(Debug, Clone, Args)]
pub(crate) struct ChunksArg {
    #[clap(flatten)]
    cohort: CohortArg,
    #[arg(long)]
    target: f64,
    /// Trial column to chunk
    #[arg(long, default_value = "interval")]
    column: String,
    /// Trials per chunk [default: config `chunk_len`]
    #[arg(long)]
    chunk_len: Option<usize>,
    /// Statistic per chunk: mean, median, min, max, std or cv
    #[arg(long, default_value = "mean")]
    stat: Statistic,
    /// Handling of a trailing partial chunk: round, keep or drop
    #[arg(long, default_value = "round")]
    remainder: RemainderPolicy,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &ChunksArg) -> anyhow::Result<()> {
    let (config, cohort) = arg.cohort.load()?;
    let chunk_len = arg.chunk_len.unwrap_or(config.chunk_len);
    let summary = chunk_summary(
        &cohort,
        arg.target,
        &arg.column,
        chunk_len,
        arg.stat,
        arg.remainder,
    )?;
    if let Some(trend) = &summary.trend {
        log::info!(
            "{} {} per {chunk_len} trials: slope {:.3} per chunk",
            arg.stat,
            arg.column,
            trend.slope
        );
    }
    Output::save_json(&summary, arg.output.as_deref())
}

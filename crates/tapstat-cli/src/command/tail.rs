use std::path::PathBuf;

use clap::Args;
use tapstat_analysis::summary::tail_summary;

use crate::{command::CohortArg, util::Output};

#[derive(Debug, Clone, Args)]
pub(crate) struct TailArg {
    #[clap(flatten)]
    cohort: CohortArg,
    #[arg(long)]
    target: f64,
    /// Trials per subject to summarise [default: config `tail_len`]
    #[arg(long)]
    last: Option<usize>,
    /// Success band in whole percent [default: config `metrics.error_pct`]
    #[arg(long)]
    error: Option<f64>,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &TailArg) -> anyhow::Result<()> {
    let (config, cohort) = arg.cohort.load()?;
    let last_n = arg.last.unwrap_or(config.tail_len);
    let error_pct = arg.error.unwrap_or(config.metrics.error_pct);
    let summary = tail_summary(&cohort, arg.target, last_n, error_pct)?;

    if arg.output.is_some() {
        return Output::save_json(&summary, arg.output.as_deref());
    }
    println!("Last {last_n} trials at target {} (success within ±{error_pct}%)", arg.target);
    println!("{:<16} {:>8} {:>10} {:>8} {:>10}", "subject", "trials", "interval", "cv", "success%");
    for s in &summary.subjects {
        println!(
            "{:<16} {:>8} {:>10.1} {:>8.3} {:>10.1}",
            s.subject, s.trials, s.mean_interval, s.cv, s.success_pct
        );
    }
    println!(
        "{:<16} {:>8} {:>10.1} {:>8.3} {:>10.1}",
        "mean", "", summary.mean_interval, summary.cv, summary.success_pct
    );
    Ok(())
}

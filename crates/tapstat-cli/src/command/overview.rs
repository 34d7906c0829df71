use std::path::PathBuf;

use clap::Args;

use crate::{command::CohortArg, util::Output};

#[derive(Debug, Clone, Args)]
pub(crate) struct OverviewArg {
    #[clap(flatten)]
    cohort: CohortArg,
    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,
    /// Output file path (implies --json)
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &OverviewArg) -> anyhow::Result<()> {
    let (_config, cohort) = arg.cohort.load()?;
    let overview = cohort.overview()?;
    if arg.json || arg.output.is_some() {
        return Output::save_json(&overview, arg.output.as_deref());
    }
    println!("{overview}");
    Ok(())
}

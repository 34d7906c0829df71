//! Ad-hoc filtering of one subject's records

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde::Serialize;
use tapstat_records::{
    table::{Row, TrialKey},
    value::Value,
};

use crate::{command::CohortArg, util::Output};

#[derive(Debug, Clone, Args)]
pub(crate) struct QueryArg {
    #[clap(flatten)]
    cohort: CohortArg,
    /// Subject to query (defaults to the first one)
    #[arg(long)]
    name: Option<String>,
    /// Condition over trial columns
    #[arg(long, default_value = "")]
    trials: String,
    /// Condition over session columns
    #[arg(long, default_value = "")]
    sessions: String,
    /// Emit only matching session ids
    #[arg(long, conflicts_with_all = ["trials", "column", "first"])]
    session_ids: bool,
    /// Emit one column of the matching trials instead of whole rows
    #[arg(long)]
    column: Option<String>,
    /// Emit only the first matching trial
    #[arg(long)]
    first: bool,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct ColumnOutput<'a> {
    column: &'a str,
    keys: Vec<TrialKey>,
    values: Vec<&'a Value>,
}

pub(crate) fn run(arg: &QueryArg) -> anyhow::Result<()> {
    let (_config, cohort) = arg.cohort.load()?;
    let subject = match &arg.name {
        Some(name) => cohort
            .get(name)
            .with_context(|| format!("Subject '{name}' was not given"))?,
        None => cohort.subjects().first().context("No subject given")?,
    };
    let table = &subject.table;

    if arg.session_ids {
        let ids = table.filter_sessions(&arg.sessions)?;
        log::info!("{} sessions match", ids.len());
        return Output::save_json(&ids, arg.output.as_deref());
    }

    let selection = if arg.trials.trim().is_empty() && arg.sessions.trim().is_empty() {
        table.select_all()
    } else {
        table.filter_trials(&arg.trials, &arg.sessions)?
    };
    log::info!("{} of {} trials match", selection.len(), table.len());
    if arg.first {
        return Output::save_json(&selection.first(), arg.output.as_deref());
    }
    match &arg.column {
        Some(column) => {
            let view = selection.column(column)?;
            let output = ColumnOutput {
                column,
                keys: selection.keys().collect(),
                values: view.iter().collect(),
            };
            Output::save_json(&output, arg.output.as_deref())
        }
        None => {
            let rows = (0..selection.len())
                .filter_map(|i| selection.row(i))
                .collect::<Vec<Row<'_>>>();
            Output::save_json(&rows, arg.output.as_deref())
        }
    }
}

//! In-place edits of one subject's records
//!
//! Edits are applied in a fixed order (drops, retargets, derived columns)
//! and written back only after all of them succeed.

use anyhow::{Context, bail};
use clap::Args;
use tapstat_records::value::Value;
use tapstat_stats::descriptive::Statistic;

use crate::{command::CohortArg, config::AnalysisConfig, util::SubjectSource};

#[derive(Debug, Clone, Args)]
pub(crate) struct EditArg {
    #[clap(flatten)]
    cohort: CohortArg,
    /// Subject to edit (defaults to the first one)
    #[arg(long)]
    name: Option<String>,
    /// Keep only sessions up to this id
    #[arg(long)]
    drop_after: Option<i64>,
    /// Session ids to remove (comma-separated)
    #[arg(long, value_delimiter = ',')]
    drop_session: Vec<i64>,
    /// Replace a session target, as OLD=NEW (repeatable)
    #[arg(long, value_parser = parse_retarget)]
    retarget: Vec<(Value, Value)>,
    /// Recompute `loss` from interval and target
    #[arg(long)]
    compute_loss: bool,
    /// Recompute `ratio` from tap_1_len and interval
    #[arg(long)]
    compute_ratio: bool,
    /// Add `prev_target` and `next_target` session columns
    #[arg(long)]
    neighbor_targets: bool,
    /// Add a per-session statistic column, as STAT:COLUMN (repeatable)
    #[arg(long, value_parser = parse_session_stat)]
    session_stat: Vec<(Statistic, String)>,
    /// Apply the edits without writing any file
    #[arg(long)]
    dry_run: bool,
}

fn parse_retarget(s: &str) -> Result<(Value, Value), String> {
    let (old, new) = s
        .split_once('=')
        .ok_or_else(|| format!("expected OLD=NEW, got `{s}`"))?;
    Ok((Value::parse(old), Value::parse(new)))
}

fn parse_session_stat(s: &str) -> Result<(Statistic, String), String> {
    let (stat, column) = s
        .split_once(':')
        .ok_or_else(|| format!("expected STAT:COLUMN, got `{s}`"))?;
    let stat = stat
        .parse::<Statistic>()
        .map_err(|e| format!("invalid statistic `{stat}`: {e}"))?;
    Ok((stat, column.to_owned()))
}

/// Refuses to overwrite the files of a subject whose later sessions were
/// dropped on load, unless the drop is requested explicitly.
fn check_write_back(source: &SubjectSource, drop_after: Option<i64>) -> anyhow::Result<()> {
    match source.last_session {
        Some(last) if drop_after.is_none() => bail!(
            "Subject '{}' is loaded up to session {last}; saving would delete its later sessions. \
             Pass --drop-after {last} to confirm or --dry-run to preview",
            source.name
        ),
        _ => Ok(()),
    }
}

pub(crate) fn run(arg: &EditArg) -> anyhow::Result<()> {
    let source = match &arg.name {
        Some(name) => arg
            .cohort
            .subjects
            .iter()
            .find(|s| &s.name == name)
            .with_context(|| format!("Subject '{name}' was not given"))?,
        None => arg.cohort.subjects.first().context("No subject given")?,
    };
    if !arg.dry_run {
        check_write_back(source, arg.drop_after)?;
    }
    let config = AnalysisConfig::load(arg.cohort.config.as_deref())?;
    let mut table = source.load(&config.predicate_options())?.table;

    if let Some(last) = arg.drop_after {
        table.drop_after(last)?;
    }
    if !arg.drop_session.is_empty() {
        table.drop_sessions(&arg.drop_session)?;
    }
    for (old, new) in &arg.retarget {
        let changed = table.retarget(old, new)?;
        log::info!("Retargeted {changed} sessions from {old} to {new}");
    }
    if arg.compute_loss {
        table.compute_loss()?;
    }
    if arg.compute_ratio {
        table.compute_ratio()?;
    }
    if arg.neighbor_targets {
        table.compute_neighbor_targets()?;
    }
    for (stat, column) in &arg.session_stat {
        let name = table.add_session_statistic(*stat, column)?;
        log::info!("Added session column {name}");
    }

    println!("{}: {}", source.name, table.overview()?);
    if arg.dry_run {
        log::info!("Dry run; no file written");
        return Ok(());
    }
    source.save(&table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_edit_values() {
        let (old, new) = parse_retarget("700=750").unwrap();
        assert_eq!(old, Value::Int(700));
        assert_eq!(new, Value::Int(750));
        assert!(parse_retarget("700").is_err());

        let (stat, column) = parse_session_stat("median:interval").unwrap();
        assert_eq!(stat, Statistic::Median);
        assert_eq!(column, "interval");
        assert!(parse_session_stat("mode:interval").is_err());
    }

    #[test]
    fn test_truncated_subject_needs_explicit_drop() {
        let whole = "r1=p.csv,s.csv".parse::<SubjectSource>().unwrap();
        assert!(check_write_back(&whole, None).is_ok());

        let truncated = "r1=p.csv,s.csv,40".parse::<SubjectSource>().unwrap();
        let err = check_write_back(&truncated, None).unwrap_err();
        assert!(err.to_string().contains("--drop-after 40"));
        assert!(check_write_back(&truncated, Some(40)).is_ok());
    }
}

//! Per-condition grouping of trial series across subjects

use crate::{AnalysisError, subject::Cohort};

/// One subject's trials at a condition, split by session.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberSeries {
    pub subject: String,
    /// Values of each non-empty session, in session order.
    pub sessions: Vec<Vec<f64>>,
}

impl MemberSeries {
    /// Number of trials across all sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.iter().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All sessions concatenated.
    #[must_use]
    pub fn concat(&self) -> Vec<f64> {
        self.sessions.concat()
    }
}

/// One column of every subject's trials at a single target.
///
/// Built fresh for each analysis; subjects without trials at the target are
/// kept with empty series so callers can report them.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionGroup {
    pub target: f64,
    pub column: String,
    pub members: Vec<MemberSeries>,
}

impl ConditionGroup {
    /// Collects `column` from every subject's sessions whose target equals `target`.
    ///
    /// # Arguments
    ///
    /// * `cohort` - Subjects to collect from, in output order
    /// * `target` - Condition to select sessions by
    /// * `column` - Trial column (or broadcast session column) to read
    pub fn collect(cohort: &Cohort, target: f64, column: &str) -> Result<Self, AnalysisError> {
        let members = cohort
            .subjects()
            .iter()
            .map(|subject| {
                let selection = subject
                    .table
                    .trials_for_target(target)
                    .map_err(subject.table_error())?;
                let values = selection.numeric(column).map_err(subject.table_error())?;
                let sessions = selection
                    .session_starts()
                    .into_iter()
                    .map(|span| values[span.start..span.end].to_vec())
                    .collect::<Vec<_>>();
                if sessions.is_empty() {
                    log::debug!("{}: no trials at target {target}", subject.name);
                }
                Ok(MemberSeries {
                    subject: subject.name.clone(),
                    sessions,
                })
            })
            .collect::<Result<Vec<_>, AnalysisError>>()?;
        Ok(Self {
            target,
            column: column.to_owned(),
            members,
        })
    }

    /// Members with at least one trial.
    pub fn non_empty(&self) -> impl Iterator<Item = &MemberSeries> {
        self.members.iter().filter(|m| !m.is_empty())
    }
}

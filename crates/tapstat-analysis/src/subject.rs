//! Subjects and cohorts
//!
//! A [`Subject`] is one animal's [`RecordTable`] under a display name; a
//! [`Cohort`] is the set of subjects averaged together.

use std::fmt;

use serde::Serialize;
use tapstat_records::table::{RecordTable, TableError, TableOverview};

use crate::AnalysisError;

/// One subject's records.
#[derive(Debug, Clone)]
pub struct Subject {
    pub name: String,
    pub table: RecordTable,
}

impl Subject {
    #[must_use]
    pub fn new(name: impl Into<String>, table: RecordTable) -> Self {
        Self {
            name: name.into(),
            table,
        }
    }

    /// Attaches this subject's name to a table error.
    pub(crate) fn table_error(&self) -> impl FnOnce(TableError) -> AnalysisError + '_ {
        move |source| AnalysisError::Table {
            subject: self.name.clone(),
            source,
        }
    }
}

/// Subjects analysed together, in the order they were given.
#[derive(Debug, Clone, Default)]
pub struct Cohort {
    subjects: Vec<Subject>,
}

impl Cohort {
    #[must_use]
    pub fn new(subjects: Vec<Subject>) -> Self {
        Self { subjects }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    #[must_use]
    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.name == name)
    }

    /// Targets with at least one trial in any subject, ascending.
    pub fn conditions(&self) -> Result<Vec<f64>, AnalysisError> {
        let mut conditions = vec![];
        for subject in &self.subjects {
            let overview = subject.table.overview().map_err(subject.table_error())?;
            conditions.extend(overview.conditions);
        }
        conditions.sort_by(f64::total_cmp);
        conditions.dedup();
        Ok(conditions)
    }

    /// Per-subject overviews plus cohort totals.
    pub fn overview(&self) -> Result<CohortOverview, AnalysisError> {
        let subjects = self
            .subjects
            .iter()
            .map(|subject| {
                let overview = subject.table.overview().map_err(subject.table_error())?;
                Ok(SubjectOverview {
                    name: subject.name.clone(),
                    overview,
                })
            })
            .collect::<Result<Vec<_>, AnalysisError>>()?;
        Ok(CohortOverview {
            trials: subjects.iter().map(|s| s.overview.trials).sum(),
            sessions: subjects.iter().map(|s| s.overview.sessions).sum(),
            conditions: self.conditions()?,
            subjects,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubjectOverview {
    pub name: String,
    #[serde(flatten)]
    pub overview: TableOverview,
}

#[derive(Debug, Clone, Serialize)]
pub struct CohortOverview {
    pub subjects: Vec<SubjectOverview>,
    pub sessions: usize,
    pub trials: usize,
    pub conditions: Vec<f64>,
}

impl fmt::Display for CohortOverview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for subject in &self.subjects {
            writeln!(f, "{}: {}", subject.name, subject.overview)?;
        }
        let conditions = self
            .conditions
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        write!(
            f,
            "{} subjects, {} sessions, {} trials, conditions: {}",
            self.subjects.len(),
            self.sessions,
            self.trials,
            if conditions.is_empty() {
                "none".to_owned()
            } else {
                conditions.join(", ")
            }
        )
    }
}

//! Indexed trial and session tables of one subject.
//!
//! A [`RecordTable`] owns two [`Frame`]s: one row per trial and one row per
//! session. Trials are kept sorted by `(session_id, position_in_session)` and
//! every trial is linked to its session row, so session columns can be
//! broadcast per trial without a join at query time.

use std::{
    borrow::Cow,
    collections::{BTreeMap, BTreeSet},
    fmt,
    ops::Range,
};

use serde::{Serialize, ser::SerializeMap};
use tapstat_stats::{
    descriptive::{Statistic, ratio_or_nan},
    window::{Window, WindowError, moving_mean, within_error},
};

use crate::{
    column::ColumnView,
    frame::Frame,
    predicate::{Predicate, PredicateError, PredicateOptions},
    value::Value,
};

pub const SESSION_ID: &str = "session_id";
pub const POSITION: &str = "position_in_session";
pub const TARGET: &str = "target";
pub const INTERVAL: &str = "interval";
pub const TAP_1_LEN: &str = "tap_1_len";
pub const RATIO: &str = "ratio";
pub const LOSS: &str = "loss";

const KEY_ALIASES: &[(&str, &str)] = &[(SESSION_ID, "n_sess"), (POSITION, "n_in_sess")];

/// Which of the two views a column belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    #[display("trial")]
    Trial,
    #[display("session")]
    Session,
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum TableError {
    #[display("column `{name}` not found")]
    ColumnNotFound { name: String },
    #[display("column `{column}` belongs to the {actual} table, not the {expected} table")]
    WrongTable {
        column: String,
        expected: Scope,
        actual: Scope,
    },
    #[display("{_0}")]
    InvalidPredicate(PredicateError),
    #[display("session {session_id} does not exist")]
    UnknownSession { session_id: i64 },
    #[display("session {session_id} appears more than once")]
    DuplicateSession { session_id: i64 },
    #[display("trial {position} of session {session_id} appears more than once")]
    DuplicateTrial { session_id: i64, position: i64 },
    #[display("trial {position} refers to session {session_id}, which does not exist")]
    OrphanTrial { session_id: i64, position: i64 },
    #[display("{scope} table has no `{name}` column")]
    MissingKey { scope: Scope, name: &'static str },
    #[display("{scope} row {row}: `{name}` is not an integer")]
    InvalidKey {
        scope: Scope,
        name: String,
        row: usize,
    },
    #[display("column `{name}` has {actual} rows, expected {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[display("column `{name}` appears more than once")]
    DuplicateColumn { name: String },
    #[display("row {row} is out of range for {len} rows")]
    RowOutOfRange { row: usize, len: usize },
    #[display("{_0}")]
    Window(WindowError),
}

impl From<PredicateError> for TableError {
    fn from(err: PredicateError) -> Self {
        Self::InvalidPredicate(err)
    }
}

impl From<WindowError> for TableError {
    fn from(err: WindowError) -> Self {
        Self::Window(err)
    }
}

/// Composite key of a trial row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TrialKey {
    pub session_id: i64,
    pub position: i64,
}

/// Derived lookup structures, rebuilt after every structural mutation.
#[derive(Debug, Clone, Default)]
struct Index {
    trial_keys: Vec<TrialKey>,
    session_ids: Vec<i64>,
    session_rows: BTreeMap<i64, usize>,
    trial_session_row: Vec<usize>,
    session_trials: Vec<Range<usize>>,
}

impl Index {
    fn build(trials: &Frame, sessions: &Frame) -> Result<Self, TableError> {
        let session_ids = read_keys(sessions, Scope::Session, SESSION_ID)?;
        let mut session_rows = BTreeMap::new();
        for (row, &session_id) in session_ids.iter().enumerate() {
            if session_rows.insert(session_id, row).is_some() {
                return Err(TableError::DuplicateSession { session_id });
            }
        }

        let trial_keys = read_keys(trials, Scope::Trial, SESSION_ID)?
            .into_iter()
            .zip(read_keys(trials, Scope::Trial, POSITION)?)
            .map(|(session_id, position)| TrialKey {
                session_id,
                position,
            })
            .collect::<Vec<_>>();
        if let Some(pair) = trial_keys.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(TableError::DuplicateTrial {
                session_id: pair[0].session_id,
                position: pair[0].position,
            });
        }

        let mut session_trials = vec![0..0; session_ids.len()];
        let mut trial_session_row = Vec::with_capacity(trial_keys.len());
        for (i, key) in trial_keys.iter().enumerate() {
            let Some(&row) = session_rows.get(&key.session_id) else {
                return Err(TableError::OrphanTrial {
                    session_id: key.session_id,
                    position: key.position,
                });
            };
            let range = &mut session_trials[row];
            if range.is_empty() {
                *range = i..i + 1;
            } else {
                range.end = i + 1;
            }
            trial_session_row.push(row);
        }

        Ok(Self {
            trial_keys,
            session_ids,
            session_rows,
            trial_session_row,
            session_trials,
        })
    }
}

/// Column position of `name`, accepting either spelling of the key columns.
fn resolve_position(frame: &Frame, name: &str) -> Option<usize> {
    frame.position(name).or_else(|| {
        KEY_ALIASES.iter().find_map(|&(canonical, alias)| {
            if name == canonical {
                frame.position(alias)
            } else if name == alias {
                frame.position(canonical)
            } else {
                None
            }
        })
    })
}

fn read_keys(frame: &Frame, scope: Scope, name: &'static str) -> Result<Vec<i64>, TableError> {
    let index =
        resolve_position(frame, name).ok_or(TableError::MissingKey { scope, name })?;
    frame
        .column_at(index)
        .iter()
        .enumerate()
        .map(|(row, value)| {
            value.as_i64().ok_or_else(|| TableError::InvalidKey {
                scope,
                name: frame.names()[index].clone(),
                row,
            })
        })
        .collect()
}

fn sort_rows<K: Ord + Copy>(frame: &mut Frame, keys: &[K]) {
    let mut order = (0..keys.len()).collect::<Vec<_>>();
    order.sort_by_key(|&i| keys[i]);
    if !order.is_sorted() {
        frame.reorder_rows(&order);
    }
}

/// Trial and session records of one subject.
#[derive(Debug, Clone)]
pub struct RecordTable {
    trials: Frame,
    sessions: Frame,
    index: Index,
    options: PredicateOptions,
}

impl RecordTable {
    /// Builds a table from a trial frame and a session frame.
    ///
    /// Both frames must carry their key columns (`session_id` and, for
    /// trials, `position_in_session`, or the `n_sess`/`n_in_sess` spellings).
    /// Rows are sorted by key; duplicate keys and trials of unknown sessions
    /// are rejected.
    pub fn new(mut trials: Frame, mut sessions: Frame) -> Result<Self, TableError> {
        let session_ids = read_keys(&sessions, Scope::Session, SESSION_ID)?;
        sort_rows(&mut sessions, &session_ids);
        let trial_keys = read_keys(&trials, Scope::Trial, SESSION_ID)?
            .into_iter()
            .zip(read_keys(&trials, Scope::Trial, POSITION)?)
            .collect::<Vec<_>>();
        sort_rows(&mut trials, &trial_keys);

        let index = Index::build(&trials, &sessions)?;
        let empty = index.session_trials.iter().filter(|r| r.is_empty()).count();
        log::debug!(
            "loaded {} trials in {} sessions ({empty} without trials)",
            trials.len(),
            sessions.len()
        );
        Ok(Self {
            trials,
            sessions,
            index,
            options: PredicateOptions::default(),
        })
    }

    /// Replaces the tokenizer settings used by string conditions.
    #[must_use]
    pub fn with_predicate_options(mut self, options: PredicateOptions) -> Self {
        self.options = options;
        self
    }

    /// Number of trials.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trials.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn trials(&self) -> &Frame {
        &self.trials
    }

    #[must_use]
    pub fn sessions(&self) -> &Frame {
        &self.sessions
    }

    #[must_use]
    pub fn trial_keys(&self) -> &[TrialKey] {
        &self.index.trial_keys
    }

    /// Session ids in ascending order.
    #[must_use]
    pub fn session_ids(&self) -> &[i64] {
        &self.index.session_ids
    }

    /// Which view holds `name`; trial columns shadow session columns.
    #[must_use]
    pub fn scope_of(&self, name: &str) -> Option<Scope> {
        if resolve_position(&self.trials, name).is_some() {
            Some(Scope::Trial)
        } else if resolve_position(&self.sessions, name).is_some() {
            Some(Scope::Session)
        } else {
            None
        }
    }

    /// Parses a condition with this table's tokenizer settings.
    pub fn predicate(&self, condition: &str) -> Result<Predicate, TableError> {
        Ok(Predicate::parse_with(condition, &self.options)?)
    }

    /// A per-trial column.
    ///
    /// Trial columns are returned as stored; session columns are broadcast to
    /// every trial of the session.
    pub fn column(&self, name: &str) -> Result<ColumnView<'_>, TableError> {
        if let Some(i) = resolve_position(&self.trials, name) {
            return Ok(ColumnView::direct(self.trials.column_at(i)));
        }
        if let Some(i) = resolve_position(&self.sessions, name) {
            return Ok(ColumnView::mapped(
                self.sessions.column_at(i),
                self.index.trial_session_row.as_slice(),
            ));
        }
        Err(TableError::ColumnNotFound {
            name: name.to_owned(),
        })
    }

    /// A column of the session view, one value per session.
    pub fn session_column(&self, name: &str) -> Result<ColumnView<'_>, TableError> {
        self.scoped_column(name, Scope::Session)
    }

    fn scoped_column(&self, name: &str, scope: Scope) -> Result<ColumnView<'_>, TableError> {
        let (own, other) = match scope {
            Scope::Trial => (&self.trials, &self.sessions),
            Scope::Session => (&self.sessions, &self.trials),
        };
        if let Some(i) = resolve_position(own, name) {
            return Ok(ColumnView::direct(own.column_at(i)));
        }
        if resolve_position(other, name).is_some() {
            return Err(TableError::WrongTable {
                column: name.to_owned(),
                expected: scope,
                actual: match scope {
                    Scope::Trial => Scope::Session,
                    Scope::Session => Scope::Trial,
                },
            });
        }
        Err(TableError::ColumnNotFound {
            name: name.to_owned(),
        })
    }

    /// Distinct non-missing values of a trial or session column.
    ///
    /// Session columns are read from the session view, so values of sessions
    /// without trials are included.
    pub fn distinct_values(&self, name: &str) -> Result<BTreeSet<Value>, TableError> {
        match self.scope_of(name) {
            Some(scope) => Ok(self.scoped_column(name, scope)?.distinct()),
            None => Err(TableError::ColumnNotFound {
                name: name.to_owned(),
            }),
        }
    }

    /// Ids of the sessions matching a condition over session columns.
    pub fn filter_sessions(&self, condition: &str) -> Result<BTreeSet<i64>, TableError> {
        let mask = self.session_mask(&self.predicate(condition)?)?;
        Ok(self
            .index
            .session_ids
            .iter()
            .zip(mask)
            .filter_map(|(&id, keep)| keep.then_some(id))
            .collect())
    }

    fn session_mask(&self, predicate: &Predicate) -> Result<Vec<bool>, TableError> {
        predicate.mask(self.session_count(), |name| {
            self.scoped_column(name, Scope::Session)
        })
    }

    /// Trials matching `trial_condition` whose session matches
    /// `session_condition`, in key order. Empty conditions match everything.
    pub fn filter_trials(
        &self,
        trial_condition: &str,
        session_condition: &str,
    ) -> Result<TrialSelection<'_>, TableError> {
        self.select(
            &self.predicate(trial_condition)?,
            &self.predicate(session_condition)?,
        )
    }

    /// [`RecordTable::filter_trials`] with pre-parsed predicates.
    pub fn select(
        &self,
        trial: &Predicate,
        session: &Predicate,
    ) -> Result<TrialSelection<'_>, TableError> {
        let session_mask = self.session_mask(session)?;
        let trial_mask = trial.mask(self.len(), |name| self.scoped_column(name, Scope::Trial))?;
        let rows = trial_mask
            .iter()
            .zip(&self.index.trial_session_row)
            .enumerate()
            .filter_map(|(i, (&keep, &session_row))| (keep && session_mask[session_row]).then_some(i))
            .collect();
        Ok(TrialSelection { table: self, rows })
    }

    /// Every trial.
    #[must_use]
    pub fn select_all(&self) -> TrialSelection<'_> {
        TrialSelection {
            table: self,
            rows: (0..self.len()).collect(),
        }
    }

    /// First trial matching both conditions, if any.
    pub fn first_trial(
        &self,
        trial_condition: &str,
        session_condition: &str,
    ) -> Result<Option<Row<'_>>, TableError> {
        Ok(self
            .filter_trials(trial_condition, session_condition)?
            .first())
    }

    /// The trial columns of row `i`.
    pub fn row_at(&self, i: usize) -> Result<Row<'_>, TableError> {
        self.check_row(i)?;
        Ok(Row::new(&self.trials, i))
    }

    /// One cell of trial `i`, reading session columns through its session.
    pub fn cell(&self, i: usize, name: &str) -> Result<&Value, TableError> {
        self.check_row(i)?;
        Ok(self.column(name)?.get(i))
    }

    fn check_row(&self, row: usize) -> Result<(), TableError> {
        if row < self.len() {
            Ok(())
        } else {
            Err(TableError::RowOutOfRange {
                row,
                len: self.len(),
            })
        }
    }

    fn session_row(&self, session_id: i64) -> Result<usize, TableError> {
        self.index
            .session_rows
            .get(&session_id)
            .copied()
            .ok_or(TableError::UnknownSession { session_id })
    }

    /// Parameters of one session.
    pub fn session(&self, session_id: i64) -> Result<Row<'_>, TableError> {
        let row = self.session_row(session_id)?;
        Ok(Row::new(&self.sessions, row))
    }

    /// All trials of one session.
    pub fn session_trials(&self, session_id: i64) -> Result<TrialSelection<'_>, TableError> {
        let row = self.session_row(session_id)?;
        Ok(TrialSelection {
            table: self,
            rows: self.index.session_trials[row].clone().collect(),
        })
    }

    /// All trials of the sessions whose target equals `target`.
    pub fn trials_for_target(&self, target: f64) -> Result<TrialSelection<'_>, TableError> {
        let targets = self.session_column(TARGET)?;
        let rows = self
            .index
            .trial_session_row
            .iter()
            .enumerate()
            .filter_map(|(i, &row)| (targets.get(row).as_f64() == Some(target)).then_some(i))
            .collect();
        Ok(TrialSelection { table: self, rows })
    }

    /// Per-trial target, `NaN` where the session has none.
    pub fn trial_targets(&self) -> Result<Vec<f64>, TableError> {
        self.column(TARGET).map(|c| c.to_f64())
    }

    /// Target of every session that has trials, in session order.
    pub fn session_targets(&self) -> Result<Vec<f64>, TableError> {
        let targets = self.session_column(TARGET)?;
        Ok(self
            .non_empty_sessions()
            .map(|row| targets.get(row).to_f64())
            .collect())
    }

    fn non_empty_sessions(&self) -> impl Iterator<Item = usize> + '_ {
        self.index
            .session_trials
            .iter()
            .enumerate()
            .filter_map(|(row, range)| (!range.is_empty()).then_some(row))
    }

    /// Keeps only sessions up to and including `last_session`.
    pub fn drop_after(&mut self, last_session: i64) -> Result<(), TableError> {
        let sessions = self
            .index
            .session_ids
            .iter()
            .map(|&id| id <= last_session)
            .collect::<Vec<_>>();
        let trials = self
            .index
            .trial_keys
            .iter()
            .map(|key| key.session_id <= last_session)
            .collect::<Vec<_>>();
        self.retain(&trials, &sessions)
    }

    /// Removes sessions and their trials.
    ///
    /// Every id must exist; otherwise nothing is removed.
    pub fn drop_sessions(&mut self, session_ids: &[i64]) -> Result<(), TableError> {
        for &session_id in session_ids {
            self.session_row(session_id)?;
        }
        let sessions = self
            .index
            .session_ids
            .iter()
            .map(|id| !session_ids.contains(id))
            .collect::<Vec<_>>();
        let trials = self
            .index
            .trial_keys
            .iter()
            .map(|key| !session_ids.contains(&key.session_id))
            .collect::<Vec<_>>();
        log::debug!("dropping sessions {session_ids:?}");
        self.retain(&trials, &sessions)
    }

    fn retain(&mut self, trials: &[bool], sessions: &[bool]) -> Result<(), TableError> {
        self.trials.retain_rows(trials);
        self.sessions.retain_rows(sessions);
        self.index = Index::build(&self.trials, &self.sessions)?;
        Ok(())
    }

    /// Replaces every session target equal to `old` with `new`.
    ///
    /// Returns the number of sessions changed.
    pub fn retarget(&mut self, old: &Value, new: &Value) -> Result<usize, TableError> {
        let targets = self
            .sessions
            .column_mut(TARGET)
            .ok_or_else(|| TableError::ColumnNotFound {
                name: TARGET.to_owned(),
            })?;
        let mut changed = 0;
        for target in targets.iter_mut().filter(|t| *t == old) {
            *target = new.clone();
            changed += 1;
        }
        Ok(changed)
    }

    /// Recomputes `loss = (interval - target) / target` for every trial.
    pub fn compute_loss(&mut self) -> Result<(), TableError> {
        let intervals = self.scoped_column(INTERVAL, Scope::Trial)?.to_f64();
        let targets = self.trial_targets()?;
        let loss = intervals
            .iter()
            .zip(&targets)
            .map(|(&interval, &target)| Value::from_f64(ratio_or_nan(interval - target, target)))
            .collect();
        self.trials.set_column(LOSS, loss)
    }

    /// Recomputes `ratio = tap_1_len / interval` for every trial.
    pub fn compute_ratio(&mut self) -> Result<(), TableError> {
        let taps = self.scoped_column(TAP_1_LEN, Scope::Trial)?.to_f64();
        let intervals = self.scoped_column(INTERVAL, Scope::Trial)?.to_f64();
        let ratio = taps
            .iter()
            .zip(&intervals)
            .map(|(&tap, &interval)| Value::from_f64(ratio_or_nan(tap, interval)))
            .collect();
        self.trials.set_column(RATIO, ratio)
    }

    /// Adds `prev_target` and `next_target` session columns.
    pub fn compute_neighbor_targets(&mut self) -> Result<(), TableError> {
        let targets = self.session_column(TARGET)?.to_vec();
        let prev = std::iter::once(Value::Missing)
            .chain(targets.iter().cloned())
            .take(targets.len())
            .collect();
        let next = targets
            .iter()
            .skip(1)
            .cloned()
            .chain(std::iter::once(Value::Missing))
            .take(targets.len())
            .collect();
        self.sessions.set_column("prev_target", prev)?;
        self.sessions.set_column("next_target", next)
    }

    /// Adds a session column `<column>_<stat>` holding `stat` over each
    /// session's trials, and returns its name.
    ///
    /// Sessions without trials get a missing value.
    pub fn add_session_statistic(
        &mut self,
        stat: Statistic,
        column: &str,
    ) -> Result<String, TableError> {
        let values = self.scoped_column(column, Scope::Trial)?.to_f64();
        let summary = self
            .index
            .session_trials
            .iter()
            .map(|range| {
                if range.is_empty() {
                    Value::Missing
                } else {
                    Value::from_f64(stat.apply(&values[range.clone()]))
                }
            })
            .collect();
        let name = format!("{column}_{stat}");
        self.sessions.set_column(&name, summary)?;
        Ok(name)
    }

    /// Per-session success percentage and its trailing moving mean.
    ///
    /// Only sessions with trials are reported. A trial succeeds when its
    /// `loss` lies within `error_pct` percent of zero, bounds included.
    pub fn session_success(
        &self,
        error_pct: f64,
        window_len: usize,
    ) -> Result<Vec<SessionSuccess>, TableError> {
        let window = Window::warm(window_len)?;
        let loss = self.scoped_column(LOSS, Scope::Trial)?.to_f64();
        let mut rows = self
            .non_empty_sessions()
            .map(|row| {
                let range = self.index.session_trials[row].clone();
                let trials = range.len();
                let successes = loss[range]
                    .iter()
                    .filter(|&&l| within_error(l, error_pct))
                    .count();
                #[expect(clippy::cast_precision_loss)]
                let success_pct = successes as f64 / trials as f64 * 100.0;
                SessionSuccess {
                    session_id: self.index.session_ids[row],
                    trials,
                    successes,
                    success_pct,
                    moving_avg: f64::NAN,
                }
            })
            .collect::<Vec<_>>();
        let pcts = rows.iter().map(|r| r.success_pct).collect::<Vec<_>>();
        for (row, avg) in rows.iter_mut().zip(moving_mean(&pcts, window)) {
            row.moving_avg = avg;
        }
        Ok(rows)
    }

    /// Session and trial counts plus the conditions that have trials.
    pub fn overview(&self) -> Result<TableOverview, TableError> {
        let mut conditions = self
            .session_targets()?
            .into_iter()
            .filter(|t| !t.is_nan())
            .collect::<Vec<_>>();
        conditions.sort_by(f64::total_cmp);
        conditions.dedup();
        let active_sessions = self.non_empty_sessions().count();
        Ok(TableOverview {
            sessions: self.session_count(),
            active_sessions,
            trials: self.len(),
            conditions,
        })
    }
}

/// Result row of [`RecordTable::session_success`].
#[derive(Debug, Clone, Serialize)]
pub struct SessionSuccess {
    pub session_id: i64,
    pub trials: usize,
    pub successes: usize,
    pub success_pct: f64,
    pub moving_avg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableOverview {
    pub sessions: usize,
    /// Sessions with at least one trial.
    pub active_sessions: usize,
    pub trials: usize,
    pub conditions: Vec<f64>,
}

impl fmt::Display for TableOverview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} sessions ({} with trials), {} trials, conditions: ",
            self.sessions, self.active_sessions, self.trials
        )?;
        if self.conditions.is_empty() {
            return f.write_str("none");
        }
        for (i, c) in self.conditions.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

/// One row of a frame, borrowed.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    frame: &'a Frame,
    row: usize,
}

impl<'a> Row<'a> {
    fn new(frame: &'a Frame, row: usize) -> Self {
        Self { frame, row }
    }

    /// Value of `name`, accepting either spelling of the key columns.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        resolve_position(self.frame, name).map(|i| &self.frame.column_at(i)[self.row])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Value)> + 'a {
        self.frame.row(self.row)
    }
}

impl Serialize for Row<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.frame.names().len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Contiguous run of one session inside a [`TrialSelection`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSpan {
    pub session_id: i64,
    /// Index of the session's first row within the selection.
    pub start: usize,
    /// One past the session's last row within the selection.
    pub end: usize,
}

/// An ordered subset of a table's trials.
#[derive(Debug, Clone)]
pub struct TrialSelection<'a> {
    table: &'a RecordTable,
    rows: Vec<usize>,
}

impl<'a> TrialSelection<'a> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Trial row numbers in the underlying table.
    #[must_use]
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn keys(&self) -> impl ExactSizeIterator<Item = TrialKey> + '_ {
        self.rows.iter().map(|&i| self.table.index.trial_keys[i])
    }

    /// A column restricted to the selection; session columns are broadcast.
    pub fn column(&self, name: &str) -> Result<ColumnView<'a>, TableError> {
        let table = self.table;
        if let Some(i) = resolve_position(&table.trials, name) {
            return Ok(ColumnView::mapped(table.trials.column_at(i), self.rows.clone()));
        }
        if let Some(i) = resolve_position(&table.sessions, name) {
            let rows = self
                .rows
                .iter()
                .map(|&r| table.index.trial_session_row[r])
                .collect::<Vec<_>>();
            return Ok(ColumnView::mapped(table.sessions.column_at(i), Cow::Owned(rows)));
        }
        Err(TableError::ColumnNotFound {
            name: name.to_owned(),
        })
    }

    /// Numeric copy of a column with `NaN` for missing cells.
    pub fn numeric(&self, name: &str) -> Result<Vec<f64>, TableError> {
        self.column(name).map(|c| c.to_f64())
    }

    #[must_use]
    pub fn row(&self, i: usize) -> Option<Row<'a>> {
        self.rows.get(i).map(|&r| Row::new(&self.table.trials, r))
    }

    #[must_use]
    pub fn first(&self) -> Option<Row<'a>> {
        self.row(0)
    }

    /// The sessions present in the selection, in order, with the span of
    /// each inside the selection.
    #[must_use]
    pub fn session_starts(&self) -> Vec<SessionSpan> {
        let mut spans: Vec<SessionSpan> = vec![];
        for (i, key) in self.keys().enumerate() {
            match spans.last_mut() {
                Some(span) if span.session_id == key.session_id => span.end = i + 1,
                _ => spans.push(SessionSpan {
                    session_id: key.session_id,
                    start: i,
                    end: i + 1,
                }),
            }
        }
        spans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().copied().map(Value::Int).collect()
    }

    fn floats(values: &[f64]) -> Vec<Value> {
        values.iter().copied().map(Value::from_f64).collect()
    }

    /// Sessions 1 (target 500, 3 trials), 2 (target 700, 2 trials) and
    /// 3 (target 700, no trials). Trials are given out of order.
    fn table() -> RecordTable {
        let trials = Frame::from_columns([
            ("n_sess".to_owned(), ints(&[2, 1, 1, 2, 1])),
            ("n_in_sess".to_owned(), ints(&[1, 1, 2, 2, 3])),
            ("interval".to_owned(), floats(&[770.0, 450.0, 500.0, 630.0, 560.0])),
            ("tap_1_len".to_owned(), floats(&[77.0, 90.0, 100.0, f64::NAN, 112.0])),
        ])
        .unwrap();
        let sessions = Frame::from_columns([
            ("n_sess".to_owned(), ints(&[3, 1, 2])),
            ("target".to_owned(), ints(&[700, 500, 700])),
            ("sess_size".to_owned(), ints(&[0, 3, 2])),
        ])
        .unwrap();
        let mut table = RecordTable::new(trials, sessions).unwrap();
        table.compute_loss().unwrap();
        table
    }

    #[test]
    fn test_rows_sorted_by_key() {
        let table = table();
        let keys = table.trial_keys().iter().map(|k| (k.session_id, k.position)).collect::<Vec<_>>();
        assert_eq!(keys, [(1, 1), (1, 2), (1, 3), (2, 1), (2, 2)]);
        assert_eq!(table.session_ids(), [1, 2, 3]);
        assert_eq!(
            table.column("interval").unwrap().to_f64(),
            [450.0, 500.0, 560.0, 770.0, 630.0]
        );
    }

    #[test]
    fn test_session_column_broadcasts_and_aliases_resolve() {
        let table = table();
        assert_eq!(
            table.column("target").unwrap().to_f64(),
            [500.0, 500.0, 500.0, 700.0, 700.0]
        );
        assert_eq!(table.column("session_id").unwrap().to_f64(), [1.0, 1.0, 1.0, 2.0, 2.0]);
        assert_eq!(table.cell(4, "position_in_session").unwrap(), &Value::Int(2));
        assert_eq!(table.cell(3, "sess_size").unwrap(), &Value::Int(2));
        assert!(matches!(table.cell(9, "target"), Err(TableError::RowOutOfRange { .. })));
    }

    #[test]
    fn test_row_at_reads_trial_columns_only() {
        let table = table();
        let row = table.row_at(3).unwrap();
        assert_eq!(row.get("n_sess"), Some(&Value::Int(2)));
        assert_eq!(row.get("n_in_sess"), Some(&Value::Int(1)));
        assert_eq!(row.get("interval"), Some(&Value::Float(770.0)));
        assert_eq!(row.get("target"), None);
        assert!(matches!(
            table.row_at(5),
            Err(TableError::RowOutOfRange { row: 5, len: 5 })
        ));

        let all = table.select_all();
        assert_eq!(all.len(), 5);
        assert_eq!(all.rows(), [0, 1, 2, 3, 4]);
        assert_eq!(all.numeric("target").unwrap(), [500.0, 500.0, 500.0, 700.0, 700.0]);
    }

    #[test]
    fn test_loss_is_relative_error() {
        let table = table();
        let loss = table.column("loss").unwrap().to_f64();
        assert!((loss[3] - 0.1).abs() < 1e-12);
        assert!((loss[0] + 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_filter_sessions_and_trials() {
        let table = table();
        assert_eq!(
            table.filter_sessions("(target >= 500) & (sess_size > 0)").unwrap(),
            BTreeSet::from([1, 2])
        );
        assert_eq!(table.filter_sessions("").unwrap().len(), 3);

        let selection = table.filter_trials("interval > 480", "target == 500").unwrap();
        assert_eq!(selection.numeric("interval").unwrap(), [500.0, 560.0]);
        assert_eq!(selection.numeric("target").unwrap(), [500.0, 500.0]);

        let first = table.first_trial("interval > 600", "").unwrap().unwrap();
        assert_eq!(first.get("n_sess"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_predicates_are_scoped() {
        let table = table();
        assert!(matches!(
            table.filter_sessions("interval > 1"),
            Err(TableError::WrongTable { expected: Scope::Session, actual: Scope::Trial, .. })
        ));
        assert!(matches!(
            table.filter_trials("target > 1", ""),
            Err(TableError::WrongTable { expected: Scope::Trial, actual: Scope::Session, .. })
        ));
        assert!(matches!(
            table.filter_trials("bogus > 1", ""),
            Err(TableError::ColumnNotFound { name }) if name == "bogus"
        ));
        assert!(matches!(
            table.filter_trials("interval >", ""),
            Err(TableError::InvalidPredicate(_))
        ));
    }

    #[test]
    fn test_distinct_values() {
        let table = table();
        let targets = table.distinct_values("target").unwrap();
        assert_eq!(targets.into_iter().collect::<Vec<_>>(), ints(&[500, 700]));
        assert!(matches!(
            table.distinct_values("nope"),
            Err(TableError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_session_spans() {
        let table = table();
        let selection = table.filter_trials("interval != 500", "").unwrap();
        assert_eq!(
            selection.session_starts(),
            [
                SessionSpan { session_id: 1, start: 0, end: 2 },
                SessionSpan { session_id: 2, start: 2, end: 4 },
            ]
        );
        assert_eq!(table.session_trials(2).unwrap().len(), 2);
        assert!(table.session_trials(3).unwrap().is_empty());
        assert!(matches!(
            table.session_trials(9),
            Err(TableError::UnknownSession { session_id: 9 })
        ));
    }

    #[test]
    fn test_trials_for_target_and_targets() {
        let table = table();
        assert_eq!(table.trials_for_target(700.0).unwrap().len(), 2);
        assert_eq!(table.session_targets().unwrap(), [500.0, 700.0]);
        assert_eq!(table.trial_targets().unwrap().len(), 5);
    }

    #[test]
    fn test_retarget_and_drop() {
        let mut table = table();
        assert_eq!(table.retarget(&Value::Int(700), &Value::Int(800)).unwrap(), 2);
        assert_eq!(table.session(2).unwrap().get("target"), Some(&Value::Int(800)));

        assert!(table.drop_sessions(&[1, 42]).is_err());
        assert_eq!(table.len(), 5);
        table.drop_sessions(&[1]).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.session_ids(), [2, 3]);

        table.drop_after(2).unwrap();
        assert_eq!(table.session_ids(), [2]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_derived_session_columns() {
        let mut table = table();
        table.compute_neighbor_targets().unwrap();
        let next = table.session_column("next_target").unwrap().to_vec();
        assert_eq!(next, [Value::Int(700), Value::Int(700), Value::Missing]);
        let prev = table.session_column("prev_target").unwrap().to_vec();
        assert_eq!(prev, [Value::Missing, Value::Int(500), Value::Int(700)]);

        let name = table.add_session_statistic(Statistic::Mean, "interval").unwrap();
        assert_eq!(name, "interval_mean");
        let means = table.session_column(&name).unwrap().to_f64();
        assert!((means[0] - 1510.0 / 3.0).abs() < 1e-9);
        assert_eq!(means[1], 700.0);
        assert!(means[2].is_nan());

        table.compute_ratio().unwrap();
        let ratio = table.column("ratio").unwrap().to_f64();
        assert!((ratio[0] - 0.2).abs() < 1e-12);
        assert!(ratio[4].is_nan());
    }

    #[test]
    fn test_session_success() {
        let table = table();
        // losses: -0.1, 0.0, 0.12 | 0.1, -0.1
        let success = table.session_success(10.0, 2).unwrap();
        assert_eq!(success.len(), 2);
        assert_eq!(success[0].successes, 2);
        assert!((success[0].success_pct - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(success[1].success_pct, 100.0);
        assert!((success[1].moving_avg - (200.0 / 3.0 + 100.0) / 2.0).abs() < 1e-9);
        assert!(table.session_success(10.0, 0).is_err());
    }

    #[test]
    fn test_overview() {
        let overview = table().overview().unwrap();
        assert_eq!(overview.sessions, 3);
        assert_eq!(overview.active_sessions, 2);
        assert_eq!(overview.conditions, [500.0, 700.0]);
        assert_eq!(
            overview.to_string(),
            "3 sessions (2 with trials), 5 trials, conditions: 500, 700"
        );
    }

    #[test]
    fn test_rejects_bad_keys() {
        let sessions = || Frame::from_columns([("session_id".to_owned(), ints(&[1]))]).unwrap();
        let trials = |ids: &[i64], positions: &[i64]| {
            Frame::from_columns([
                ("session_id".to_owned(), ints(ids)),
                ("position_in_session".to_owned(), ints(positions)),
            ])
            .unwrap()
        };
        assert!(matches!(
            RecordTable::new(trials(&[1, 1], &[1, 1]), sessions()),
            Err(TableError::DuplicateTrial { session_id: 1, position: 1 })
        ));
        assert!(matches!(
            RecordTable::new(trials(&[2], &[1]), sessions()),
            Err(TableError::OrphanTrial { session_id: 2, .. })
        ));
        assert!(matches!(
            RecordTable::new(Frame::default(), sessions()),
            Err(TableError::MissingKey { scope: Scope::Trial, .. })
        ));
    }
}

//! Length alignment of per-subject series
//!
//! Subjects rarely run the same number of trials at a condition. Before
//! averaging, every subject's series is brought to a common layout so that
//! position `i` means "the i-th comparable trial" for every subject:
//!
//! | policy          | reference length                  | per-subject series                     |
//! |-----------------|-----------------------------------|----------------------------------------|
//! | `Minimum`       | shortest subject                  | truncated to the reference             |
//! | `Maximum`       | longest subject                   | padded with `NaN` to the reference     |
//! | `Fixed(n)`      | `n`, capped at the longest subject| truncated or padded                    |
//! | `Median`        | median session length `T`         | each session resampled to `T`, padded  |
//!
//! Under `Median`, sessions with at most `min_session_len` trials are dropped,
//! shorter sessions are interpolated and longer ones randomly subsampled, so
//! the k-th session of every subject occupies the same index range.
//!
//! Each aligned series remembers its contributed length (its length before
//! padding or truncation) from which the averager derives the cut tiers.

use std::str::FromStr;

use rand::SeedableRng as _;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};
use tapstat_stats::{
    chunk::{RemainderPolicy, chunk_apply, chunk_count},
    descriptive::{Statistic, median_of_sorted},
    resample::{InterpolationSpan, resample},
};

use crate::{AnalysisError, group::ConditionGroup};

/// Sessions this short or shorter are excluded from per-session resampling.
pub const DEFAULT_MIN_SESSION_LEN: usize = 50;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceLength {
    #[default]
    Minimum,
    Median,
    Maximum,
    Fixed(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("invalid reference length `{input}` (expected minimum, median, maximum or a trial count)")]
pub struct ParseReferenceLengthError {
    input: String,
}

impl FromStr for ReferenceLength {
    type Err = ParseReferenceLengthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "min" | "minimum" => Ok(Self::Minimum),
            "median" => Ok(Self::Median),
            "max" | "maximum" => Ok(Self::Maximum),
            other => other
                .parse()
                .map(Self::Fixed)
                .map_err(|_| ParseReferenceLengthError {
                    input: s.to_owned(),
                }),
        }
    }
}

/// Which end of a series survives truncation.
///
/// `Start` is the default so that `Minimum` and `Fixed` compare subjects over
/// the same early trials; use `End` for "last N trials" views.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::FromStr)]
#[serde(rename_all = "snake_case")]
pub enum Truncation {
    /// Keep the first trials (learning curves).
    #[default]
    Start,
    /// Keep the last trials ("last N" comparisons).
    End,
}

impl Truncation {
    fn apply(self, values: &[f64], len: usize) -> Vec<f64> {
        let len = len.min(values.len());
        match self {
            Self::Start => values[..len].to_vec(),
            Self::End => values[values.len() - len..].to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignOptions {
    pub reference: ReferenceLength,
    pub truncation: Truncation,
    pub span: InterpolationSpan,
    pub min_session_len: usize,
    /// Seed of the subsampling generator.
    pub seed: u64,
}

impl AlignOptions {
    /// Rejects settings no group can be aligned with.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.reference == ReferenceLength::Fixed(0) {
            return Err(AnalysisError::ZeroReferenceLength);
        }
        Ok(())
    }
}

impl Default for AlignOptions {
    fn default() -> Self {
        Self {
            reference: ReferenceLength::default(),
            truncation: Truncation::default(),
            span: InterpolationSpan::default(),
            min_session_len: DEFAULT_MIN_SESSION_LEN,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedSeries {
    pub subject: String,
    /// Length before padding or truncation.
    pub contributed_len: usize,
    pub values: Vec<f64>,
}

/// Equal-length series of one condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedGroup {
    pub target: f64,
    pub reference_len: usize,
    /// Per-session length under [`ReferenceLength::Median`].
    pub session_len: Option<usize>,
    pub series: Vec<AlignedSeries>,
}

impl AlignedGroup {
    #[must_use]
    pub fn subjects(&self) -> Vec<String> {
        self.series.iter().map(|s| s.subject.clone()).collect()
    }
}

/// Aligns the members of a condition group.
///
/// Members without trials are skipped. Fails with
/// [`AnalysisError::EmptyGroup`] when nothing is left to align and with
/// [`AnalysisError::ZeroReferenceLength`] for `Fixed(0)`.
pub fn align(group: &ConditionGroup, options: &AlignOptions) -> Result<AlignedGroup, AnalysisError> {
    options.validate()?;
    let empty = || AnalysisError::EmptyGroup {
        target: group.target,
    };
    if options.reference == ReferenceLength::Median {
        return align_sessions(group, options);
    }

    let members = group
        .non_empty()
        .map(|m| (m.subject.clone(), m.concat()))
        .collect::<Vec<_>>();
    let lengths = members.iter().map(|(_, v)| v.len());
    let longest = lengths.clone().max().ok_or_else(empty)?;
    let reference_len = match options.reference {
        ReferenceLength::Minimum => lengths.min().unwrap_or(0),
        ReferenceLength::Fixed(n) => n.min(longest),
        ReferenceLength::Maximum | ReferenceLength::Median => longest,
    };
    if reference_len == 0 {
        return Err(empty());
    }

    let series = members
        .into_iter()
        .map(|(subject, values)| AlignedSeries {
            subject,
            contributed_len: values.len(),
            values: pad(options.truncation.apply(&values, reference_len), reference_len),
        })
        .collect();
    Ok(AlignedGroup {
        target: group.target,
        reference_len,
        session_len: None,
        series,
    })
}

fn pad(mut values: Vec<f64>, len: usize) -> Vec<f64> {
    values.resize(len, f64::NAN);
    values
}

#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn align_sessions(group: &ConditionGroup, options: &AlignOptions) -> Result<AlignedGroup, AnalysisError> {
    let empty = || AnalysisError::EmptyGroup {
        target: group.target,
    };
    let is_kept = |session: &&Vec<f64>| session.len() > options.min_session_len;

    let mut lengths = group
        .non_empty()
        .flat_map(|m| m.sessions.iter().filter(is_kept).map(Vec::len))
        .map(|len| len as f64)
        .collect::<Vec<_>>();
    lengths.sort_by(f64::total_cmp);
    let median = median_of_sorted(&lengths);
    if median.is_nan() {
        return Err(empty());
    }
    let session_len = median.round() as usize;

    let mut rng = Pcg64::seed_from_u64(options.seed);
    let mut series = vec![];
    for member in group.non_empty() {
        let mut values = vec![];
        for session in &member.sessions {
            if !is_kept(&session) {
                log::debug!(
                    "{}: skipping session of {} trials at target {}",
                    member.subject,
                    session.len(),
                    group.target
                );
                continue;
            }
            values.extend(resample(session, session_len, options.span, &mut rng));
        }
        if values.is_empty() {
            log::warn!(
                "{}: no session at target {} is longer than {} trials",
                member.subject,
                group.target,
                options.min_session_len
            );
            continue;
        }
        series.push(AlignedSeries {
            subject: member.subject.clone(),
            contributed_len: values.len(),
            values,
        });
    }

    let reference_len = series
        .iter()
        .map(|s| s.values.len())
        .max()
        .ok_or_else(empty)?;
    for s in &mut series {
        s.values.resize(reference_len, f64::NAN);
    }
    Ok(AlignedGroup {
        target: group.target,
        reference_len,
        session_len: Some(session_len),
        series,
    })
}

/// Chunks each member's full series and aligns the chunk series.
///
/// Lengths are in chunk units; the reference is the longest chunk series.
pub fn align_chunks(
    group: &ConditionGroup,
    chunk_len: usize,
    policy: RemainderPolicy,
    stat: Statistic,
) -> Result<AlignedGroup, AnalysisError> {
    if chunk_len == 0 {
        return Err(AnalysisError::ZeroChunkLength);
    }
    let mut series = group
        .non_empty()
        .filter_map(|member| {
            let values = member.concat();
            if chunk_count(values.len(), chunk_len, policy) == 0 {
                log::debug!(
                    "{}: {} trials do not fill a chunk of {chunk_len}",
                    member.subject,
                    values.len()
                );
                return None;
            }
            let chunks = chunk_apply(&values, chunk_len, policy, stat);
            Some(AlignedSeries {
                subject: member.subject.clone(),
                contributed_len: chunks.len(),
                values: chunks,
            })
        })
        .collect::<Vec<_>>();
    let reference_len = series
        .iter()
        .map(|s| s.values.len())
        .max()
        .ok_or(AnalysisError::EmptyGroup {
            target: group.target,
        })?;
    for s in &mut series {
        s.values.resize(reference_len, f64::NAN);
    }
    Ok(AlignedGroup {
        target: group.target,
        reference_len,
        session_len: None,
        series,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::MemberSeries;

    fn ramp(len: usize) -> Vec<f64> {
        (0..len).map(|i| i as f64).collect()
    }

    fn group(members: &[(&str, Vec<Vec<f64>>)]) -> ConditionGroup {
        ConditionGroup {
            target: 700.0,
            column: "interval".into(),
            members: members
                .iter()
                .map(|(name, sessions)| MemberSeries {
                    subject: (*name).into(),
                    sessions: sessions.clone(),
                })
                .collect(),
        }
    }

    fn options(reference: ReferenceLength) -> AlignOptions {
        AlignOptions {
            reference,
            ..AlignOptions::default()
        }
    }

    #[test]
    fn test_minimum_truncates_from_either_end() {
        let g = group(&[("a", vec![ramp(5)]), ("b", vec![ramp(3)]), ("c", vec![])]);
        let aligned = align(&g, &options(ReferenceLength::Minimum)).unwrap();
        assert_eq!(aligned.reference_len, 3);
        assert_eq!(aligned.series.len(), 2);
        assert_eq!(aligned.series[0].values, [0.0, 1.0, 2.0]);
        assert_eq!(aligned.series[0].contributed_len, 5);

        let end = AlignOptions {
            truncation: Truncation::End,
            ..options(ReferenceLength::Minimum)
        };
        assert_eq!(align(&g, &end).unwrap().series[0].values, [2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_maximum_and_fixed_pad() {
        let g = group(&[("a", vec![ramp(2), ramp(2)]), ("b", vec![ramp(1)])]);
        let aligned = align(&g, &options(ReferenceLength::Maximum)).unwrap();
        assert_eq!(aligned.reference_len, 4);
        assert_eq!(aligned.series[0].values, [0.0, 1.0, 0.0, 1.0]);
        assert_eq!(aligned.series[1].values.len(), 4);
        assert!(aligned.series[1].values[1..].iter().all(|v| v.is_nan()));

        let fixed = align(&g, &options(ReferenceLength::Fixed(3))).unwrap();
        assert_eq!(fixed.reference_len, 3);
        let capped = align(&g, &options(ReferenceLength::Fixed(100))).unwrap();
        assert_eq!(capped.reference_len, 4);
    }

    #[test]
    fn test_zero_fixed_length_is_rejected() {
        let g = group(&[("a", vec![ramp(5)])]);
        let zero = options(ReferenceLength::Fixed(0));
        assert!(matches!(zero.validate(), Err(AnalysisError::ZeroReferenceLength)));
        assert!(matches!(align(&g, &zero), Err(AnalysisError::ZeroReferenceLength)));
        assert!(options(ReferenceLength::Fixed(1)).validate().is_ok());
    }

    #[test]
    fn test_empty_group_is_an_error() {
        let g = group(&[("a", vec![])]);
        assert!(matches!(
            align(&g, &options(ReferenceLength::Minimum)),
            Err(AnalysisError::EmptyGroup { .. })
        ));
    }

    #[test]
    fn test_median_resamples_each_session() {
        // session lengths 40 (dropped), 60, 100, 120 -> median of kept is 100
        let g = group(&[
            ("a", vec![ramp(40), ramp(60), ramp(100)]),
            ("b", vec![ramp(120)]),
        ]);
        let aligned = align(&g, &options(ReferenceLength::Median)).unwrap();
        assert_eq!(aligned.session_len, Some(100));
        assert_eq!(aligned.reference_len, 200);
        assert_eq!(aligned.series[0].contributed_len, 200);
        assert_eq!(aligned.series[1].contributed_len, 100);
        // the session already at the median length is untouched
        assert_eq!(aligned.series[0].values[100..], ramp(100)[..]);
        // interpolation stays inside the source range
        assert!(aligned.series[0].values[..100].iter().all(|&v| (0.0..=59.0).contains(&v)));
        // subsampling keeps order
        assert!(aligned.series[1].values[..100].is_sorted());
    }

    #[test]
    fn test_median_is_reproducible_for_a_seed() {
        let g = group(&[("a", vec![ramp(80)]), ("b", vec![ramp(300)])]);
        let first = align(&g, &options(ReferenceLength::Median)).unwrap();
        let second = align(&g, &options(ReferenceLength::Median)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_chunks_count_in_chunk_units() {
        let g = group(&[("a", vec![ramp(2500)]), ("b", vec![ramp(1000)]), ("c", vec![ramp(300)])]);
        let aligned = align_chunks(&g, 1000, RemainderPolicy::Round, Statistic::Mean).unwrap();
        assert_eq!(aligned.reference_len, 3);
        assert_eq!(aligned.series.len(), 2);
        assert_eq!(aligned.series[0].contributed_len, 3);
        assert_eq!(aligned.series[1].contributed_len, 1);
        assert!((aligned.series[0].values[2] - 2249.5).abs() < 1e-9);
        assert!(matches!(
            align_chunks(&g, 0, RemainderPolicy::Round, Statistic::Mean),
            Err(AnalysisError::ZeroChunkLength)
        ));
    }

    #[test]
    fn test_parse_reference_length() {
        assert_eq!("min".parse::<ReferenceLength>().unwrap(), ReferenceLength::Minimum);
        assert_eq!("Median".parse::<ReferenceLength>().unwrap(), ReferenceLength::Median);
        assert_eq!("2000".parse::<ReferenceLength>().unwrap(), ReferenceLength::Fixed(2000));
        assert!("longest".parse::<ReferenceLength>().is_err());
    }
}

//! Cross-subject averaging of aligned series

use serde::Serialize;

use crate::align::AlignedGroup;

/// A tier boundary of a group average.
///
/// Positions before `end` (and after the previous cut) are averaged over
/// `subjects` series; past the end of a shorter series fewer subjects
/// contribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Cut {
    pub end: usize,
    pub subjects: usize,
}

/// Tier boundaries for contributed lengths clipped to `reference_len`.
///
/// Cuts are ascending by `end` and unique.
///
/// ```
/// use tapstat_analysis::average::{Cut, cuts};
///
/// let cuts = cuts(&[3000, 1000, 500], 3000);
/// assert_eq!(cuts, [
///     Cut { end: 500, subjects: 3 },
///     Cut { end: 1000, subjects: 2 },
///     Cut { end: 3000, subjects: 1 },
/// ]);
/// ```
#[must_use]
pub fn cuts(lengths: &[usize], reference_len: usize) -> Vec<Cut> {
    let mut ends = lengths
        .iter()
        .map(|&len| len.min(reference_len))
        .filter(|&len| len > 0)
        .collect::<Vec<_>>();
    ends.sort_unstable();
    ends.dedup();
    ends.into_iter()
        .map(|end| Cut {
            end,
            subjects: lengths.iter().filter(|&&len| len >= end).count(),
        })
        .collect()
}

/// Per-position mean of an aligned group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupAverage {
    pub target: f64,
    pub reference_len: usize,
    pub subjects: Vec<String>,
    /// Mean over the subjects with a value at each position; `NaN` where none has.
    pub mean: Vec<f64>,
    pub cuts: Vec<Cut>,
}

impl GroupAverage {
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn new(group: &AlignedGroup) -> Self {
        let mean = (0..group.reference_len)
            .map(|i| {
                let (sum, count) = group
                    .series
                    .iter()
                    .filter_map(|s| s.values.get(i).copied())
                    .filter(|v| !v.is_nan())
                    .fold((0.0, 0_usize), |(sum, count), v| (sum + v, count + 1));
                if count == 0 {
                    f64::NAN
                } else {
                    sum / count as f64
                }
            })
            .collect();
        let lengths = group
            .series
            .iter()
            .map(|s| s.contributed_len)
            .collect::<Vec<_>>();
        Self {
            target: group.target,
            reference_len: group.reference_len,
            subjects: group.subjects(),
            mean,
            cuts: cuts(&lengths, group.reference_len),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }
}

//! Fixed-size chunking of ordered sequences
//!
//! A sequence of length `len` is split into chunks of `chunk_len` values. When
//! `len` is not a multiple of `chunk_len` the [`RemainderPolicy`] decides what
//! happens to the trailing partial chunk:
//!
//! | policy  | chunk count              | partial chunk            |
//! |---------|--------------------------|--------------------------|
//! | `Round` | `round(len / chunk_len)` | kept if it is at least half a chunk |
//! | `Keep`  | `ceil(len / chunk_len)`  | always kept              |
//! | `Drop`  | `floor(len / chunk_len)` | always dropped           |
//!
//! A kept partial chunk is padded with missing values (`NaN`), which chunk
//! statistics ignore. With `len = q * chunk_len + r`, a rounded-up chunk
//! receives `chunk_len - r` padding slots.
//!
//! # Examples
//!
//! ```
//! use tapstat_stats::{chunk::{RemainderPolicy, chunk_apply}, descriptive::Statistic};
//!
//! let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
//! let means = chunk_apply(&values, 3, RemainderPolicy::Round, Statistic::Mean);
//! // 7 / 3 rounds to 2 chunks; the single trailing value is dropped
//! assert_eq!(means, vec![2.0, 5.0]);
//! ```

use serde::{Deserialize, Serialize};

use crate::descriptive::Statistic;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::FromStr)]
#[serde(rename_all = "snake_case")]
pub enum RemainderPolicy {
    #[default]
    Round,
    Keep,
    Drop,
}

/// Number of chunks of `chunk_len` produced for a sequence of length `len`.
///
/// # Panics
///
/// Panics if `chunk_len` is zero.
#[must_use]
pub fn chunk_count(len: usize, chunk_len: usize, policy: RemainderPolicy) -> usize {
    assert!(chunk_len > 0, "chunk length must be positive");
    let full = len / chunk_len;
    let rem = len % chunk_len;
    match policy {
        RemainderPolicy::Drop => full,
        RemainderPolicy::Keep => full + usize::from(rem > 0),
        // round half up: a remainder of exactly half a chunk rounds up
        RemainderPolicy::Round => full + usize::from(rem > 0 && 2 * rem >= chunk_len),
    }
}

/// Truncates or pads `values` with `NaN` to exactly `chunk_count * chunk_len` values.
#[must_use]
pub fn pad_to_chunks(values: &[f64], chunk_len: usize, policy: RemainderPolicy) -> Vec<f64> {
    let total = chunk_count(values.len(), chunk_len, policy) * chunk_len;
    let mut out = values[..values.len().min(total)].to_vec();
    out.resize(total, f64::NAN);
    out
}

/// Applies `stat` to each chunk, ignoring padding.
#[must_use]
pub fn chunk_apply(
    values: &[f64],
    chunk_len: usize,
    policy: RemainderPolicy,
    stat: Statistic,
) -> Vec<f64> {
    pad_to_chunks(values, chunk_len, policy)
        .chunks(chunk_len)
        .map(|chunk| stat.apply(chunk))
        .collect()
}

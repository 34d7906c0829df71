//! Analysis settings loaded from an optional JSON file
//!
//! Every field has a default, so a file only lists what it changes:
//!
//! ```json
//! {
//!   "metrics": { "window_len": 500, "align": { "reference": "median", "seed": 7 } },
//!   "tail_len": 1000
//! }
//! ```
//!
//! Command-line flags override the file.
//!
//! Truncating alignments keep the first trials unless `align.truncation` is
//! `"end"`, which turns the `minimum` and fixed-length references into
//! "last N trials" views.

use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use tapstat_analysis::metrics::MetricOptions;
use tapstat_records::predicate::PredicateOptions;

use crate::util;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub metrics: MetricOptions,
    /// Trials per subject summarised by `tail`.
    pub tail_len: usize,
    /// Trials per chunk for `chunks`.
    pub chunk_len: usize,
    /// Window of the per-session success moving average.
    pub session_window: usize,
    /// Extra characters allowed in column names of conditions.
    pub word_chars: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            metrics: MetricOptions::default(),
            tail_len: 2000,
            chunk_len: 1000,
            session_window: 5,
            word_chars: "_".to_owned(),
        }
    }
}

impl AnalysisConfig {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                let config: Self = util::read_json_file("config", path)?;
                config
                    .validate()
                    .with_context(|| format!("Invalid config file: {}", path.display()))?;
                log::debug!("Loaded config from {}", path.display());
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.metrics.align.validate()?;
        self.metrics.window()?;
        Ok(())
    }

    pub fn predicate_options(&self) -> PredicateOptions {
        PredicateOptions {
            word_chars: self.word_chars.chars().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use tapstat_analysis::{
        AnalysisError,
        align::{ReferenceLength, Truncation},
    };

    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: AnalysisConfig = serde_json::from_str(
            r#"{"metrics": {"window_len": 500, "align": {"reference": {"fixed": 2000}}}, "word_chars": "_."}"#,
        )
        .unwrap();
        assert_eq!(config.metrics.window_len, 500);
        assert_eq!(config.metrics.min_periods, 100);
        assert_eq!(config.metrics.align.reference, ReferenceLength::Fixed(2000));
        assert_eq!(config.tail_len, 2000);
        assert_eq!(config.predicate_options().word_chars, ['_', '.']);
        assert_eq!(config.metrics.align.truncation, Truncation::Start);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_fixed_reference_is_invalid() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{"metrics": {"align": {"reference": {"fixed": 0}}}}"#).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AnalysisError>(),
            Some(AnalysisError::ZeroReferenceLength)
        ));
    }
}

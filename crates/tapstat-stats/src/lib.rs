//! Numeric routines for the tapstat workspace.
//!
//! This crate holds the pure, table-agnostic statistics used by the analysis
//! layer. Every function works on `f64` slices with `NaN` as the missing-value
//! sentinel:
//!
//! - **Descriptive statistics**: mean, median, sample deviation, coefficient of variation
//! - **Moving windows**: trailing mean, standard deviation, success rate and smoothed CV
//! - **Resampling**: linear interpolation and order-preserving random subsampling
//! - **Chunking**: fixed-size chunk statistics with configurable remainder handling
//! - **Linear fit**: least-squares trend lines
//!
//! # Modules
//!
//! - [`descriptive`]: Descriptive statistics for summarizing datasets
//! - [`window`]: Trailing moving-window statistics
//! - [`resample`]: Length normalization of ordered sequences
//! - [`chunk`]: Fixed-size chunking of ordered sequences
//! - [`fit`]: Least-squares linear fit
//!
//! # Examples
//!
//! ## Computing descriptive statistics
//!
//! ```
//! use tapstat_stats::descriptive::DescriptiveStats;
//!
//! let values = [1.0, 2.0, 3.0, 4.0, 5.0];
//! let stats = DescriptiveStats::new(values).unwrap();
//! assert_eq!(stats.mean, 3.0);
//! ```
//!
//! ## Computing a success rate
//!
//! ```
//! use tapstat_stats::window::{Window, success_rate};
//!
//! // signed fractional errors of four trials
//! let losses = [0.05, -0.2, 0.0, 0.1];
//! let rate = success_rate(&losses, 10.0, Window::new(4, 1).unwrap());
//! assert_eq!(rate[3], 75.0);
//! ```

pub mod chunk;
pub mod descriptive;
pub mod fit;
pub mod resample;
pub mod window;

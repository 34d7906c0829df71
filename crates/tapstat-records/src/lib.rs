//! Trial and session records with string-predicate queries
//!
//! This crate holds the in-memory representation of one subject's data: a
//! per-trial view (one row per response) and a per-session view (one row per
//! session), linked by `session_id`.
//!
//! # Overview
//!
//! 1. **Cells** ([`value::Value`]): typed cells inferred from raw text
//! 2. **Frames** ([`frame::Frame`]): named columns in source order
//! 3. **Tables** ([`table::RecordTable`]): keyed, sorted trial and session frames
//!    with broadcast session columns and in-place edits
//! 4. **Conditions** ([`predicate::Predicate`]): a small expression language
//!    evaluated to row masks
//!
//! # Examples
//!
//! ```
//! use tapstat_records::{frame::Frame, table::RecordTable, value::Value};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let trials = Frame::from_columns([
//!     ("session_id".to_owned(), vec![Value::Int(1), Value::Int(1), Value::Int(2)]),
//!     ("position_in_session".to_owned(), vec![Value::Int(1), Value::Int(2), Value::Int(1)]),
//!     ("interval".to_owned(), vec![Value::Float(480.0), Value::Float(530.0), Value::Float(770.0)]),
//! ])?;
//! let sessions = Frame::from_columns([
//!     ("session_id".to_owned(), vec![Value::Int(1), Value::Int(2)]),
//!     ("target".to_owned(), vec![Value::Int(500), Value::Int(700)]),
//! ])?;
//! let table = RecordTable::new(trials, sessions)?;
//!
//! let slow = table.filter_trials("interval > 500", "target >= 500")?;
//! assert_eq!(slow.numeric("interval")?, [530.0, 770.0]);
//! assert_eq!(table.filter_sessions("target == 700")?.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod column;
pub mod frame;
pub mod predicate;
pub mod table;
pub mod value;

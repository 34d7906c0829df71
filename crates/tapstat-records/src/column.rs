use std::{borrow::Cow, collections::BTreeSet};

use crate::value::Value;

/// A read-only view of one column, optionally reindexed.
///
/// Views over a session column broadcast per trial and views over a trial
/// selection both carry a row mapping into the underlying storage.
#[derive(Debug, Clone)]
pub struct ColumnView<'a> {
    values: &'a [Value],
    rows: Option<Cow<'a, [usize]>>,
}

impl<'a> ColumnView<'a> {
    pub(crate) fn direct(values: &'a [Value]) -> Self {
        Self { values, rows: None }
    }

    pub(crate) fn mapped(values: &'a [Value], rows: impl Into<Cow<'a, [usize]>>) -> Self {
        Self {
            values,
            rows: Some(rows.into()),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.as_ref().map_or(self.values.len(), |rows| rows.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The value at position `i` of the view.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of range.
    #[must_use]
    pub fn get(&self, i: usize) -> &'a Value {
        match &self.rows {
            Some(rows) => &self.values[rows[i]],
            None => &self.values[i],
        }
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &'a Value> + '_ {
        (0..self.len()).map(|i| self.get(i))
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<Value> {
        self.iter().cloned().collect()
    }

    /// Numeric copy of the view with `NaN` for missing and non-numeric cells.
    #[must_use]
    pub fn to_f64(&self) -> Vec<f64> {
        self.iter().map(Value::to_f64).collect()
    }

    /// Distinct non-missing values in ascending order.
    #[must_use]
    pub fn distinct(&self) -> BTreeSet<Value> {
        self.iter().filter(|v| !v.is_missing()).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapped_view_broadcasts() {
        let values = [Value::Int(500), Value::Int(700)];
        let view = ColumnView::mapped(&values, vec![0, 0, 1, 1, 1]);
        assert_eq!(view.len(), 5);
        assert_eq!(view.to_f64(), [500.0, 500.0, 700.0, 700.0, 700.0]);
        assert_eq!(view.distinct().len(), 2);
    }

    #[test]
    fn test_distinct_skips_missing() {
        let values = [Value::Missing, Value::Float(1.0), Value::Int(1)];
        let view = ColumnView::direct(&values);
        assert_eq!(view.distinct().into_iter().collect::<Vec<_>>(), [Value::Int(1)]);
    }
}

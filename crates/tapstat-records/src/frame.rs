//! Column-ordered storage for one table view

use crate::{table::TableError, value::Value};

/// Named columns of equal length, in source order.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    names: Vec<String>,
    columns: Vec<Vec<Value>>,
    len: usize,
}

impl Frame {
    /// Builds a frame from `(name, values)` pairs.
    ///
    /// Fails if names repeat or columns differ in length.
    pub fn from_columns<I>(columns: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = (String, Vec<Value>)>,
    {
        let mut frame = Self::default();
        for (i, (name, values)) in columns.into_iter().enumerate() {
            if i == 0 {
                frame.len = values.len();
            }
            frame.push_column(name, values)?;
        }
        Ok(frame)
    }

    /// Builds a frame from a header row and data rows of raw text cells.
    ///
    /// Short rows are padded with missing cells.
    pub fn from_text_rows<R, C>(header: &[String], rows: R) -> Result<Self, TableError>
    where
        R: IntoIterator<Item = C>,
        C: AsRef<[String]>,
    {
        let mut columns = vec![Vec::new(); header.len()];
        for row in rows {
            let row = row.as_ref();
            for (i, column) in columns.iter_mut().enumerate() {
                column.push(row.get(i).map_or(Value::Missing, |raw| Value::parse(raw)));
            }
        }
        Self::from_columns(header.iter().cloned().zip(columns))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[Value]> {
        self.position(name).map(|i| self.columns[i].as_slice())
    }

    #[must_use]
    pub fn column_at(&self, index: usize) -> &[Value] {
        &self.columns[index]
    }

    /// Values of one row, in column order.
    pub fn row(&self, row: usize) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.names
            .iter()
            .zip(&self.columns)
            .map(move |(name, column)| (name.as_str(), &column[row]))
    }

    /// Appends a new column.
    pub fn push_column(&mut self, name: String, values: Vec<Value>) -> Result<(), TableError> {
        if self.position(&name).is_some() {
            return Err(TableError::DuplicateColumn { name });
        }
        if !self.names.is_empty() && values.len() != self.len {
            return Err(TableError::LengthMismatch {
                name,
                expected: self.len,
                actual: values.len(),
            });
        }
        self.len = values.len();
        self.names.push(name);
        self.columns.push(values);
        Ok(())
    }

    /// Replaces an existing column in place or appends it.
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) -> Result<(), TableError> {
        match self.position(name) {
            Some(i) if values.len() == self.len => {
                self.columns[i] = values;
                Ok(())
            }
            Some(_) => Err(TableError::LengthMismatch {
                name: name.to_owned(),
                expected: self.len,
                actual: values.len(),
            }),
            None => self.push_column(name.to_owned(), values),
        }
    }

    #[must_use]
    pub fn column_mut(&mut self, name: &str) -> Option<&mut [Value]> {
        let i = self.position(name)?;
        Some(self.columns[i].as_mut_slice())
    }

    /// Keeps the rows whose mask entry is `true`.
    ///
    /// # Panics
    ///
    /// Panics if the mask length differs from the frame length.
    pub fn retain_rows(&mut self, mask: &[bool]) {
        assert_eq!(mask.len(), self.len, "mask length must match frame length");
        for column in &mut self.columns {
            let mut keep = mask.iter();
            column.retain(|_| keep.next().copied().unwrap_or(false));
        }
        self.len = mask.iter().filter(|keep| **keep).count();
    }

    /// Reorders rows so that row `i` of the result is row `order[i]` of `self`.
    pub(crate) fn reorder_rows(&mut self, order: &[usize]) {
        for column in &mut self.columns {
            *column = order.iter().map(|&i| column[i].clone()).collect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Frame {
        Frame::from_columns([
            ("a".to_owned(), vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
            ("b".to_owned(), vec![Value::from("x"), Value::from("y"), Value::from("z")]),
        ])
        .unwrap()
    }

    #[test]
    fn test_rejects_duplicate_and_ragged_columns() {
        let mut f = frame();
        assert!(matches!(
            f.push_column("a".into(), vec![Value::Missing; 3]),
            Err(TableError::DuplicateColumn { .. })
        ));
        assert!(matches!(
            f.push_column("c".into(), vec![Value::Missing; 2]),
            Err(TableError::LengthMismatch { expected: 3, actual: 2, .. })
        ));
    }

    #[test]
    fn test_retain_and_reorder() {
        let mut f = frame();
        f.retain_rows(&[true, false, true]);
        assert_eq!(f.len(), 2);
        assert_eq!(f.get("a").unwrap(), &[Value::Int(1), Value::Int(3)]);
        f.reorder_rows(&[1, 0]);
        assert_eq!(f.get("b").unwrap(), &[Value::from("z"), Value::from("x")]);
    }

    #[test]
    fn test_from_text_rows_pads_short_rows() {
        let header = vec!["x".to_owned(), "y".to_owned()];
        let rows = vec![vec!["1".to_owned(), "2.5".to_owned()], vec!["3".to_owned()]];
        let f = Frame::from_text_rows(&header, rows).unwrap();
        assert_eq!(f.len(), 2);
        assert!(f.get("y").unwrap()[1].is_missing());
        assert_eq!(f.row(0).map(|(n, _)| n).collect::<Vec<_>>(), ["x", "y"]);
    }
}

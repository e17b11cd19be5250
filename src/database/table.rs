use crate::database::column::Label;
use crate::error::QueryError;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::Grid;
use std::collections::HashSet;

/// In-memory table a query transforms: ordered column labels plus same-width rows.
///
/// Every row always has exactly one value per label. Labels may repeat while a
/// pipeline runs; [`TabularBuffer::headers`] rejects duplicates before export.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TabularBuffer {
    labels: Vec<Label>,
    rows: Vec<Vec<CellValue>>,
}

/// Read-only view of one row, addressable by label or position.
#[derive(Copy, Clone, Debug)]
pub struct Record<'a> {
    labels: &'a [Label],
    values: &'a [CellValue],
}

impl<'a> Record<'a> {
    /// Value of the first column carrying `label`.
    pub fn get(&self, label: impl Into<Label>) -> Option<&'a CellValue> {
        let label = label.into();
        self.labels
            .iter()
            .position(|candidate| *candidate == label)
            .map(|index| &self.values[index])
    }

    pub fn value(&self, index: usize) -> Option<&'a CellValue> {
        self.values.get(index)
    }

    pub fn values(&self) -> &'a [CellValue] {
        self.values
    }
}

impl TabularBuffer {
    /// Builds a buffer, checking that every row matches the label count.
    pub fn new(labels: Vec<Label>, rows: Vec<Vec<CellValue>>) -> Result<Self, QueryError> {
        if let Some((index, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != labels.len()) {
            Err(QueryError::schema(format!(
                "row {index} has {} values but there are {} columns",
                row.len(),
                labels.len()
            )))?;
        }
        Ok(TabularBuffer { labels, rows })
    }

    /// Builds a positionally labelled buffer from a grid, padding short rows with nulls.
    pub fn from_grid(grid: Grid) -> Self {
        let width = grid.iter().map(Vec::len).max().unwrap_or(0);
        let rows = grid
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Empty);
                row
            })
            .collect();
        TabularBuffer {
            labels: Label::positions(width),
            rows,
        }
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column, top to bottom.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &CellValue> + '_ {
        self.rows.iter().filter_map(move |row| row.get(index))
    }

    /// Position of the first column carrying `label`.
    pub fn column_index(&self, label: &Label) -> Option<usize> {
        self.labels.iter().position(|candidate| candidate == label)
    }

    /// Like [`column_index`](Self::column_index) but a missing column is an error.
    pub fn require_column(&self, label: &Label) -> Result<usize, QueryError> {
        self.column_index(label)
            .ok_or_else(|| QueryError::schema(format!("column '{label}' not found")))
    }

    pub(crate) fn require_index(&self, index: usize) -> Result<(), QueryError> {
        if index < self.labels.len() {
            Ok(())
        } else {
            Err(QueryError::schema(format!(
                "column index {index} out of range for {} columns",
                self.labels.len()
            )))
        }
    }

    /// Keeps the rows for which `predicate` returns true.
    pub fn retain_rows<F>(&mut self, mut predicate: F)
    where
        F: FnMut(Record<'_>) -> bool,
    {
        let labels = &self.labels;
        self.rows.retain(|values| predicate(Record { labels, values }));
    }

    /// Relabels the first column carrying `from`.
    pub fn rename(&mut self, from: &Label, to: Label) -> Result<(), QueryError> {
        let index = self.require_column(from)?;
        self.labels[index] = to;
        Ok(())
    }

    /// Relabels the column at `index`.
    pub fn set_label(&mut self, index: usize, label: Label) -> Result<(), QueryError> {
        self.require_index(index)?;
        self.labels[index] = label;
        Ok(())
    }

    pub(crate) fn rows_mut(&mut self) -> &mut Vec<Vec<CellValue>> {
        &mut self.rows
    }

    pub(crate) fn replace_labels(&mut self, labels: Vec<Label>) {
        debug_assert_eq!(labels.len(), self.labels.len());
        self.labels = labels;
    }

    /// Writes `values` into the column labelled `label`, appending the column when absent.
    pub(crate) fn assign_column(&mut self, label: Label, values: Vec<CellValue>) {
        debug_assert_eq!(values.len(), self.rows.len());
        match self.column_index(&label) {
            Some(index) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[index] = value;
                }
            }
            None => {
                self.labels.push(label);
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
    }

    /// Removes columns by position. Indices must be valid; duplicates are ignored.
    pub(crate) fn remove_columns(&mut self, indices: &[usize]) {
        let mut indices: Vec<usize> = indices.to_vec();
        indices.sort_unstable();
        indices.dedup();
        for index in indices.into_iter().rev() {
            self.labels.remove(index);
            for row in &mut self.rows {
                row.remove(index);
            }
        }
    }

    /// Header texts for export. Fails when two labels render to the same text.
    pub fn headers(&self) -> Result<Vec<String>, QueryError> {
        let headers: Vec<String> = self.labels.iter().map(Label::to_string).collect();
        let mut seen = HashSet::new();
        for header in &headers {
            if !seen.insert(header.as_str()) {
                Err(QueryError::schema(format!("duplicate column '{header}'")))?;
            }
        }
        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> TabularBuffer {
        TabularBuffer::new(
            vec![Label::from("Region"), Label::from("Qty"), Label::Position(2)],
            vec![
                vec!["East".into(), 3.into(), CellValue::Empty],
                vec!["West".into(), 5.into(), "x".into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn rejects_ragged_rows() {
        let result = TabularBuffer::new(vec![Label::Position(0)], vec![vec![1.into(), 2.into()]]);
        assert!(matches!(result, Err(QueryError::SchemaMismatch(_))));
    }

    #[test]
    fn grid_is_padded() {
        let buffer = TabularBuffer::from_grid(vec![vec![1.into()], vec![1.into(), 2.into(), 3.into()]]);
        assert_eq!(buffer.labels(), Label::positions(3).as_slice());
        assert_eq!(buffer.rows()[0], vec![CellValue::Number(1.0), CellValue::Empty, CellValue::Empty]);
    }

    #[test]
    fn filter_and_rename() {
        let mut buffer = sample();
        buffer.retain_rows(|record| record.get("Region") != Some(&CellValue::from("East")));
        assert_eq!(buffer.row_count(), 1);

        buffer.rename(&Label::from("Qty"), Label::from("Quantity")).unwrap();
        buffer.set_label(2, Label::from("Flag")).unwrap();
        assert_eq!(buffer.headers().unwrap(), vec!["Region", "Quantity", "Flag"]);
        assert!(buffer.rename(&Label::from("Qty"), Label::from("Again")).is_err());
        assert!(buffer.set_label(3, Label::from("Nope")).is_err());
    }

    #[test]
    fn assign_and_remove_columns() {
        let mut buffer = sample();
        buffer.assign_column(Label::from("Qty"), vec![1.into(), 2.into()]);
        buffer.assign_column(Label::from("New"), vec!["a".into(), "b".into()]);
        assert_eq!(buffer.column_count(), 4);
        assert_eq!(buffer.column(1).cloned().collect::<Vec<_>>(), vec![CellValue::from(1), CellValue::from(2)]);

        buffer.remove_columns(&[3, 0, 0]);
        assert_eq!(buffer.labels(), &[Label::from("Qty"), Label::Position(2)]);
        assert_eq!(buffer.rows()[1], vec![CellValue::from(2), CellValue::from("x")]);
    }

    #[test]
    fn headers_must_be_unique() {
        let buffer = TabularBuffer::new(vec![Label::from("2"), Label::Position(2)], vec![]).unwrap();
        assert!(matches!(buffer.headers(), Err(QueryError::SchemaMismatch(_))));
    }
}

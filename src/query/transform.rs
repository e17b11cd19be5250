//! Row and column operators applied to a query's buffer.
//!
//! Every operator mutates the buffer in place and is applied exactly when called; a
//! failing operator leaves the buffer untouched.
use crate::database::column::Label;
use crate::database::table::TabularBuffer;
use crate::error::QueryError;
use crate::spreadsheet::cell::CellValue;
use regex::NoExpand;
use regex::Regex;
use std::fmt::Display;

/// Direction of a null fill.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FillMethod {
    /// Copy the nearest value above
    Forward,
    /// Copy the nearest value below
    Backward,
}

/// Text pattern for split, extract and replace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TextPattern {
    Literal(String),
    Regex(String),
}

impl TextPattern {
    pub fn literal(text: impl Into<String>) -> Self {
        TextPattern::Literal(text.into())
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        TextPattern::Regex(pattern.into())
    }

    fn source(&self) -> &str {
        match self {
            TextPattern::Literal(text) | TextPattern::Regex(text) => text,
        }
    }

    fn error(&self, message: impl Display) -> QueryError {
        QueryError::PatternError {
            pattern: self.source().to_owned(),
            message: message.to_string(),
        }
    }

    fn compile(&self) -> Result<Regex, QueryError> {
        if self.source().is_empty() {
            return Err(self.error("empty pattern"));
        }
        let regex = match self {
            TextPattern::Literal(text) => Regex::new(&regex::escape(text)),
            TextPattern::Regex(pattern) => Regex::new(pattern),
        };
        regex.map_err(|error| self.error(error))
    }
}

impl From<&str> for TextPattern {
    fn from(value: &str) -> Self {
        TextPattern::Literal(value.to_owned())
    }
}

fn check_row_count(buffer: &TabularBuffer, n: usize, operator: &str) -> Result<(), QueryError> {
    if n > buffer.row_count() {
        Err(QueryError::schema(format!(
            "{operator}({n}) on a buffer of {} rows",
            buffer.row_count()
        )))
    } else {
        Ok(())
    }
}

pub fn remove_first_rows(buffer: &mut TabularBuffer, n: usize) -> Result<(), QueryError> {
    check_row_count(buffer, n, "remove_first_rows")?;
    buffer.rows_mut().drain(..n);
    Ok(())
}

pub fn remove_last_rows(buffer: &mut TabularBuffer, n: usize) -> Result<(), QueryError> {
    check_row_count(buffer, n, "remove_last_rows")?;
    let keep = buffer.row_count() - n;
    buffer.rows_mut().truncate(keep);
    Ok(())
}

/// Turns the first row into labels. Blank header cells keep their current label.
pub fn promote_headers(buffer: &mut TabularBuffer) -> Result<(), QueryError> {
    if buffer.is_empty() {
        return Err(QueryError::schema("promote_headers on an empty buffer"));
    }
    let header = buffer.rows_mut().remove(0);
    let labels = header
        .iter()
        .zip(buffer.labels())
        .map(|(cell, fallback)| Label::from_header(cell, fallback))
        .collect();
    buffer.replace_labels(labels);
    Ok(())
}

/// Uses row `row` (0-based) as labels, discarding the rows above it.
pub fn promote_header_row(buffer: &mut TabularBuffer, row: usize) -> Result<(), QueryError> {
    if row >= buffer.row_count() {
        return Err(QueryError::schema(format!(
            "header row {row} on a buffer of {} rows",
            buffer.row_count()
        )));
    }
    buffer.rows_mut().drain(..row);
    promote_headers(buffer)
}

/// Propagates non-null values into null cells of the selected columns (all when `None`).
pub fn fillna(buffer: &mut TabularBuffer, columns: Option<&[Label]>, method: FillMethod) -> Result<(), QueryError> {
    let indices: Vec<usize> = match columns {
        None => (0..buffer.column_count()).collect(),
        Some(labels) => labels
            .iter()
            .map(|label| buffer.require_column(label))
            .collect::<Result<_, _>>()?,
    };

    let rows = buffer.rows_mut();
    for index in indices {
        let mut last: Option<CellValue> = None;
        let mut fill = |row: &mut Vec<CellValue>| {
            let cell = &mut row[index];
            if cell.is_empty() {
                if let Some(value) = &last {
                    *cell = value.to_owned();
                }
            } else {
                last = Some(cell.to_owned());
            }
        };
        match method {
            FillMethod::Forward => rows.iter_mut().for_each(&mut fill),
            FillMethod::Backward => rows.iter_mut().rev().for_each(&mut fill),
        }
    }
    Ok(())
}

/// Splits text cells of `column` on the first occurrences of `pattern`.
///
/// Outputs default to `<column>.1` and `<column>.2`. Missing parts are null; a non-text
/// value goes to the first output unchanged.
pub fn split_text_column(
    buffer: &mut TabularBuffer,
    column: &Label,
    pattern: &TextPattern,
    columns: Option<&[Label]>,
) -> Result<(), QueryError> {
    let source = buffer.require_column(column)?;
    let regex = pattern.compile()?;
    let outputs: Vec<Label> = match columns {
        Some(labels) => labels.to_vec(),
        None => vec![Label::Name(format!("{column}.1")), Label::Name(format!("{column}.2"))],
    };
    if outputs.is_empty() {
        return Err(pattern.error("no output columns"));
    }

    let width = outputs.len();
    let mut parts: Vec<Vec<CellValue>> = vec![Vec::with_capacity(buffer.row_count()); width];
    for row in buffer.rows() {
        let mut values = match &row[source] {
            CellValue::Text(text) => regex.splitn(text, width).map(CellValue::from).collect(),
            CellValue::Empty => Vec::new(),
            value => vec![value.to_owned()],
        };
        values.resize(width, CellValue::Empty);
        for (part, value) in parts.iter_mut().zip(values) {
            part.push(value);
        }
    }

    for (label, values) in outputs.into_iter().zip(parts) {
        buffer.assign_column(label, values);
    }
    Ok(())
}

/// Writes each capture group of `pattern` into the matching output column.
pub fn extract_text_column(
    buffer: &mut TabularBuffer,
    column: &Label,
    pattern: &TextPattern,
    columns: &[Label],
) -> Result<(), QueryError> {
    let source = buffer.require_column(column)?;
    let regex = pattern.compile()?;
    let groups = regex.captures_len() - 1;
    if groups != columns.len() {
        return Err(pattern.error(format!(
            "{groups} capture groups for {} output columns",
            columns.len()
        )));
    }

    let mut outputs: Vec<Vec<CellValue>> = vec![Vec::with_capacity(buffer.row_count()); groups];
    for row in buffer.rows() {
        let captures = row[source].as_text().and_then(|text| regex.captures(text));
        for (group, output) in outputs.iter_mut().enumerate() {
            let value = captures
                .as_ref()
                .and_then(|captures| captures.get(group + 1))
                .map(|matched| CellValue::from(matched.as_str()))
                .unwrap_or_default();
            output.push(value);
        }
    }

    for (label, values) in columns.iter().cloned().zip(outputs) {
        buffer.assign_column(label, values);
    }
    Ok(())
}

/// Replaces every occurrence of `pattern` in the text cells of `column`.
///
/// A regex replacement may refer to groups (`$1`); a literal one is inserted as-is.
pub fn replace_value_text_column(
    buffer: &mut TabularBuffer,
    column: &Label,
    pattern: &TextPattern,
    replacement: &str,
) -> Result<(), QueryError> {
    let source = buffer.require_column(column)?;
    let regex = pattern.compile()?;
    for row in buffer.rows_mut() {
        if let CellValue::Text(text) = &row[source] {
            let replaced = match pattern {
                TextPattern::Literal(_) => regex.replace_all(text, NoExpand(replacement)),
                TextPattern::Regex(_) => regex.replace_all(text, replacement),
            };
            row[source] = CellValue::Text(replaced.into_owned());
        }
    }
    Ok(())
}

/// Removes columns by their position in the current layout.
pub fn drop_columns_idx(buffer: &mut TabularBuffer, indices: &[usize]) -> Result<(), QueryError> {
    for index in indices {
        buffer.require_index(*index)?;
    }
    buffer.remove_columns(indices);
    Ok(())
}

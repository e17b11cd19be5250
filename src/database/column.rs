use crate::spreadsheet::cell::CellValue;
use std::fmt::Display;

/// Column label of a tabular buffer.
///
/// Data read without header interpretation is labelled by position (`0`, `1`, ...);
/// promoting a header row replaces positions with names.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Label {
    /// Header text
    Name(String),
    /// Positional placeholder (0-based)
    Position(usize),
}

impl Label {
    /// Label for a header cell, falling back to `fallback` when the cell is blank.
    pub(crate) fn from_header(cell: &CellValue, fallback: &Label) -> Label {
        if cell.is_blank() {
            fallback.to_owned()
        } else {
            Label::Name(cell.to_string())
        }
    }

    /// Label for a header string read from a table, positional when blank.
    pub(crate) fn from_header_text(text: &str, position: usize) -> Label {
        if text.trim().is_empty() {
            Label::Position(position)
        } else {
            Label::Name(text.to_owned())
        }
    }

    /// Positional labels `0..count`.
    pub(crate) fn positions(count: usize) -> Vec<Label> {
        (0..count).map(Label::Position).collect()
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Label::Name(name) => write!(f, "{name}"),
            Label::Position(position) => write!(f, "{position}"),
        }
    }
}

impl From<&str> for Label {
    fn from(value: &str) -> Self {
        Label::Name(value.to_owned())
    }
}

impl From<String> for Label {
    fn from(value: String) -> Self {
        Label::Name(value)
    }
}

impl From<&String> for Label {
    fn from(value: &String) -> Self {
        Label::Name(value.to_owned())
    }
}

impl From<usize> for Label {
    fn from(value: usize) -> Self {
        Label::Position(value)
    }
}

impl From<&Label> for Label {
    fn from(value: &Label) -> Self {
        value.to_owned()
    }
}

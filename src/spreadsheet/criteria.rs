//! Auto-filter view state of a table: which rows are visible, per column.
use crate::spreadsheet::cell::CellValue;

/// How multiple criteria of one column combine.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum FilterJoin {
    /// Any criterion may match (logical OR).
    #[default]
    Any,
    /// All criteria must match (logical AND).
    All,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TextMatchKind {
    Equals,
    Contains,
    BeginsWith,
    EndsWith,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NumberComparison {
    Equal(f64),
    NotEqual(f64),
    GreaterThan(f64),
    GreaterThanOrEqual(f64),
    LessThan(f64),
    LessThanOrEqual(f64),
}

/// A single row-visibility predicate on one column.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterCriterion {
    /// Show rows whose displayed text is one of these values (`<filters><filter val/>`).
    Values(Vec<String>),
    /// Case-insensitive text match.
    Text { kind: TextMatchKind, pattern: String },
    Number(NumberComparison),
    Blanks,
    NonBlanks,
}

impl FilterCriterion {
    /// Checks whether a cell passes this criterion.
    pub fn matches(&self, value: &CellValue) -> bool {
        match self {
            FilterCriterion::Values(values) => {
                let text = value.to_string();
                values.iter().any(|candidate| candidate.eq_ignore_ascii_case(&text))
            }
            FilterCriterion::Text { kind, pattern } => {
                let text = value.to_string().to_lowercase();
                let pattern = pattern.to_lowercase();
                match kind {
                    TextMatchKind::Equals => text == pattern,
                    TextMatchKind::Contains => text.contains(&pattern),
                    TextMatchKind::BeginsWith => text.starts_with(&pattern),
                    TextMatchKind::EndsWith => text.ends_with(&pattern),
                }
            }
            FilterCriterion::Number(comparison) => match value.as_number() {
                Some(number) => match comparison {
                    NumberComparison::Equal(other) => number == *other,
                    NumberComparison::NotEqual(other) => number != *other,
                    NumberComparison::GreaterThan(other) => number > *other,
                    NumberComparison::GreaterThanOrEqual(other) => number >= *other,
                    NumberComparison::LessThan(other) => number < *other,
                    NumberComparison::LessThanOrEqual(other) => number <= *other,
                },
                None => false,
            },
            FilterCriterion::Blanks => value.is_blank(),
            FilterCriterion::NonBlanks => !value.is_blank(),
        }
    }
}

/// Filter definition for one column, addressed by its header text.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterColumn {
    pub column: String,
    pub join: FilterJoin,
    pub criteria: Vec<FilterCriterion>,
}

impl FilterColumn {
    pub fn new(column: impl Into<String>, criterion: FilterCriterion) -> Self {
        FilterColumn {
            column: column.into(),
            join: FilterJoin::Any,
            criteria: vec![criterion],
        }
    }

    pub fn matches(&self, value: &CellValue) -> bool {
        match self.join {
            FilterJoin::Any => self.criteria.iter().any(|criterion| criterion.matches(value)),
            FilterJoin::All => self.criteria.iter().all(|criterion| criterion.matches(value)),
        }
    }
}

/// The set of active filter predicates on a table. Empty means every row is shown.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterState {
    pub columns: Vec<FilterColumn>,
}

impl FilterState {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn with_column(mut self, column: FilterColumn) -> Self {
        self.columns.push(column);
        self
    }

    /// Keeps only predicates whose column is among `headers`.
    /// Returns the names of the columns whose predicates were dropped.
    pub fn retain_columns(&mut self, headers: &[String]) -> Vec<String> {
        let mut dropped = Vec::new();
        self.columns.retain(|filter| {
            let keep = headers.iter().any(|header| header == &filter.column);
            if !keep {
                dropped.push(filter.column.to_owned());
            }
            keep
        });
        dropped
    }

    /// Checks a row against every column predicate (columns combine with AND).
    pub fn accepts(&self, headers: &[String], row: &[CellValue]) -> bool {
        self.columns.iter().all(|filter| {
            match headers.iter().position(|header| header == &filter.column) {
                Some(index) => filter.matches(row.get(index).unwrap_or(&CellValue::Empty)),
                None => true,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn criterion_matching() {
        let values = FilterCriterion::Values(vec!["north".to_owned(), "2".to_owned()]);
        assert!(values.matches(&CellValue::from("North")));
        assert!(values.matches(&CellValue::Number(2.0)));
        assert!(!values.matches(&CellValue::from("south")));

        let contains = FilterCriterion::Text {
            kind: TextMatchKind::Contains,
            pattern: "OR".to_owned(),
        };
        assert!(contains.matches(&CellValue::from("north")));

        let greater = FilterCriterion::Number(NumberComparison::GreaterThan(10.0));
        assert!(greater.matches(&CellValue::Number(11.0)));
        assert!(!greater.matches(&CellValue::from("11")));

        assert!(FilterCriterion::Blanks.matches(&CellValue::from("  ")));
        assert!(FilterCriterion::NonBlanks.matches(&CellValue::Number(0.0)));
    }

    #[test]
    fn join_all() {
        let column = FilterColumn {
            column: "Qty".to_owned(),
            join: FilterJoin::All,
            criteria: vec![
                FilterCriterion::Number(NumberComparison::GreaterThanOrEqual(1.0)),
                FilterCriterion::Number(NumberComparison::LessThan(5.0)),
            ],
        };
        assert!(column.matches(&CellValue::Number(4.0)));
        assert!(!column.matches(&CellValue::Number(5.0)));
    }

    #[test]
    fn retain_and_accept() {
        let mut state = FilterState::default()
            .with_column(FilterColumn::new("Region", FilterCriterion::Values(vec!["East".to_owned()])))
            .with_column(FilterColumn::new("Gone", FilterCriterion::NonBlanks));
        let headers = vec!["Region".to_owned(), "Qty".to_owned()];

        assert_eq!(state.retain_columns(&headers), vec!["Gone".to_owned()]);
        assert_eq!(state.columns.len(), 1);
        assert!(state.accepts(&headers, &[CellValue::from("East"), CellValue::Number(1.0)]));
        assert!(!state.accepts(&headers, &[CellValue::from("West"), CellValue::Number(1.0)]));
    }
}

use crate::spreadsheet::reference::col_to_index;
use crate::spreadsheet::reference::row_to_index;
use crate::spreadsheet::reference::CellRef;
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors related to Excel-style range parsing.
#[derive(Error, Debug)]
pub enum RangeError {
    #[error("Invalid range format '{0}'")]
    FormatError(String),
}

/// Represents an Excel-style cell range with optional boundaries.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Range {
    /// Lower row bound (0-based index), None for unbounded
    pub row_lower_bound: Option<usize>,
    /// Upper row bound (0-based index), None for unbounded
    pub row_upper_bound: Option<usize>,
    /// Lower column bound (0-based index), None for unbounded
    pub col_lower_bound: Option<usize>,
    /// Upper column bound (0-based index), None for unbounded
    pub col_upper_bound: Option<usize>,
}

impl Range {
    /// Range covering exactly the rectangle between two corners (inclusive).
    pub fn between(first: CellRef, last: CellRef) -> Self {
        Range {
            row_lower_bound: Some(first.row.min(last.row)),
            row_upper_bound: Some(first.row.max(last.row)),
            col_lower_bound: Some(first.col.min(last.col)),
            col_upper_bound: Some(first.col.max(last.col)),
        }
    }

    /// Minimal rectangle containing every given cell; unbounded when there are none.
    pub fn bounding<I>(cells: I) -> Self
    where
        I: IntoIterator<Item = CellRef>,
    {
        cells.into_iter().fold(Range::default(), |mut range, cell| {
            range.extend(cell);
            range
        })
    }

    /// Grows the range so that it contains `cell`.
    pub fn extend(&mut self, cell: CellRef) {
        if self.row_lower_bound.map(|row| cell.row < row).unwrap_or(true) {
            self.row_lower_bound = Some(cell.row);
        }
        if self.row_upper_bound.map(|row| row < cell.row).unwrap_or(true) {
            self.row_upper_bound = Some(cell.row);
        }
        if self.col_lower_bound.map(|col| cell.col < col).unwrap_or(true) {
            self.col_lower_bound = Some(cell.col);
        }
        if self.col_upper_bound.map(|col| col < cell.col).unwrap_or(true) {
            self.col_upper_bound = Some(cell.col);
        }
    }

    /// Top-left cell when both lower bounds are set.
    pub fn first(&self) -> Option<CellRef> {
        Some(CellRef::new(self.row_lower_bound?, self.col_lower_bound?))
    }

    /// Row count of a fully bounded range; `None` when the bounds are reversed.
    pub fn height(&self) -> Option<usize> {
        Some(self.row_upper_bound?.checked_sub(self.row_lower_bound?)? + 1)
    }

    /// Column count of a fully bounded range; `None` when the bounds are reversed.
    pub fn width(&self) -> Option<usize> {
        Some(self.col_upper_bound?.checked_sub(self.col_lower_bound?)? + 1)
    }

    /// Checks if a cell is inside the range. Unbounded sides accept everything.
    pub fn contains(&self, cell: CellRef) -> bool {
        self.row_lower_bound.map(|row| row <= cell.row).unwrap_or(true)
            && self.row_upper_bound.map(|row| cell.row <= row).unwrap_or(true)
            && self.col_lower_bound.map(|col| col <= cell.col).unwrap_or(true)
            && self.col_upper_bound.map(|col| cell.col <= col).unwrap_or(true)
    }
}

impl TryFrom<&str> for Range {
    type Error = RangeError;

    /// Parses an Excel-style range string (e.g., "A1", "B2:C5", "A", "1:10").
    /// Supports single cells, ranges, and partial ranges (columns or rows only).
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| {
            Regex::new(r"^\$?([A-Z]*)\$?(\d*)(:\$?([A-Z]*)\$?(\d*))?$").expect("Hardcode regex pattern")
        });
        let value = value.to_ascii_uppercase();
        let captures = pattern
            .captures(value.as_str())
            .ok_or(RangeError::FormatError(value.to_owned()))?;
        let group = |index: usize| captures.get(index).map(|matcher| matcher.as_str());
        let mut range = Range {
            col_lower_bound: group(1).and_then(col_to_index),
            row_lower_bound: group(2).and_then(row_to_index),
            col_upper_bound: group(4).and_then(col_to_index),
            row_upper_bound: group(5).and_then(row_to_index),
        };
        if captures.get(3).is_none() {
            // A single cell or line is its own upper bound
            range.col_upper_bound = range.col_lower_bound;
            range.row_upper_bound = range.row_lower_bound;
        }
        // `C3:A1` names the same rectangle as `A1:C3`
        if let (Some(lower), Some(upper)) = (range.row_lower_bound, range.row_upper_bound) {
            range.row_lower_bound = Some(lower.min(upper));
            range.row_upper_bound = Some(lower.max(upper));
        }
        if let (Some(lower), Some(upper)) = (range.col_lower_bound, range.col_upper_bound) {
            range.col_lower_bound = Some(lower.min(upper));
            range.col_upper_bound = Some(lower.max(upper));
        }
        Ok(range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ranges() {
        let range = Range::try_from("B2:D10").unwrap();
        assert_eq!(range.first(), Some(CellRef::new(1, 1)));
        assert_eq!(range.height(), Some(9));
        assert_eq!(range.width(), Some(3));

        let range = Range::try_from("$a$1").unwrap();
        assert_eq!(range, Range::between(CellRef::ORIGIN, CellRef::ORIGIN));

        assert!(Range::try_from("A1:B2:C3").is_err());
    }

    #[test]
    fn reversed_corners_are_normalized() {
        let range = Range::try_from("C3:A1").unwrap();
        assert_eq!(range, Range::try_from("A1:C3").unwrap());
        assert_eq!((range.height(), range.width()), (Some(3), Some(3)));

        let inverted = Range {
            row_lower_bound: Some(4),
            row_upper_bound: Some(1),
            col_lower_bound: Some(2),
            col_upper_bound: Some(0),
        };
        assert_eq!((inverted.height(), inverted.width()), (None, None));
    }

    #[test]
    fn bounding_box() {
        let range = Range::bounding([CellRef::new(3, 1), CellRef::new(1, 4), CellRef::new(2, 2)]);
        assert_eq!(range, Range::between(CellRef::new(1, 1), CellRef::new(3, 4)));
        assert!(range.contains(CellRef::new(2, 3)));
        assert!(!range.contains(CellRef::new(0, 3)));

        let empty = Range::bounding(Vec::<CellRef>::new());
        assert_eq!(empty.first(), None);
        assert_eq!(empty.height(), None);
    }
}

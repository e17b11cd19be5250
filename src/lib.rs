//! # Spreadsheet Query Engine
//!
//! A small extract-transform-load engine for spreadsheet documents: pull a rectangular
//! region out of a workbook, clean it with an ordered sequence of row and column
//! operators, and write the result back into a destination workbook as a named table,
//! without losing the auto-filter a user set on that table.
//!
//! ## Features
//!
//! - **Idempotent resolution**: re-running a query reuses the open workbook, sheet and
//!   table instead of opening or creating duplicates; file names are compared after
//!   Unicode normalization
//! - **Fuzzy sources**: optional approximate matching of source file names
//! - **Transform operators**: row trimming, header promotion, null filling, text
//!   split/extract/replace, column drops, plus ad-hoc row filters and relabeling
//! - **View-state preservation**: the destination table's filter is captured, cleared for
//!   the overwrite and restored afterwards
//! - **Pluggable backend**: everything goes through [`SpreadsheetBackend`]; the bundled
//!   [`MemoryBackend`] loads `.xlsx` / `.xlsm` files from disk
//!
//! ## Example
//!
//! ```no_run
//! use sheet_query::{FillMethod, Label, MemoryBackend, Query, QueryError};
//!
//! # fn main() -> Result<(), QueryError> {
//! let mut backend = MemoryBackend::new();
//! Query::run(&mut backend, "reports/etl.xlsx", "Clean", |query| {
//!     query
//!         .select_source("reports/source.xlsx")?
//!         .navigate("Sheet1", None)?
//!         .remove_first_rows(4)?
//!         .fillna(Some(&[Label::Position(0)][..]), FillMethod::Forward)?
//!         .promote_headers()?;
//!     Ok(())
//! })?;
//! # Ok(())
//! # }
//! ```
mod helpers;

pub mod config;
pub mod database;
pub mod error;
pub mod query;
pub mod spreadsheet;

pub use crate::config::QueryConfig;
pub use crate::database::column::Label;
pub use crate::database::table::Record;
pub use crate::database::table::TabularBuffer;
pub use crate::error::QueryError;
pub use crate::error::SourceKind;
pub use crate::query::resolver::SheetRef;
pub use crate::query::transform::FillMethod;
pub use crate::query::transform::TextPattern;
pub use crate::query::Query;
pub use crate::spreadsheet::cell::CellValue;
pub use crate::spreadsheet::memory::MemoryBackend;
pub use crate::spreadsheet::NameResolver;
pub use crate::spreadsheet::SpreadsheetBackend;

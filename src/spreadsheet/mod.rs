//! # Spreadsheet Backend
//!
//! The capability the query engine consumes to reach live spreadsheet documents: the host
//! application, its open documents, their sheets and tables, cell contents and auto-filter
//! state. The engine never talks to a document format directly; everything goes through
//! [`SpreadsheetBackend`].
//!
//! [`MemoryBackend`](memory::MemoryBackend) is an in-process implementation that loads
//! `.xlsx` files through the [`xlsx`] loader and keeps all edits in memory.
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::criteria::FilterState;
use crate::spreadsheet::reference::CellRef;
use std::fmt::Debug;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;

pub mod cell;
pub mod criteria;
pub mod fuzzy;
pub mod memory;
pub mod reference;
pub mod xlsx;

/// Rectangular block of cell values, row-major.
pub type Grid = Vec<Vec<CellValue>>;

/// Errors raised by a backend implementation.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The host application cannot be launched or reached
    #[error("{0}")]
    Unavailable(String),

    /// The document path does not exist
    #[error("File '{}' not found", .0.display())]
    FileNotFound(PathBuf),

    /// A handle does not refer to a live document, sheet or table
    #[error("Invalid {kind} handle")]
    InvalidHandle { kind: &'static str },

    /// A sheet or table with this name already exists
    #[error("{kind} '{name}' already exists")]
    DuplicateName { kind: &'static str, name: String },

    /// Table contents and headers disagree in shape
    #[error("Invalid table '{name}': {message}")]
    InvalidTable { name: String, message: String },

    #[error("{0}")]
    Xlsx(#[from] xlsx::XlsxError),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// A named live object as listed by the backend.
#[derive(Clone, Debug, PartialEq)]
pub struct Entry<H> {
    pub name: String,
    pub handle: H,
}

impl<H> Entry<H> {
    pub fn new(name: impl Into<String>, handle: H) -> Self {
        Entry {
            name: name.into(),
            handle,
        }
    }
}

/// Narrow interface to a spreadsheet application and its documents.
///
/// Handles are opaque to the engine. Two handles compare equal when they refer to the
/// same live object, which is how the resolver's no-duplicates guarantee is observed.
pub trait SpreadsheetBackend {
    type Document: Clone + PartialEq + Debug;
    type Sheet: Clone + PartialEq + Debug;
    type Table: Clone + PartialEq + Debug;

    fn is_application_running(&self) -> bool;

    fn launch_application(&mut self, visible: bool) -> Result<(), BackendError>;

    /// Open documents, named by file name (no directory).
    fn list_open_documents(&self) -> Result<Vec<Entry<Self::Document>>, BackendError>;

    fn open_document(&mut self, path: &Path) -> Result<Self::Document, BackendError>;

    fn list_sheets(&self, document: &Self::Document) -> Result<Vec<Entry<Self::Sheet>>, BackendError>;

    fn add_sheet(&mut self, document: &Self::Document, name: &str) -> Result<Self::Sheet, BackendError>;

    fn list_tables(&self, sheet: &Self::Sheet) -> Result<Vec<Entry<Self::Table>>, BackendError>;

    fn add_table(&mut self, sheet: &Self::Sheet, name: &str, anchor: CellRef) -> Result<Self::Table, BackendError>;

    /// Every cell of the minimal rectangle containing any non-empty cell.
    fn read_used_range(&self, sheet: &Self::Sheet) -> Result<Grid, BackendError>;

    /// Data rows of a table, without the header row.
    fn read_table_body(&self, table: &Self::Table) -> Result<Grid, BackendError>;

    fn read_table_headers(&self, table: &Self::Table) -> Result<Vec<String>, BackendError>;

    /// Replaces the table's header row and data body.
    fn write_table(&mut self, table: &Self::Table, rows: &[Vec<CellValue>], headers: &[String]) -> Result<(), BackendError>;

    fn get_filter_state(&self, table: &Self::Table) -> Result<FilterState, BackendError>;

    /// Shows all rows.
    fn clear_filters(&mut self, table: &Self::Table) -> Result<(), BackendError>;

    fn apply_filter_state(&mut self, table: &Self::Table, state: &FilterState) -> Result<(), BackendError>;
}

/// Picks the file name closest to a target among candidates.
pub trait NameResolver {
    /// Returns `None` when no candidate is close enough or several are equally close.
    fn best_match(&self, target: &str, candidates: &[String]) -> Option<String>;
}

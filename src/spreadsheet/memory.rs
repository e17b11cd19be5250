//! In-process spreadsheet backend.
//!
//! Documents live in memory: they are either registered up front with
//! [`MemoryBackend::register_file`] or loaded from disk through the xlsx loader.
//! Edits are never written back to disk.
use crate::database::range::Range;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::criteria::FilterState;
use crate::spreadsheet::reference::CellRef;
use crate::spreadsheet::xlsx;
use crate::spreadsheet::BackendError;
use crate::spreadsheet::Entry;
use crate::spreadsheet::Grid;
use crate::spreadsheet::SpreadsheetBackend;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use tracing::debug;

/// A workbook held in memory.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    /// File name, without directory
    pub name: String,
    pub path: PathBuf,
    pub sheets: Vec<Sheet>,
}

impl Document {
    pub fn new(name: &str) -> Self {
        Document {
            name: name.to_owned(),
            path: PathBuf::from(name),
            sheets: Vec::new(),
        }
    }

    pub fn with_sheet(mut self, sheet: Sheet) -> Self {
        self.sheets.push(sheet);
        self
    }
}

/// A named page of cells. Only non-empty cells are stored.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub cells: BTreeMap<CellRef, CellValue>,
    pub tables: Vec<Table>,
}

impl Sheet {
    pub fn new(name: &str) -> Self {
        Sheet {
            name: name.to_owned(),
            ..Default::default()
        }
    }

    /// Writes a grid with its top-left corner at `anchor`.
    pub fn with_rows(mut self, anchor: CellRef, grid: Grid) -> Self {
        for (row, values) in grid.into_iter().enumerate() {
            for (col, value) in values.into_iter().enumerate() {
                self.set(CellRef::new(anchor.row + row, anchor.col + col), value);
            }
        }
        self
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    /// Sets a cell; an empty value clears it.
    pub fn set(&mut self, cell: CellRef, value: CellValue) {
        if value.is_empty() {
            self.cells.remove(&cell);
        } else {
            self.cells.insert(cell, value);
        }
    }

    pub fn get(&self, cell: CellRef) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.cells.get(&cell).unwrap_or(&EMPTY)
    }

    /// Minimal rectangle containing every non-empty cell.
    pub fn used_range(&self) -> Range {
        Range::bounding(self.cells.keys().copied())
    }

    fn read(&self, range: &Range) -> Grid {
        let (Some(first), Some(height), Some(width)) = (range.first(), range.height(), range.width()) else {
            return Grid::new();
        };
        (0..height)
            .map(|row| {
                (0..width)
                    .map(|col| self.get(CellRef::new(first.row + row, first.col + col)).to_owned())
                    .collect()
            })
            .collect()
    }

    fn clear(&mut self, range: &Range) {
        self.cells.retain(|cell, _| !range.contains(*cell));
    }
}

/// A structured range: a header row at `anchor`, `rows` data rows, then `totals` rows.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    pub name: String,
    pub anchor: CellRef,
    pub width: usize,
    /// Data rows, header and totals excluded
    pub rows: usize,
    pub totals: usize,
    pub filter: FilterState,
}

impl Table {
    /// An empty, headerless table at `anchor`.
    pub fn new(name: &str, anchor: CellRef) -> Self {
        Table {
            name: name.to_owned(),
            anchor,
            width: 0,
            rows: 0,
            totals: 0,
            filter: FilterState::default(),
        }
    }

    pub fn with_size(mut self, width: usize, rows: usize) -> Self {
        self.width = width;
        self.rows = rows;
        self
    }

    pub fn with_totals(mut self, totals: usize) -> Self {
        self.totals = totals;
        self
    }

    /// Header, body and totals; `None` while the table has no columns.
    fn range(&self) -> Option<Range> {
        if self.width == 0 {
            return None;
        }
        let last = CellRef::new(
            self.anchor.row + self.rows + self.totals,
            self.anchor.col + self.width - 1,
        );
        Some(Range::between(self.anchor, last))
    }

    fn body_range(&self) -> Option<Range> {
        if self.width == 0 || self.rows == 0 {
            return None;
        }
        let first = CellRef::new(self.anchor.row + 1, self.anchor.col);
        let last = CellRef::new(self.anchor.row + self.rows, self.anchor.col + self.width - 1);
        Some(Range::between(first, last))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DocumentId(usize);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SheetId {
    document: usize,
    sheet: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TableId {
    document: usize,
    sheet: usize,
    table: usize,
}

/// Spreadsheet backend keeping every open document in memory.
#[derive(Debug)]
pub struct MemoryBackend {
    launchable: bool,
    running: bool,
    visible: bool,
    launches: usize,
    files: HashMap<PathBuf, Document>,
    documents: Vec<Document>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        MemoryBackend::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        MemoryBackend {
            launchable: true,
            running: false,
            visible: false,
            launches: 0,
            files: HashMap::new(),
            documents: Vec::new(),
        }
    }

    /// A backend whose application can never be launched.
    pub fn unavailable() -> Self {
        MemoryBackend {
            launchable: false,
            ..MemoryBackend::new()
        }
    }

    /// Makes `document` openable at `path` without touching the disk.
    pub fn register_file(&mut self, path: impl Into<PathBuf>, document: Document) {
        self.files.insert(path.into(), document);
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, document: Document) -> Self {
        self.register_file(path, document);
        self
    }

    /// How many times the application was started.
    pub fn launches(&self) -> usize {
        self.launches
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn document(&self, handle: &DocumentId) -> Option<&Document> {
        self.documents.get(handle.0)
    }

    /// Data rows of a table that pass its current filter.
    pub fn visible_rows(&self, handle: &TableId) -> Result<Grid, BackendError> {
        let table = self.table(handle)?;
        let headers = self.read_table_headers(handle)?;
        let body = self.read_table_body(handle)?;
        Ok(body
            .into_iter()
            .filter(|row| table.filter.accepts(&headers, row))
            .collect())
    }

    fn sheet(&self, handle: &SheetId) -> Result<&Sheet, BackendError> {
        self.documents
            .get(handle.document)
            .and_then(|document| document.sheets.get(handle.sheet))
            .ok_or(BackendError::InvalidHandle { kind: "sheet" })
    }

    fn sheet_mut(&mut self, document: usize, sheet: usize) -> Result<&mut Sheet, BackendError> {
        self.documents
            .get_mut(document)
            .and_then(|document| document.sheets.get_mut(sheet))
            .ok_or(BackendError::InvalidHandle { kind: "sheet" })
    }

    fn table(&self, handle: &TableId) -> Result<&Table, BackendError> {
        self.documents
            .get(handle.document)
            .and_then(|document| document.sheets.get(handle.sheet))
            .and_then(|sheet| sheet.tables.get(handle.table))
            .ok_or(BackendError::InvalidHandle { kind: "table" })
    }

    fn table_mut(&mut self, handle: &TableId) -> Result<(&mut Sheet, usize), BackendError> {
        let sheet = self.sheet_mut(handle.document, handle.sheet)?;
        if handle.table < sheet.tables.len() {
            Ok((sheet, handle.table))
        } else {
            Err(BackendError::InvalidHandle { kind: "table" })
        }
    }

    fn ensure_running(&self) -> Result<(), BackendError> {
        if self.running {
            Ok(())
        } else {
            Err(BackendError::Unavailable("application is not running".to_owned()))
        }
    }
}

impl SpreadsheetBackend for MemoryBackend {
    type Document = DocumentId;
    type Sheet = SheetId;
    type Table = TableId;

    fn is_application_running(&self) -> bool {
        self.running
    }

    fn launch_application(&mut self, visible: bool) -> Result<(), BackendError> {
        if !self.launchable {
            return Err(BackendError::Unavailable("application cannot be launched".to_owned()));
        }
        self.running = true;
        self.visible = visible;
        self.launches += 1;
        Ok(())
    }

    fn list_open_documents(&self) -> Result<Vec<Entry<DocumentId>>, BackendError> {
        self.ensure_running()?;
        Ok(self
            .documents
            .iter()
            .enumerate()
            .map(|(index, document)| Entry::new(&document.name, DocumentId(index)))
            .collect())
    }

    fn open_document(&mut self, path: &Path) -> Result<DocumentId, BackendError> {
        self.ensure_running()?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let mut document = match self.files.get(path) {
            Some(document) => document.to_owned(),
            None if path.is_file() => xlsx::load_document(path)?,
            None => return Err(BackendError::FileNotFound(path.to_path_buf())),
        };
        document.name = name;
        document.path = path.to_path_buf();
        debug!(path = %path.display(), sheets = document.sheets.len(), "document opened");
        self.documents.push(document);
        Ok(DocumentId(self.documents.len() - 1))
    }

    fn list_sheets(&self, document: &DocumentId) -> Result<Vec<Entry<SheetId>>, BackendError> {
        let sheets = &self
            .documents
            .get(document.0)
            .ok_or(BackendError::InvalidHandle { kind: "document" })?
            .sheets;
        Ok(sheets
            .iter()
            .enumerate()
            .map(|(index, sheet)| {
                Entry::new(&sheet.name, SheetId {
                    document: document.0,
                    sheet: index,
                })
            })
            .collect())
    }

    fn add_sheet(&mut self, document: &DocumentId, name: &str) -> Result<SheetId, BackendError> {
        let sheets = &mut self
            .documents
            .get_mut(document.0)
            .ok_or(BackendError::InvalidHandle { kind: "document" })?
            .sheets;
        if sheets.iter().any(|sheet| sheet.name == name) {
            return Err(BackendError::DuplicateName {
                kind: "Sheet",
                name: name.to_owned(),
            });
        }
        sheets.push(Sheet::new(name));
        Ok(SheetId {
            document: document.0,
            sheet: sheets.len() - 1,
        })
    }

    fn list_tables(&self, sheet: &SheetId) -> Result<Vec<Entry<TableId>>, BackendError> {
        Ok(self
            .sheet(sheet)?
            .tables
            .iter()
            .enumerate()
            .map(|(index, table)| {
                Entry::new(&table.name, TableId {
                    document: sheet.document,
                    sheet: sheet.sheet,
                    table: index,
                })
            })
            .collect())
    }

    fn add_table(&mut self, sheet: &SheetId, name: &str, anchor: CellRef) -> Result<TableId, BackendError> {
        let target = self.sheet_mut(sheet.document, sheet.sheet)?;
        if target.tables.iter().any(|table| table.name == name) {
            return Err(BackendError::DuplicateName {
                kind: "Table",
                name: name.to_owned(),
            });
        }
        target.tables.push(Table::new(name, anchor));
        Ok(TableId {
            document: sheet.document,
            sheet: sheet.sheet,
            table: target.tables.len() - 1,
        })
    }

    fn read_used_range(&self, sheet: &SheetId) -> Result<Grid, BackendError> {
        let sheet = self.sheet(sheet)?;
        Ok(sheet.read(&sheet.used_range()))
    }

    fn read_table_body(&self, table: &TableId) -> Result<Grid, BackendError> {
        let sheet = self.sheet(&SheetId {
            document: table.document,
            sheet: table.sheet,
        })?;
        let table = self.table(table)?;
        Ok(match table.body_range() {
            Some(range) => sheet.read(&range),
            None => (0..table.rows).map(|_| Vec::new()).collect(),
        })
    }

    fn read_table_headers(&self, table: &TableId) -> Result<Vec<String>, BackendError> {
        let sheet = self.sheet(&SheetId {
            document: table.document,
            sheet: table.sheet,
        })?;
        let table = self.table(table)?;
        Ok((0..table.width)
            .map(|col| sheet.get(CellRef::new(table.anchor.row, table.anchor.col + col)).to_string())
            .collect())
    }

    fn write_table(&mut self, table: &TableId, rows: &[Vec<CellValue>], headers: &[String]) -> Result<(), BackendError> {
        let (sheet, index) = self.table_mut(table)?;
        let name = sheet.tables[index].name.to_owned();
        if let Some(row) = rows.iter().position(|row| row.len() != headers.len()) {
            return Err(BackendError::InvalidTable {
                name,
                message: format!("row {row} does not have {} values", headers.len()),
            });
        }
        if let Some(range) = sheet.tables[index].range() {
            sheet.clear(&range);
        }
        let anchor = sheet.tables[index].anchor;
        for (col, header) in headers.iter().enumerate() {
            sheet.set(CellRef::new(anchor.row, anchor.col + col), CellValue::Text(header.to_owned()));
        }
        for (row, values) in rows.iter().enumerate() {
            for (col, value) in values.iter().enumerate() {
                sheet.set(CellRef::new(anchor.row + 1 + row, anchor.col + col), value.to_owned());
            }
        }
        // The rewritten table has no totals row
        let table = &mut sheet.tables[index];
        table.width = headers.len();
        table.rows = rows.len();
        table.totals = 0;
        debug!(table = %name, rows = rows.len(), columns = headers.len(), "table written");
        Ok(())
    }

    fn get_filter_state(&self, table: &TableId) -> Result<FilterState, BackendError> {
        Ok(self.table(table)?.filter.to_owned())
    }

    fn clear_filters(&mut self, table: &TableId) -> Result<(), BackendError> {
        let (sheet, index) = self.table_mut(table)?;
        sheet.tables[index].filter = FilterState::default();
        Ok(())
    }

    fn apply_filter_state(&mut self, table: &TableId, state: &FilterState) -> Result<(), BackendError> {
        let headers = self.read_table_headers(table)?;
        let (sheet, index) = self.table_mut(table)?;
        if let Some(filter) = state.columns.iter().find(|filter| !headers.contains(&filter.column)) {
            return Err(BackendError::InvalidTable {
                name: sheet.tables[index].name.to_owned(),
                message: format!("no column '{}' to filter", filter.column),
            });
        }
        sheet.tables[index].filter = state.to_owned();
        Ok(())
    }
}

//! Idempotent resolution of workbook, sheet and table handles.
//!
//! Resolving a name that already refers to a live object returns that object's
//! handle; only absent objects are opened or created.
use crate::error::QueryError;
use crate::error::ResultMessage;
use crate::error::SourceKind;
use crate::spreadsheet::fuzzy::directory_candidates;
use crate::spreadsheet::reference::CellRef;
use crate::spreadsheet::BackendError;
use crate::spreadsheet::Entry;
use crate::spreadsheet::NameResolver;
use crate::spreadsheet::SpreadsheetBackend;
use std::fmt::Display;
use std::path::Path;
use std::path::PathBuf;
use tracing::debug;
use tracing::info;
use unicode_normalization::UnicodeNormalization;

fn nfc(text: &str) -> String {
    text.nfc().collect()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| nfc(&name.to_string_lossy()))
        .unwrap_or_default()
}

fn find_entry<'e, H>(entries: &'e [Entry<H>], name: &str) -> Option<&'e Entry<H>> {
    entries.iter().find(|entry| nfc(&entry.name) == name)
}

/// Workbook resolution against a backend's open documents.
#[derive(Clone, Copy)]
pub struct HandleResolver<'r> {
    visible: bool,
    names: Option<&'r dyn NameResolver>,
}

impl<'r> HandleResolver<'r> {
    pub fn new(visible: bool) -> Self {
        HandleResolver { visible, names: None }
    }

    /// Enables approximate matching of file names that cannot be opened.
    pub fn with_names(mut self, names: &'r dyn NameResolver) -> Self {
        self.names = Some(names);
        self
    }

    /// Starts the application unless it is already running.
    pub fn ensure_application<B: SpreadsheetBackend>(&self, backend: &mut B) -> Result<(), QueryError> {
        if !backend.is_application_running() {
            info!(visible = self.visible, "launching spreadsheet application");
            backend.launch_application(self.visible)?;
        }
        Ok(())
    }

    /// Returns the open document with the same (NFC-normalized) file name, or opens `path`.
    pub fn resolve_workbook<B: SpreadsheetBackend>(&self, backend: &mut B, path: &Path) -> Result<B::Document, QueryError> {
        self.ensure_application(backend)?;
        let path = PathBuf::from(nfc(&path.to_string_lossy()));
        let name = file_name(&path);

        let open = backend.list_open_documents()?;
        if let Some(entry) = find_entry(&open, &name) {
            debug!(document = %name, "document already open");
            return Ok(entry.handle.to_owned());
        }

        match backend.open_document(&path) {
            Ok(document) => {
                info!(path = %path.display(), "document opened");
                Ok(document)
            }
            Err(BackendError::FileNotFound(_)) if self.names.is_some() => self.resolve_fuzzy(backend, &path, open),
            Err(error) => Err(error.into()),
        }
    }

    fn resolve_fuzzy<B: SpreadsheetBackend>(
        &self,
        backend: &mut B,
        path: &Path,
        open: Vec<Entry<B::Document>>,
    ) -> Result<B::Document, QueryError> {
        let Some(names) = self.names else {
            return Err(QueryError::not_found(SourceKind::Workbook, path.display().to_string()));
        };
        let target = file_name(path);
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut candidates: Vec<String> = open.iter().map(|entry| nfc(&entry.name)).collect();
        let on_disk = directory_candidates(&directory)
            .map_err(|error| QueryError::from(BackendError::Other(error)))
            .with_prefix("list candidate files")?;
        for candidate in on_disk.iter().map(|candidate| nfc(candidate)) {
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }

        let Some(matched) = names.best_match(&target, &candidates) else {
            return Err(QueryError::AmbiguousSource {
                name: target,
                reason: format!("no single match among {} candidates", candidates.len()),
            });
        };
        info!(name = %target, matched = %matched, "fuzzy file match");

        if let Some(entry) = find_entry(&open, &matched) {
            return Ok(entry.handle.to_owned());
        }
        Ok(backend.open_document(&directory.join(&matched))?)
    }
}

/// A source sheet, addressed by name or by 0-based position. Defaults to the first sheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SheetRef {
    Name(String),
    Position(usize),
}

impl Default for SheetRef {
    fn default() -> Self {
        SheetRef::Position(0)
    }
}

impl Display for SheetRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetRef::Name(name) => write!(f, "{name}"),
            SheetRef::Position(position) => write!(f, "#{position}"),
        }
    }
}

impl From<&str> for SheetRef {
    fn from(value: &str) -> Self {
        SheetRef::Name(value.to_owned())
    }
}

impl From<String> for SheetRef {
    fn from(value: String) -> Self {
        SheetRef::Name(value)
    }
}

impl From<usize> for SheetRef {
    fn from(value: usize) -> Self {
        SheetRef::Position(value)
    }
}

/// Existing sheet selected by name or position.
pub fn select_sheet<B: SpreadsheetBackend>(backend: &B, document: &B::Document, sheet: &SheetRef) -> Result<B::Sheet, QueryError> {
    match sheet {
        SheetRef::Name(name) => find_sheet(backend, document, name),
        SheetRef::Position(position) => backend
            .list_sheets(document)?
            .into_iter()
            .nth(*position)
            .map(|entry| entry.handle)
            .ok_or_else(|| QueryError::not_found(SourceKind::Sheet, sheet.to_string())),
    }
}

/// Sheet that must already exist.
pub fn find_sheet<B: SpreadsheetBackend>(backend: &B, document: &B::Document, name: &str) -> Result<B::Sheet, QueryError> {
    backend
        .list_sheets(document)?
        .into_iter()
        .find(|entry| entry.name == name)
        .map(|entry| entry.handle)
        .ok_or_else(|| QueryError::not_found(SourceKind::Sheet, name))
}

/// Existing sheet named `name`, created empty when absent.
pub fn resolve_sheet<B: SpreadsheetBackend>(backend: &mut B, document: &B::Document, name: &str) -> Result<B::Sheet, QueryError> {
    match find_sheet(backend, document, name) {
        Err(QueryError::SourceNotFound { .. }) => {
            info!(sheet = name, "creating sheet");
            Ok(backend.add_sheet(document, name)?)
        }
        result => result,
    }
}

/// Table that must already exist.
pub fn find_table<B: SpreadsheetBackend>(backend: &B, sheet: &B::Sheet, name: &str) -> Result<B::Table, QueryError> {
    backend
        .list_tables(sheet)?
        .into_iter()
        .find(|entry| entry.name == name)
        .map(|entry| entry.handle)
        .ok_or_else(|| QueryError::not_found(SourceKind::Table, name))
}

/// Existing table named `name`, created headerless at the sheet's first cell when absent.
pub fn resolve_table<B: SpreadsheetBackend>(backend: &mut B, sheet: &B::Sheet, name: &str) -> Result<B::Table, QueryError> {
    match find_table(backend, sheet, name) {
        Err(QueryError::SourceNotFound { .. }) => {
            info!(table = name, "creating table");
            Ok(backend.add_table(sheet, name, CellRef::ORIGIN)?)
        }
        result => result,
    }
}

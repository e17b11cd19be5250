//! Upserts a query's destination table while keeping its auto-filter.
use crate::config::QueryConfig;
use crate::database::table::TabularBuffer;
use crate::error::QueryError;
use crate::query::resolver::resolve_sheet;
use crate::query::resolver::resolve_table;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::criteria::FilterState;
use crate::spreadsheet::SpreadsheetBackend;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// Holds a table's filter snapshot while its contents are rewritten.
///
/// Acquiring captures the filter and shows all rows. Dropping reapplies the snapshot:
/// after a successful write, predicates on columns that no longer exist are dropped;
/// after a failed one, the original snapshot is put back. Restoration never fails the
/// caller.
pub struct ViewStateGuard<'b, B: SpreadsheetBackend> {
    backend: &'b mut B,
    table: B::Table,
    snapshot: FilterState,
    restore: bool,
    written: Option<Vec<String>>,
}

impl<'b, B: SpreadsheetBackend> ViewStateGuard<'b, B> {
    pub fn acquire(backend: &'b mut B, table: B::Table, restore: bool) -> Result<Self, QueryError> {
        let snapshot = backend.get_filter_state(&table)?;
        if !snapshot.is_empty() {
            debug!(table = ?table, columns = snapshot.columns.len(), "captured filter");
            backend.clear_filters(&table)?;
        }
        Ok(ViewStateGuard {
            backend,
            table,
            snapshot,
            restore,
            written: None,
        })
    }

    pub fn snapshot(&self) -> &FilterState {
        &self.snapshot
    }

    /// Overwrites the table's header row and data body.
    pub fn write(&mut self, rows: &[Vec<CellValue>], headers: &[String]) -> Result<(), QueryError> {
        self.backend.write_table(&self.table, rows, headers)?;
        self.written = Some(headers.to_vec());
        Ok(())
    }
}

impl<B: SpreadsheetBackend> Drop for ViewStateGuard<'_, B> {
    fn drop(&mut self) {
        if !self.restore || self.snapshot.is_empty() {
            return;
        }
        let mut state = self.snapshot.to_owned();
        if let Some(headers) = &self.written {
            let dropped = state.retain_columns(headers);
            if !dropped.is_empty() {
                debug!(table = ?self.table, columns = ?dropped, "dropped filters on removed columns");
            }
            if state.is_empty() {
                return;
            }
        }
        if let Err(error) = self.backend.apply_filter_state(&self.table, &state) {
            warn!(table = ?self.table, %error, "failed to restore filter");
        }
    }
}

/// Writes `buffer` into the table `<prefix><name>` on the sheet `name`, creating both
/// when absent. Returns the destination table.
pub fn commit<B: SpreadsheetBackend>(
    backend: &mut B,
    document: &B::Document,
    name: &str,
    buffer: &TabularBuffer,
    config: &QueryConfig,
) -> Result<B::Table, QueryError> {
    let headers = buffer.headers()?;
    let sheet = resolve_sheet(backend, document, name)?;
    let table = resolve_table(backend, &sheet, &config.table_name(name))?;

    let mut guard = ViewStateGuard::acquire(backend, table.to_owned(), config.restore_filters)?;
    guard.write(buffer.rows(), &headers)?;
    drop(guard);

    info!(query = name, rows = buffer.row_count(), columns = headers.len(), "committed");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::column::Label;
    use crate::spreadsheet::criteria::FilterColumn;
    use crate::spreadsheet::criteria::FilterCriterion;
    use crate::spreadsheet::criteria::NumberComparison;
    use crate::spreadsheet::memory::Document;
    use crate::spreadsheet::memory::DocumentId;
    use crate::spreadsheet::memory::MemoryBackend;
    use crate::spreadsheet::BackendError;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn destination() -> (MemoryBackend, DocumentId) {
        let mut backend = MemoryBackend::new().with_file("/work/out.xlsx", Document::new("out.xlsx"));
        backend.launch_application(true).unwrap();
        let document = backend.open_document(Path::new("/work/out.xlsx")).unwrap();
        (backend, document)
    }

    fn sales() -> TabularBuffer {
        TabularBuffer::new(
            vec![Label::from("Region"), Label::from("Qty")],
            vec![
                vec!["East".into(), 3.into()],
                vec!["West".into(), 12.into()],
                vec!["East".into(), 7.into()],
            ],
        )
        .unwrap()
    }

    fn filter() -> FilterState {
        FilterState::default()
            .with_column(FilterColumn::new("Region", FilterCriterion::Values(vec!["East".to_owned()])))
            .with_column(FilterColumn::new(
                "Qty",
                FilterCriterion::Number(NumberComparison::GreaterThan(5.0)),
            ))
    }

    #[test]
    fn creates_sheet_and_prefixed_table() {
        let (mut backend, document) = destination();
        let table = commit(&mut backend, &document, "Sales", &sales(), &QueryConfig::default()).unwrap();
        let sheets = backend.list_sheets(&document).unwrap();
        assert_eq!(sheets[0].name, "Sales");
        assert_eq!(backend.list_tables(&sheets[0].handle).unwrap()[0].name, "tblSales");
        assert_eq!(backend.read_table_headers(&table).unwrap(), vec!["Region", "Qty"]);
        assert_eq!(backend.read_table_body(&table).unwrap(), sales().rows());
    }

    #[test]
    fn filters_survive_rewrite() {
        let (mut backend, document) = destination();
        let config = QueryConfig::default();
        let table = commit(&mut backend, &document, "Sales", &sales(), &config).unwrap();
        backend.apply_filter_state(&table, &filter()).unwrap();
        assert_eq!(backend.visible_rows(&table).unwrap().len(), 1);

        let mut grown = sales();
        grown.rows_mut().push(vec!["East".into(), 9.into()]);
        commit(&mut backend, &document, "Sales", &grown, &config).unwrap();
        assert_eq!(backend.get_filter_state(&table).unwrap(), filter());
        assert_eq!(backend.visible_rows(&table).unwrap().len(), 2);
    }

    #[test]
    fn filters_on_removed_columns_are_dropped() {
        let (mut backend, document) = destination();
        let config = QueryConfig::default();
        let table = commit(&mut backend, &document, "Sales", &sales(), &config).unwrap();
        backend.apply_filter_state(&table, &filter()).unwrap();

        let mut narrowed = sales();
        narrowed.remove_columns(&[1]);
        commit(&mut backend, &document, "Sales", &narrowed, &config).unwrap();
        let expected = FilterState::default()
            .with_column(FilterColumn::new("Region", FilterCriterion::Values(vec!["East".to_owned()])));
        assert_eq!(backend.get_filter_state(&table).unwrap(), expected);
    }

    #[test]
    fn restore_can_be_disabled() {
        let (mut backend, document) = destination();
        let config = QueryConfig::default().with_restore_filters(false);
        let table = commit(&mut backend, &document, "Sales", &sales(), &config).unwrap();
        backend.apply_filter_state(&table, &filter()).unwrap();
        commit(&mut backend, &document, "Sales", &sales(), &config).unwrap();
        assert!(backend.get_filter_state(&table).unwrap().is_empty());
    }

    #[test]
    fn failed_write_restores_snapshot() {
        let (mut backend, document) = destination();
        let table = commit(&mut backend, &document, "Sales", &sales(), &QueryConfig::default()).unwrap();
        backend.apply_filter_state(&table, &filter()).unwrap();

        let mut guard = ViewStateGuard::acquire(&mut backend, table, true).unwrap();
        assert_eq!(guard.snapshot(), &filter());
        let error = guard.write(&[vec!["East".into()]], &["Region".to_owned(), "Qty".to_owned()]);
        assert!(matches!(error, Err(QueryError::Backend(BackendError::InvalidTable { .. }))));
        drop(guard);
        assert_eq!(backend.get_filter_state(&table).unwrap(), filter());
    }

    #[test]
    fn commit_is_idempotent() {
        let (mut backend, document) = destination();
        let config = QueryConfig::default();
        let table = commit(&mut backend, &document, "Sales", &sales(), &config).unwrap();
        let first = (backend.read_table_headers(&table).unwrap(), backend.read_table_body(&table).unwrap());
        let again = commit(&mut backend, &document, "Sales", &sales(), &config).unwrap();
        assert_eq!(again, table);
        let second = (backend.read_table_headers(&table).unwrap(), backend.read_table_body(&table).unwrap());
        assert_eq!(first, second);
        assert_eq!(backend.list_sheets(&document).unwrap().len(), 1);
    }

    #[test]
    fn duplicate_headers_are_rejected() {
        let (mut backend, document) = destination();
        let buffer = TabularBuffer::new(vec![Label::from("a"), Label::from("a")], vec![]).unwrap();
        let result = commit(&mut backend, &document, "Dup", &buffer, &QueryConfig::default());
        assert!(matches!(result, Err(QueryError::SchemaMismatch(_))));
        assert!(backend.list_sheets(&document).unwrap().is_empty());
    }
}

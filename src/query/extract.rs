use crate::database::column::Label;
use crate::database::table::TabularBuffer;
use crate::error::QueryError;
use crate::query::resolver::find_table;
use crate::spreadsheet::SpreadsheetBackend;
use tracing::debug;

/// Reads a sheet region into a fresh buffer.
///
/// Without `table`, the sheet's used range is read as-is with positional labels.
/// With `table`, only that table's data body is read and its declared headers become
/// the labels.
pub fn extract<B: SpreadsheetBackend>(backend: &B, sheet: &B::Sheet, table: Option<&str>) -> Result<TabularBuffer, QueryError> {
    let buffer = match table {
        None => TabularBuffer::from_grid(backend.read_used_range(sheet)?),
        Some(name) => {
            let table = find_table(backend, sheet, name)?;
            let labels = backend
                .read_table_headers(&table)?
                .iter()
                .enumerate()
                .map(|(position, header)| Label::from_header_text(header, position))
                .collect();
            TabularBuffer::new(labels, backend.read_table_body(&table)?)?
        }
    };
    debug!(
        table = table.unwrap_or("<used range>"),
        rows = buffer.row_count(),
        columns = buffer.column_count(),
        "extracted"
    );
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceKind;
    use crate::spreadsheet::cell::CellValue;
    use crate::spreadsheet::memory::Document;
    use crate::spreadsheet::memory::MemoryBackend;
    use crate::spreadsheet::memory::Sheet;
    use crate::spreadsheet::memory::Table;
    use crate::spreadsheet::reference::CellRef;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn sheet() -> (MemoryBackend, <MemoryBackend as SpreadsheetBackend>::Sheet) {
        let sheet = Sheet::new("Data")
            .with_rows(
                CellRef::new(2, 1),
                vec![
                    vec!["Region".into(), "Qty".into()],
                    vec!["East".into(), 3.into()],
                    vec!["West".into(), CellValue::Empty],
                ],
            )
            .with_table(Table::new("tblSales", CellRef::new(2, 1)).with_size(2, 2));
        let mut backend = MemoryBackend::new().with_file("/work/in.xlsx", Document::new("in.xlsx").with_sheet(sheet));
        backend.launch_application(true).unwrap();
        let document = backend.open_document(Path::new("/work/in.xlsx")).unwrap();
        let sheet = backend.list_sheets(&document).unwrap()[0].handle;
        (backend, sheet)
    }

    #[test]
    fn used_range_has_positional_labels() {
        let (backend, sheet) = sheet();
        let buffer = extract(&backend, &sheet, None).unwrap();
        assert_eq!(buffer.labels(), &[Label::Position(0), Label::Position(1)]);
        assert_eq!(buffer.row_count(), 3);
        assert_eq!(buffer.rows()[0], vec![CellValue::from("Region"), CellValue::from("Qty")]);
    }

    #[test]
    fn table_body_uses_declared_headers() {
        let (backend, sheet) = sheet();
        let buffer = extract(&backend, &sheet, Some("tblSales")).unwrap();
        assert_eq!(buffer.labels(), &[Label::from("Region"), Label::from("Qty")]);
        assert_eq!(
            buffer.rows(),
            &[
                vec![CellValue::from("East"), CellValue::from(3)],
                vec![CellValue::from("West"), CellValue::Empty],
            ]
        );
    }

    #[test]
    fn missing_table() {
        let (backend, sheet) = sheet();
        assert!(matches!(
            extract(&backend, &sheet, Some("tblOther")),
            Err(QueryError::SourceNotFound { kind: SourceKind::Table, .. })
        ));
    }
}

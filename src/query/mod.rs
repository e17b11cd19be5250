//! # Query sessions
//!
//! A [`Query`] binds a destination workbook and a query name to one tabular buffer.
//! The caller selects a source workbook, navigates to a sheet or table, applies
//! transforms in order and commits. The commit writes the buffer to the sheet named
//! after the query, into the table `tbl<name>`, keeping that table's auto-filter.
//!
//! [`Query::run`] is the scoped form: the commit happens exactly once when the body
//! succeeds and is skipped when it fails.
use crate::config::QueryConfig;
use crate::database::column::Label;
use crate::database::table::Record;
use crate::database::table::TabularBuffer;
use crate::error::QueryError;
use crate::query::extract::extract;
use crate::query::resolver::select_sheet;
use crate::query::resolver::HandleResolver;
use crate::query::resolver::SheetRef;
use crate::query::transform::FillMethod;
use crate::query::transform::TextPattern;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::fuzzy::SimilarityResolver;
use crate::spreadsheet::NameResolver;
use crate::spreadsheet::SpreadsheetBackend;
use std::path::Path;
use std::path::PathBuf;
use tracing::debug;
use tracing::info;
use tracing::warn;

pub mod export;
pub mod extract;
pub mod resolver;
pub mod transform;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum SessionState {
    Open,
    Committed,
    Failed,
}

/// One extract-transform-export run against a destination workbook.
pub struct Query<'a, B: SpreadsheetBackend> {
    backend: &'a mut B,
    config: QueryConfig,
    names: Box<dyn NameResolver + 'a>,
    path: PathBuf,
    name: String,
    destination: B::Document,
    source: Option<B::Document>,
    buffer: Option<TabularBuffer>,
    state: SessionState,
}

impl<'a, B: SpreadsheetBackend> Query<'a, B> {
    /// Starts a query with default options. See [`Query::begin_with`].
    pub fn begin(backend: &'a mut B, destination: impl AsRef<Path>, name: &str) -> Result<Self, QueryError> {
        Self::begin_with(backend, destination, name, QueryConfig::default())
    }

    /// Starts a query writing into `destination` (with the configured extension forced),
    /// resolving the destination workbook right away.
    pub fn begin_with(
        backend: &'a mut B,
        destination: impl AsRef<Path>,
        name: &str,
        config: QueryConfig,
    ) -> Result<Self, QueryError> {
        let path = config.apply_extension(destination.as_ref());
        let document = HandleResolver::new(config.visible).resolve_workbook(backend, &path)?;
        info!(query = name, path = %path.display(), "query started");
        Ok(Query {
            backend,
            config,
            names: Box::new(SimilarityResolver::default()),
            path,
            name: name.to_owned(),
            destination: document,
            source: None,
            buffer: None,
            state: SessionState::Open,
        })
    }

    /// Runs `body` in a session and commits once if it succeeds.
    pub fn run<F>(backend: &'a mut B, destination: impl AsRef<Path>, name: &str, body: F) -> Result<B::Table, QueryError>
    where
        F: FnOnce(&mut Query<'a, B>) -> Result<(), QueryError>,
    {
        Self::run_with(backend, destination, name, QueryConfig::default(), body)
    }

    pub fn run_with<F>(
        backend: &'a mut B,
        destination: impl AsRef<Path>,
        name: &str,
        config: QueryConfig,
        body: F,
    ) -> Result<B::Table, QueryError>
    where
        F: FnOnce(&mut Query<'a, B>) -> Result<(), QueryError>,
    {
        let mut query = Self::begin_with(backend, destination, name, config)?;
        match body(&mut query) {
            Ok(()) => query.commit(),
            Err(error) => {
                query.state = SessionState::Failed;
                warn!(query = %query.name, %error, "query failed, nothing committed");
                Err(error)
            }
        }
    }

    /// Replaces the file-name matcher used when fuzzy resolution is enabled.
    pub fn set_name_resolver(&mut self, names: impl NameResolver + 'a) -> &mut Self {
        self.names = Box::new(names);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Destination path, extension applied.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn destination(&self) -> &B::Document {
        &self.destination
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn buffer(&self) -> Option<&TabularBuffer> {
        self.buffer.as_ref()
    }

    pub fn buffer_mut(&mut self) -> Option<&mut TabularBuffer> {
        self.buffer.as_mut()
    }

    fn ensure_open(&self) -> Result<(), QueryError> {
        match self.state {
            SessionState::Open => Ok(()),
            _ => Err(QueryError::SessionFailed(self.name.to_owned())),
        }
    }

    fn track<T>(&mut self, result: Result<T, QueryError>) -> Result<T, QueryError> {
        if let Err(error) = &result {
            debug!(query = %self.name, %error, "query step failed");
            self.state = SessionState::Failed;
        }
        result
    }

    /// Selects the source workbook. The buffer becomes a listing of its sheets and tables
    /// (`Name`, `Kind`).
    pub fn select_source(&mut self, path: impl AsRef<Path>) -> Result<&mut Self, QueryError> {
        self.ensure_open()?;
        let path = self.config.apply_extension(path.as_ref());
        let mut resolver = HandleResolver::new(self.config.visible);
        if self.config.fuzzy {
            resolver = resolver.with_names(&*self.names);
        }
        let result = resolver
            .resolve_workbook(&mut *self.backend, &path)
            .and_then(|document| {
                let listing = source_listing(&*self.backend, &document)?;
                Ok((document, listing))
            });
        let (document, listing) = self.track(result)?;
        self.source = Some(document);
        self.buffer = Some(listing);
        Ok(self)
    }

    /// Loads the used range of `sheet` (a name or a 0-based position), or the body of
    /// `table` on that sheet, from the source workbook.
    pub fn navigate(&mut self, sheet: impl Into<SheetRef>, table: Option<&str>) -> Result<&mut Self, QueryError> {
        self.ensure_open()?;
        let sheet = sheet.into();
        let result = match &self.source {
            None => Err(QueryError::MissingSource(self.name.to_owned())),
            Some(source) => select_sheet(&*self.backend, source, &sheet)
                .and_then(|sheet| extract(&*self.backend, &sheet, table)),
        };
        self.buffer = Some(self.track(result)?);
        Ok(self)
    }

    /// Selects `path` as the source and loads one of its sheets or tables.
    ///
    /// Without a table, `header` is the row of the used range holding the column labels;
    /// rows above it are discarded and `None` keeps positional labels. A table always
    /// uses its own header row.
    pub fn read(
        &mut self,
        path: impl AsRef<Path>,
        sheet: impl Into<SheetRef>,
        table: Option<&str>,
        header: Option<usize>,
    ) -> Result<&mut Self, QueryError> {
        self.select_source(path)?.navigate(sheet, table)?;
        match (table, header) {
            (None, Some(row)) => self.apply("promote_header_row", |buffer| transform::promote_header_row(buffer, row)),
            _ => Ok(self),
        }
    }

    fn apply<F>(&mut self, operator: &str, transform: F) -> Result<&mut Self, QueryError>
    where
        F: FnOnce(&mut TabularBuffer) -> Result<(), QueryError>,
    {
        self.ensure_open()?;
        let result = match self.buffer.as_mut() {
            Some(buffer) => transform(buffer),
            None => Err(QueryError::MissingSource(self.name.to_owned())),
        };
        self.track(result)?;
        if let Some(buffer) = &self.buffer {
            debug!(
                query = %self.name,
                operator,
                rows = buffer.row_count(),
                columns = buffer.column_count(),
                "transform applied"
            );
        }
        Ok(self)
    }

    pub fn remove_first_rows(&mut self, n: usize) -> Result<&mut Self, QueryError> {
        self.apply("remove_first_rows", |buffer| transform::remove_first_rows(buffer, n))
    }

    pub fn remove_last_rows(&mut self, n: usize) -> Result<&mut Self, QueryError> {
        self.apply("remove_last_rows", |buffer| transform::remove_last_rows(buffer, n))
    }

    pub fn promote_headers(&mut self) -> Result<&mut Self, QueryError> {
        self.apply("promote_headers", transform::promote_headers)
    }

    /// Fills nulls in `columns` (every column when `None`).
    pub fn fillna(&mut self, columns: Option<&[Label]>, method: FillMethod) -> Result<&mut Self, QueryError> {
        self.apply("fillna", |buffer| transform::fillna(buffer, columns, method))
    }

    pub fn split_text_column(
        &mut self,
        column: impl Into<Label>,
        pattern: &TextPattern,
        columns: Option<&[Label]>,
    ) -> Result<&mut Self, QueryError> {
        let column = column.into();
        self.apply("split_text_column", |buffer| {
            transform::split_text_column(buffer, &column, pattern, columns)
        })
    }

    pub fn extract_text_column(
        &mut self,
        column: impl Into<Label>,
        pattern: &TextPattern,
        columns: &[Label],
    ) -> Result<&mut Self, QueryError> {
        let column = column.into();
        self.apply("extract_text_column", |buffer| {
            transform::extract_text_column(buffer, &column, pattern, columns)
        })
    }

    pub fn replace_value_text_column(
        &mut self,
        column: impl Into<Label>,
        pattern: &TextPattern,
        replacement: &str,
    ) -> Result<&mut Self, QueryError> {
        let column = column.into();
        self.apply("replace_value_text_column", |buffer| {
            transform::replace_value_text_column(buffer, &column, pattern, replacement)
        })
    }

    pub fn drop_columns_idx(&mut self, indices: &[usize]) -> Result<&mut Self, QueryError> {
        self.apply("drop_columns_idx", |buffer| transform::drop_columns_idx(buffer, indices))
    }

    /// Keeps the rows for which `predicate` holds.
    pub fn filter_rows<F>(&mut self, predicate: F) -> Result<&mut Self, QueryError>
    where
        F: FnMut(Record<'_>) -> bool,
    {
        self.apply("filter_rows", |buffer| {
            buffer.retain_rows(predicate);
            Ok(())
        })
    }

    pub fn rename_column(&mut self, from: impl Into<Label>, to: impl Into<Label>) -> Result<&mut Self, QueryError> {
        let (from, to) = (from.into(), to.into());
        self.apply("rename_column", |buffer| buffer.rename(&from, to))
    }

    pub fn set_label(&mut self, index: usize, label: impl Into<Label>) -> Result<&mut Self, QueryError> {
        let label = label.into();
        self.apply("set_label", |buffer| buffer.set_label(index, label))
    }

    /// Writes the buffer to the destination and ends the session.
    pub fn commit(mut self) -> Result<B::Table, QueryError> {
        self.ensure_open()?;
        let result = match self.buffer.take() {
            None => Err(QueryError::NothingToCommit(self.name.to_owned())),
            Some(buffer) => export::commit(&mut *self.backend, &self.destination, &self.name, &buffer, &self.config),
        };
        let table = self.track(result)?;
        self.state = SessionState::Committed;
        Ok(table)
    }
}

impl<B: SpreadsheetBackend> Drop for Query<'_, B> {
    fn drop(&mut self) {
        if self.state == SessionState::Open {
            warn!(query = %self.name, "query dropped without commit");
        }
    }
}

fn source_listing<B: SpreadsheetBackend>(backend: &B, document: &B::Document) -> Result<TabularBuffer, QueryError> {
    let mut rows = Vec::new();
    for sheet in backend.list_sheets(document)? {
        rows.push(vec![CellValue::from(sheet.name.as_str()), CellValue::from("Sheet")]);
        for table in backend.list_tables(&sheet.handle)? {
            rows.push(vec![CellValue::from(table.name), CellValue::from("Table")]);
        }
    }
    TabularBuffer::new(vec![Label::from("Name"), Label::from("Kind")], rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceKind;
    use crate::query::resolver::find_sheet;
    use crate::spreadsheet::memory::Document;
    use crate::spreadsheet::memory::MemoryBackend;
    use crate::spreadsheet::memory::Sheet;
    use crate::spreadsheet::memory::Table;
    use crate::spreadsheet::reference::CellRef;
    use crate::spreadsheet::Grid;
    use pretty_assertions::assert_eq;

    const COLUMNS: usize = 26;
    const ARTIFACT: usize = 10;

    /// Report layout: 4 title rows, a header row, 20 data rows (one of them a repeated
    /// header) and 2 summary rows. Codes and descriptions are only written on the first
    /// row of their group, IDs only on the last.
    fn report() -> Grid {
        let mut grid: Grid = ["Monthly report", "Region: all", "Generated 2023-03-01", "Confidential"]
            .iter()
            .map(|title| vec![CellValue::from(*title)])
            .collect();

        let mut header = vec!["A/A".into(), "Code".into(), "Desc".into(), "X".into(), CellValue::Empty];
        header.extend((5..COLUMNS).map(|col| CellValue::from(format!("M{col}"))));
        grid.push(header);

        for k in 0..20 {
            if k == ARTIFACT {
                let repeated = grid[4].to_owned();
                grid.push(repeated);
                continue;
            }
            let mut row = vec![CellValue::Empty; COLUMNS];
            row[0] = CellValue::from((k + 1) as i64);
            if k % 2 == 0 {
                row[1] = CellValue::from(format!("C{k}"));
            }
            if k % 4 == 0 {
                row[2] = CellValue::from(format!("Item {k}"));
            }
            row[3] = CellValue::from(format!("x{k}"));
            if k % 5 == 4 {
                row[4] = CellValue::from(format!("ID{k}"));
            }
            for (col, cell) in row.iter_mut().enumerate().skip(5) {
                if k % 3 == 0 {
                    *cell = CellValue::from((k * col) as i64);
                }
            }
            grid.push(row);
        }

        grid.push(vec!["Total".into(), CellValue::Empty, CellValue::Empty, 210.into()]);
        grid.push(vec!["Printed by ETL".into()]);
        grid
    }

    fn backend() -> MemoryBackend {
        let source = Document::new("source.xlsx")
            .with_sheet(Sheet::new("Sheet1").with_rows(CellRef::ORIGIN, report()))
            .with_sheet(
                Sheet::new("Lookup")
                    .with_rows(
                        CellRef::ORIGIN,
                        vec![
                            vec!["Code".into(), "Name".into(), "Price".into()],
                            vec!["C0".into(), "Widget".into(), 2.5.into()],
                            vec!["C2".into(), CellValue::Empty, 4.into()],
                        ],
                    )
                    .with_table(Table::new("tblLookup", CellRef::ORIGIN).with_size(3, 2)),
            );
        MemoryBackend::new()
            .with_file("/work/source.xlsx", source)
            .with_file("/work/etl.xlsx", Document::new("etl.xlsx"))
    }

    fn positions(range: std::ops::RangeInclusive<usize>) -> Vec<Label> {
        range.map(Label::Position).collect()
    }

    fn destination_table(backend: &MemoryBackend, name: &str) -> (Vec<String>, Grid) {
        let document = backend
            .list_open_documents()
            .unwrap()
            .into_iter()
            .find(|entry| entry.name == "etl.xlsx")
            .unwrap()
            .handle;
        let sheet = find_sheet(backend, &document, name).unwrap();
        let table = resolver::find_table(backend, &sheet, &format!("tbl{name}")).unwrap();
        (backend.read_table_headers(&table).unwrap(), backend.read_table_body(&table).unwrap())
    }

    #[test]
    fn cleans_report_end_to_end() {
        let mut backend = backend();
        Query::run(&mut backend, "/work/etl.py", "Clean", |query| {
            query
                .select_source("/work/source")?
                .navigate("Sheet1", None)?
                .remove_first_rows(4)?
                .remove_last_rows(2)?
                .fillna(Some(positions(0..=2).as_slice()), FillMethod::Forward)?
                .fillna(Some(positions(4..=25).as_slice()), FillMethod::Backward)?
                .promote_headers()?
                .set_label(4, "ID")?
                .filter_rows(|record| record.get("A/A") != Some(&CellValue::from("A/A")))?;

            let buffer = query.buffer().unwrap();
            assert_eq!(buffer.row_count(), 19);
            assert_eq!(buffer.column_count(), COLUMNS);
            assert_eq!(
                &buffer.labels()[..5],
                &[Label::from("A/A"), Label::from("Code"), Label::from("Desc"), Label::from("X"), Label::from("ID")]
            );
            Ok(())
        })
        .unwrap();

        let (headers, body) = destination_table(&backend, "Clean");
        assert_eq!(headers[4], "ID");
        assert_eq!(body.len(), 19);
        assert!(body.iter().all(|row| !row[4].is_empty()));
        assert!(body.iter().all(|row| row[0] != CellValue::from("A/A")));
        assert_eq!(body[1][1], CellValue::from("C0"));
        assert_eq!(body[0][4], CellValue::from("ID4"));
        assert_eq!(backend.launches(), 1);
        assert_eq!(backend.list_open_documents().unwrap().len(), 2);
    }

    #[test]
    fn extract_then_commit_preserves_values() {
        let mut backend = backend();
        Query::run(&mut backend, "/work/etl.xlsx", "Lookup", |query| {
            query.select_source("/work/source.xlsx")?.navigate("Lookup", Some("tblLookup"))?;
            Ok(())
        })
        .unwrap();

        let (headers, body) = destination_table(&backend, "Lookup");
        assert_eq!(headers, vec!["Code", "Name", "Price"]);
        assert_eq!(
            body,
            vec![
                vec![CellValue::from("C0"), CellValue::from("Widget"), CellValue::from(2.5)],
                vec![CellValue::from("C2"), CellValue::Empty, CellValue::from(4)],
            ]
        );
    }

    #[test]
    fn source_listing_names_sheets_and_tables() {
        let mut backend = backend();
        let mut query = Query::begin(&mut backend, "/work/etl", "Sources").unwrap();
        query.select_source("/work/source.xlsx").unwrap();
        let buffer = query.buffer().unwrap().to_owned();
        assert_eq!(buffer.labels(), &[Label::from("Name"), Label::from("Kind")]);
        assert_eq!(
            buffer.rows(),
            &[
                vec![CellValue::from("Sheet1"), CellValue::from("Sheet")],
                vec![CellValue::from("Lookup"), CellValue::from("Sheet")],
                vec![CellValue::from("tblLookup"), CellValue::from("Table")],
            ]
        );
        query.commit().unwrap();
    }

    #[test]
    fn failed_body_skips_commit() {
        let mut backend = backend();
        let result = Query::run(&mut backend, "/work/etl.xlsx", "Broken", |query| {
            query.select_source("/work/source.xlsx")?.navigate("Missing", None)?;
            Ok(())
        });
        assert!(matches!(
            result,
            Err(QueryError::SourceNotFound { kind: SourceKind::Sheet, .. })
        ));

        let result = Query::run(&mut backend, "/work/etl.xlsx", "Broken", |query| {
            query
                .select_source("/work/source.xlsx")?
                .navigate("Lookup", Some("tblLookup"))?
                .drop_columns_idx(&[5])?;
            Ok(())
        });
        assert!(matches!(result, Err(QueryError::SchemaMismatch(_))));

        let document = backend.list_open_documents().unwrap()[0].handle;
        assert_eq!(backend.document(&document).unwrap().name, "etl.xlsx");
        assert!(backend.list_sheets(&document).unwrap().is_empty());
    }

    #[test]
    fn session_errors() {
        let mut backend = backend();
        let mut query = Query::begin(&mut backend, "/work/etl.xlsx", "Early").unwrap();
        assert!(matches!(query.navigate("Sheet1", None), Err(QueryError::MissingSource(_))));
        assert!(matches!(query.remove_first_rows(1), Err(QueryError::SessionFailed(_))));
        assert!(matches!(query.commit(), Err(QueryError::SessionFailed(_))));

        let query = Query::begin(&mut backend, "/work/etl.xlsx", "Empty").unwrap();
        assert!(matches!(query.commit(), Err(QueryError::NothingToCommit(_))));

        let mut query = Query::begin(&mut backend, "/work/etl.xlsx", "Unsourced").unwrap();
        assert!(matches!(query.promote_headers(), Err(QueryError::MissingSource(_))));
        assert!(matches!(query.commit(), Err(QueryError::SessionFailed(_))));

        let result = Query::begin(&mut backend, "/work/missing.xlsx", "Nowhere");
        assert!(matches!(
            result,
            Err(QueryError::SourceNotFound { kind: SourceKind::Workbook, .. })
        ));
    }

    #[test]
    fn text_columns_through_session() {
        let mut backend = backend();
        Query::run(&mut backend, "/work/etl.xlsx", "Codes", |query| {
            query
                .select_source("/work/source.xlsx")?
                .navigate("Lookup", Some("tblLookup"))?
                .extract_text_column("Code", &TextPattern::regex(r"^([A-Z])(\d+)$"), &[Label::from("Letter"), Label::from("Number")])?
                .split_text_column("Name", &TextPattern::literal("dg"), None)?
                .replace_value_text_column("Code", &TextPattern::literal("C"), "K")?
                .rename_column("Price", "Unit price")?
                .drop_columns_idx(&[1])?;
            Ok(())
        })
        .unwrap();

        let (headers, body) = destination_table(&backend, "Codes");
        assert_eq!(headers, vec!["Code", "Unit price", "Letter", "Number", "Name.1", "Name.2"]);
        assert_eq!(
            body[0],
            vec![
                CellValue::from("K0"),
                CellValue::from(2.5),
                CellValue::from("C"),
                CellValue::from("0"),
                CellValue::from("Wi"),
                CellValue::from("et"),
            ]
        );
        assert_eq!(body[1][4], CellValue::Empty);
    }

    #[test]
    fn fuzzy_source_on_disk() {
        let directory = tempfile::tempdir().unwrap();
        let source = directory.path().join("Quarterly Sales.xlsx");
        std::fs::write(&source, crate::spreadsheet::xlsx::tests::sample_xlsx()).unwrap();

        let mut fuzzy = backend();
        let config = QueryConfig::default().with_fuzzy(true).with_visible(false);
        let mut query = Query::begin_with(&mut fuzzy, "/work/etl.xlsx", "Fuzzy", config).unwrap();
        query.select_source(directory.path().join("quarterly_sales")).unwrap();
        query.navigate("Data", Some("tblSales")).unwrap();
        assert_eq!(query.buffer().unwrap().row_count(), 2);
        query.commit().unwrap();

        let mut strict = backend();
        let mut query = Query::begin(&mut strict, "/work/etl.xlsx", "Strict").unwrap();
        let result = query.select_source(directory.path().join("quarterly_sales"));
        assert!(matches!(
            result,
            Err(QueryError::SourceNotFound { kind: SourceKind::Workbook, .. })
        ));
    }

    #[test]
    fn read_first_sheet_with_header_row() {
        let mut backend = backend();
        Query::run(&mut backend, "/work/etl.xlsx", "Report", |query| {
            query.read("/work/source.xlsx", SheetRef::default(), None, Some(4))?;
            let buffer = query.buffer().unwrap();
            assert_eq!(buffer.labels()[1], Label::from("Code"));
            assert_eq!(buffer.labels()[4], Label::Position(4));
            assert_eq!(buffer.row_count(), 22);
            Ok(())
        })
        .unwrap();

        let mut query = Query::begin(&mut backend, "/work/etl.xlsx", "Lookup").unwrap();
        query.read("/work/source.xlsx", 1usize, Some("tblLookup"), Some(1)).unwrap();
        assert_eq!(query.buffer().unwrap().labels()[0], Label::from("Code"));
        assert_eq!(query.buffer().unwrap().row_count(), 2);

        query.navigate(1usize, None).unwrap();
        assert_eq!(query.buffer().unwrap().labels()[0], Label::Position(0));
        assert_eq!(query.buffer().unwrap().row_count(), 3);

        assert!(matches!(
            query.navigate(2usize, None),
            Err(QueryError::SourceNotFound { kind: SourceKind::Sheet, .. })
        ));
    }

    struct FixedName(&'static str);

    impl NameResolver for FixedName {
        fn best_match(&self, _target: &str, candidates: &[String]) -> Option<String> {
            candidates.iter().find(|candidate| candidate.as_str() == self.0).cloned()
        }
    }

    #[test]
    fn custom_name_resolver_inside_run() {
        let mut backend = backend();
        let config = QueryConfig::default().with_fuzzy(true);
        Query::run_with(&mut backend, "/work/etl.xlsx", "Custom", config, |query| {
            query.select_source("/work/source.xlsx")?;
            query
                .set_name_resolver(FixedName("source.xlsx"))
                .select_source("/work/renamed.xlsx")?
                .navigate("Lookup", Some("tblLookup"))?;
            Ok(())
        })
        .unwrap();

        let (headers, body) = destination_table(&backend, "Custom");
        assert_eq!(headers, vec!["Code", "Name", "Price"]);
        assert_eq!(body.len(), 2);
    }
}

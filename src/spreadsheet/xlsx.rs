//! Loads Excel 2007+ workbooks (.xlsx, .xlsm) into in-memory documents.
//!
//! Only what the query engine needs is read: sheet names, cell values (shared strings,
//! inline strings, booleans, errors, numbers, dates by number format) and table parts
//! with their auto-filter state.
use crate::database::range::Range;
use crate::database::range::RangeError;
use crate::helpers::xml::XmlAttributeHelper;
use crate::helpers::xml::XmlError;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::is_builtin_date_format;
use crate::spreadsheet::cell::is_date_format_code;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::criteria::FilterColumn;
use crate::spreadsheet::criteria::FilterCriterion;
use crate::spreadsheet::criteria::FilterJoin;
use crate::spreadsheet::criteria::FilterState;
use crate::spreadsheet::criteria::NumberComparison;
use crate::spreadsheet::criteria::TextMatchKind;
use crate::spreadsheet::memory::Document;
use crate::spreadsheet::memory::Sheet;
use crate::spreadsheet::memory::Table;
use crate::spreadsheet::reference::CellRef;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use std::path::Path;
use thiserror::Error;
use tracing::debug;
use tracing::warn;
use zip::result::ZipError;
use zip::ZipArchive;

const TAG_CUSTOM_FORMATS: QName = QName(b"numFmts");
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt");
const TAG_FORMAT_INDEXES: QName = QName(b"cellXfs");
const TAG_FORMAT_INDEX: QName = QName(b"xf");
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");
const TAG_TEXT: QName = QName(b"t");
const TAG_WORKBOOK_PROPERTIES: QName = QName(b"workbookPr");
const TAG_SHEET: QName = QName(b"sheet");
const TAG_ROW: QName = QName(b"row");
const TAG_CELL: QName = QName(b"c");
const TAG_INLINE_STRING: QName = QName(b"is");
const TAG_VALUE: QName = QName(b"v");
const TAG_TABLE: QName = QName(b"table");
const TAG_TABLE_COLUMN: QName = QName(b"tableColumn");
const TAG_FILTER_COLUMN: QName = QName(b"filterColumn");
const TAG_FILTERS: QName = QName(b"filters");
const TAG_FILTER: QName = QName(b"filter");
const TAG_CUSTOM_FILTERS: QName = QName(b"customFilters");
const TAG_CUSTOM_FILTER: QName = QName(b"customFilter");
const TAG_RELATIONSHIP: &[u8] = b"Relationship";

const WORKSHEET_RELATIONSHIP: &str = "/worksheet";
const TABLE_RELATIONSHIP: &str = "/table";

/// Errors raised while loading an xlsx package.
#[derive(Error, Debug)]
pub enum XlsxError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Zip(#[from] ZipError),

    #[error("{0}")]
    Xml(#[from] XmlError),

    #[error("{0}")]
    Range(#[from] RangeError),

    #[error("Missing part '{0}'")]
    MissingPart(String),

    #[error("Invalid value '{value}' in '{part}'")]
    InvalidValue { part: String, value: String },
}

/// Cell type as declared by the `t` attribute (and the style, for dates).
#[derive(Copy, Clone, Debug, PartialEq)]
enum CellType {
    Number,
    Date,
    SharedString,
    InlineString,
    Boolean,
    Error,
    IsoDateTime,
}

/// Loads the workbook at `path`.
pub fn load_document(path: &Path) -> Result<Document, XlsxError> {
    let file = File::open(path)?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let mut document = read_document(&name, BufReader::new(file))?;
    document.path = path.to_path_buf();
    Ok(document)
}

/// Reads an xlsx package from any seekable reader.
pub fn read_document<RS: Read + Seek>(name: &str, reader: RS) -> Result<Document, XlsxError> {
    let mut zip = ZipArchive::new(reader)?;
    let relationships = load_relationships(&mut zip, "xl/_rels/workbook.xml.rels", WORKSHEET_RELATIONSHIP)?;
    let (sheet_parts, is_1904) = load_workbook(&mut zip, &relationships)?;
    let shared_strings = load_shared_strings(&mut zip)?;
    let date_styles = load_date_styles(&mut zip)?;

    let mut document = Document::new(name);
    for (sheet_name, part) in sheet_parts {
        let mut sheet = Sheet::new(&sheet_name);
        load_cells(&mut zip, &part, &mut sheet, &shared_strings, &date_styles, is_1904)?;
        for table_part in load_relationships(&mut zip, &relationships_part(&part), TABLE_RELATIONSHIP)?.into_values() {
            if let Some(table) = load_table(&mut zip, &table_part)? {
                sheet.tables.push(table);
            }
        }
        debug!(sheet = %sheet_name, cells = sheet.cells.len(), tables = sheet.tables.len(), "loaded sheet");
        document.sheets.push(sheet);
    }
    Ok(document)
}

/// Loads relationships of one type from a `.rels` part, keyed by relationship id.
/// A missing part yields no relationships.
fn load_relationships<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
    path: &str,
    kind_suffix: &str,
) -> Result<BTreeMap<String, String>, XlsxError> {
    let base = source_directory(path);
    let mut relationships = BTreeMap::new();
    let mut reader = match zip.xml_reader(path)? {
        Some(reader) => reader,
        None => return Ok(relationships),
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let kind = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            if kind.map(|it| it.ends_with(kind_suffix)).unwrap_or(false) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), resolve_part(&base, &target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Reads sheet names with their part paths, and the date system.
fn load_workbook<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
    relationships: &BTreeMap<String, String>,
) -> Result<(Vec<(String, String)>, bool), XlsxError> {
    let mut reader = zip.xml_reader("xl/workbook.xml")?
        .ok_or_else(|| XlsxError::MissingPart("xl/workbook.xml".to_owned()))?;
    let mut sheets = Vec::new();
    let mut is_1904 = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let mut name = None;
            let mut id = None;
            for result in event.attributes() {
                let attribute = result.map_err(XmlError::from)?;
                let key = attribute.key.local_name();
                if key.as_ref() == b"name" {
                    name = Some(attribute.get_value()?.to_string());
                } else if key.as_ref() == b"id" {
                    id = Some(attribute.get_value()?.to_string());
                }
            }
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(&id) {
                    sheets.push((name, path.to_owned()));
                }
            }
        }
        Event::Start(event) if event.name() == TAG_WORKBOOK_PROPERTIES => {
            is_1904 = event.get_attribute_value("date1904")?
                .map(|value| value.eq("1") || value.eq("true"))
                .unwrap_or(false);
        }
    });
    Ok((sheets, is_1904))
}

fn load_shared_strings<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<Vec<String>, XlsxError> {
    let mut shared_strings = Vec::new();
    let mut reader = match zip.xml_reader("xl/sharedStrings.xml")? {
        Some(reader) => reader,
        None => return Ok(shared_strings),
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
            shared_strings.push(read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?);
        }
    });
    Ok(shared_strings)
}

/// For every cell style index, whether its number format displays a date or time.
fn load_date_styles<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<Vec<bool>, XlsxError> {
    let mut reader = match zip.xml_reader("xl/styles.xml")? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::<u32, bool>::new();
    let mut format_indexes_context = false;
    let mut format_indexes = Vec::<u32>::new();

    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = true,
        Event::End(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = false,
        Event::Start(event) if custom_formats_context && event.name() == TAG_CUSTOM_FORMAT => {
            let id = event.parse_attribute_value::<u32>("numFmtId")?;
            let format = event.get_attribute_value("formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                custom_formats.insert(id, is_date_format_code(&format));
            }
        }
        Event::Start(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = true,
        Event::End(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = false,
        Event::Start(event) if format_indexes_context && event.name() == TAG_FORMAT_INDEX => {
            format_indexes.push(event.parse_attribute_value::<u32>("numFmtId")?.unwrap_or(0));
        }
    });

    Ok(format_indexes
        .into_iter()
        .map(|id| custom_formats.get(&id).copied().unwrap_or_else(|| is_builtin_date_format(id)))
        .collect())
}

fn load_cells<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
    part: &str,
    sheet: &mut Sheet,
    shared_strings: &[String],
    date_styles: &[bool],
    is_1904: bool,
) -> Result<(), XlsxError> {
    let mut reader = zip.xml_reader(part)?
        .ok_or_else(|| XlsxError::MissingPart(part.to_owned()))?;
    let mut row_count = 0usize;
    let mut col_count = 0usize;
    let mut position = CellRef::ORIGIN;
    let mut kind = CellType::Number;
    let mut value = String::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_ROW => {
            if let Some(row) = event.parse_attribute_value::<usize>("r")? {
                row_count = row.saturating_sub(1);
            }
            col_count = 0;
        }
        Event::End(event) if event.name() == TAG_ROW => {
            row_count += 1;
            col_count = 0;
        }
        Event::Start(event) if event.name() == TAG_CELL => {
            position = event.get_attribute_value("r")?
                .and_then(|reference| CellRef::parse(&reference))
                .unwrap_or(CellRef::new(row_count, col_count));
            row_count = position.row;
            col_count = position.col + 1;
            kind = event.get_attribute_value("t")?.map(|t| {
                match t.as_ref() {
                    "inlineStr" | "str" => CellType::InlineString,
                    "s" => CellType::SharedString,
                    "d" => CellType::IsoDateTime,
                    "b" => CellType::Boolean,
                    "e" => CellType::Error,
                    _ => CellType::Number,
                }
            }).unwrap_or(CellType::Number);
            if kind == CellType::Number {
                let style = event.parse_attribute_value::<usize>("s")?.unwrap_or(0);
                if date_styles.get(style).copied().unwrap_or(false) {
                    kind = CellType::Date;
                }
            }
            value.clear();
        }
        Event::Start(event) if event.name() == TAG_INLINE_STRING => {
            value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
        }
        Event::Start(event) if event.name() == TAG_VALUE => {
            value = read_string_value(&mut reader, TAG_VALUE, true)?;
        }
        Event::End(event) if event.name() == TAG_CELL => {
            if !value.is_empty() {
                let cell = to_cell_value(kind, &value, shared_strings, is_1904)
                    .ok_or_else(|| XlsxError::InvalidValue {
                        part: part.to_owned(),
                        value: value.to_owned(),
                    })?;
                sheet.cells.insert(position, cell);
            }
            value.clear();
        }
    });
    Ok(())
}

fn to_cell_value(kind: CellType, value: &str, shared_strings: &[String], is_1904: bool) -> Option<CellValue> {
    let cell = match kind {
        CellType::SharedString => {
            let index = value.trim().parse::<usize>().ok()?;
            CellValue::Text(shared_strings.get(index)?.to_owned())
        }
        CellType::InlineString => CellValue::Text(value.to_owned()),
        CellType::Boolean => CellValue::Bool(value.trim() == "1" || value.trim().eq_ignore_ascii_case("true")),
        CellType::Error => CellValue::Error(value.to_owned()),
        CellType::IsoDateTime => NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(value, "%Y-%m-%d")
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
            })
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::Text(value.to_owned())),
        CellType::Number => CellValue::Number(value.trim().parse().ok()?),
        CellType::Date => {
            let serial = value.trim().parse::<f64>().ok()?;
            CellValue::from_serial(serial, is_1904).unwrap_or(CellValue::Number(serial))
        }
    };
    Some(cell)
}

/// Reads a table part. Tables without a header row are skipped.
fn load_table<RS: Read + Seek>(zip: &mut ZipArchive<RS>, part: &str) -> Result<Option<Table>, XlsxError> {
    let mut reader = zip.xml_reader(part)?
        .ok_or_else(|| XlsxError::MissingPart(part.to_owned()))?;
    let mut name = String::new();
    let mut range = Range::default();
    let mut header_rows = 1usize;
    let mut totals_rows = 0usize;
    let mut columns = Vec::<String>::new();
    let mut filters = Vec::<(usize, FilterJoin, Vec<FilterCriterion>)>::new();
    let mut filter_column = None::<(usize, FilterJoin, Vec<FilterCriterion>)>;
    let mut values = Vec::<String>::new();

    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_TABLE => {
            name = event.get_attribute_value("displayName")?
                .or(event.get_attribute_value("name")?)
                .map(|name| name.to_string())
                .unwrap_or_default();
            if let Some(reference) = event.get_attribute_value("ref")? {
                range = Range::try_from(reference.as_ref())?;
            }
            header_rows = event.parse_attribute_value("headerRowCount")?.unwrap_or(1);
            totals_rows = event.parse_attribute_value("totalsRowCount")?.unwrap_or(0);
        }
        Event::Start(event) if event.name() == TAG_TABLE_COLUMN => {
            columns.push(event.get_attribute_value("name")?.map(|name| name.to_string()).unwrap_or_default());
        }
        Event::Start(event) if event.name() == TAG_FILTER_COLUMN => {
            let id = event.parse_attribute_value::<usize>("colId")?.unwrap_or(0);
            filter_column = Some((id, FilterJoin::Any, Vec::new()));
        }
        Event::End(event) if event.name() == TAG_FILTER_COLUMN => {
            if let Some(column) = filter_column.take() {
                filters.push(column);
            }
        }
        Event::Start(event) if event.name() == TAG_FILTERS => {
            values.clear();
            let blank = event.get_attribute_value("blank")?
                .map(|value| value == "1" || value == "true")
                .unwrap_or(false);
            if let (true, Some((_, _, criteria))) = (blank, filter_column.as_mut()) {
                criteria.push(FilterCriterion::Blanks);
            }
        }
        Event::Start(event) if event.name() == TAG_FILTER => {
            if let Some(value) = event.get_attribute_value("val")? {
                values.push(value.to_string());
            }
        }
        Event::End(event) if event.name() == TAG_FILTERS => {
            if let (false, Some((_, _, criteria))) = (values.is_empty(), filter_column.as_mut()) {
                criteria.push(FilterCriterion::Values(std::mem::take(&mut values)));
            }
        }
        Event::Start(event) if event.name() == TAG_CUSTOM_FILTERS => {
            let all = event.get_attribute_value("and")?
                .map(|value| value == "1" || value == "true")
                .unwrap_or(false);
            if let (true, Some((_, join, _))) = (all, filter_column.as_mut()) {
                *join = FilterJoin::All;
            }
        }
        Event::Start(event) if event.name() == TAG_CUSTOM_FILTER => {
            let operator = event.get_attribute_value("operator")?.map(|value| value.to_string());
            let value = event.get_attribute_value("val")?.map(|value| value.to_string()).unwrap_or_default();
            match (custom_criterion(operator.as_deref().unwrap_or("equal"), &value), filter_column.as_mut()) {
                (Some(criterion), Some((_, _, criteria))) => criteria.push(criterion),
                (None, _) => debug!(table = %name, ?operator, %value, "unsupported custom filter ignored"),
                _ => (),
            }
        }
    });

    let (Some(anchor), Some(width), Some(height)) = (range.first(), range.width(), range.height()) else {
        return Err(XlsxError::InvalidValue {
            part: part.to_owned(),
            value: format!("{range:?}"),
        });
    };
    if header_rows == 0 {
        warn!(table = %name, "table without header row skipped");
        return Ok(None);
    }

    let mut table = Table::new(&name, anchor);
    table.width = width;
    table.rows = height.saturating_sub(header_rows + totals_rows);
    table.totals = totals_rows.min(height.saturating_sub(header_rows));
    table.filter = FilterState {
        columns: filters
            .into_iter()
            .filter(|(_, _, criteria)| !criteria.is_empty())
            .filter_map(|(id, join, criteria)| {
                columns.get(id).map(|column| FilterColumn {
                    column: column.to_owned(),
                    join,
                    criteria,
                })
            })
            .collect(),
    };
    Ok(Some(table))
}

/// Maps a `customFilter` operator and value to a criterion.
fn custom_criterion(operator: &str, value: &str) -> Option<FilterCriterion> {
    if let Ok(number) = value.parse::<f64>() {
        let comparison = match operator {
            "equal" => NumberComparison::Equal(number),
            "notEqual" => NumberComparison::NotEqual(number),
            "greaterThan" => NumberComparison::GreaterThan(number),
            "greaterThanOrEqual" => NumberComparison::GreaterThanOrEqual(number),
            "lessThan" => NumberComparison::LessThan(number),
            "lessThanOrEqual" => NumberComparison::LessThanOrEqual(number),
            _ => return None,
        };
        return Some(FilterCriterion::Number(comparison));
    }
    if operator != "equal" {
        return None;
    }
    let (kind, pattern) = match (value.strip_prefix('*'), value.strip_suffix('*')) {
        (Some(rest), Some(_)) if !rest.is_empty() => (TextMatchKind::Contains, &rest[..rest.len() - 1]),
        (Some(rest), None) => (TextMatchKind::EndsWith, rest),
        (None, Some(rest)) => (TextMatchKind::BeginsWith, rest),
        _ => (TextMatchKind::Equals, value),
    };
    Some(FilterCriterion::Text {
        kind,
        pattern: pattern.to_owned(),
    })
}

/// Reads string content up to `end_tag`, skipping phonetic runs.
fn read_string_value<R: BufRead>(
    reader: &mut XmlReader<R>,
    end_tag: QName,
    is_text_content: bool,
) -> Result<String, XlsxError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_str(&event.xml_content().map_err(XmlError::from)?),
        Event::CData(event) if is_text => text.push_str(&event.xml_content().map_err(XmlError::from)?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}

/// `xl/worksheets/sheet1.xml` -> `xl/worksheets/_rels/sheet1.xml.rels`
fn relationships_part(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((directory, file)) => format!("{directory}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Directory a `.rels` part describes: `xl/_rels/workbook.xml.rels` -> `xl`.
fn source_directory(rels_part: &str) -> String {
    rels_part
        .rsplit_once("/_rels/")
        .map(|(directory, _)| directory.to_owned())
        .unwrap_or_default()
}

/// Resolves a relationship target against the directory of its source part.
fn resolve_part(base: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_owned();
    }
    let mut segments: Vec<&str> = base.split('/').filter(|segment| !segment.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => (),
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }
    segments.join("/")
}

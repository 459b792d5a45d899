//! Spreadsheet grids and workbook (de)serialization.
//!
//! Workbooks are read with calamine (xlsx, xlsm, xls, xlsb, ods) or the
//! csv reader. Writing is limited to OOXML and csv and always produces a
//! single sheet named `Sheet1` holding the edited grid.

use crate::classification::extension;
use crate::error::{Result, VaultError};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::io::{Cursor, Write};
use tracing::debug;

/// Name of the only sheet written back to the repository.
pub const WRITTEN_SHEET_NAME: &str = "Sheet1";

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Numeric cell.
    Number(f64),
    /// Text cell. Non-numeric typed values (dates, booleans, errors) land here.
    Text(String),
    /// Empty cell.
    Absent,
}

impl CellValue {
    /// Returns true for absent cells and empty strings.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Absent => true,
            Self::Text(s) => s.is_empty(),
            Self::Number(_) => false,
        }
    }

    /// Parses user input the way a grid editor would: numbers stay numbers.
    ///
    /// Only canonical numeric text becomes a [`CellValue::Number`], so that
    /// writing the cell back reproduces the input. `"007"`, `" 5"` and
    /// `"1.50"` stay text.
    pub fn from_input(input: &str) -> Self {
        if input.is_empty() {
            return Self::Absent;
        }
        match input.parse::<f64>() {
            Ok(n) if n.is_finite() && n.to_string() == input => Self::Number(n),
            _ => Self::Text(input.to_string()),
        }
    }

    fn from_calamine(cell: &Data) -> Self {
        match cell {
            Data::Empty => Self::Absent,
            Data::String(s) => Self::Text(s.clone()),
            Data::Float(f) => Self::Number(*f),
            Data::Int(i) => Self::Number(*i as f64),
            other => Self::Text(other.to_string()),
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
            Self::Absent => Ok(()),
        }
    }
}

/// Ordered rows of cells. Rows need not be rectangular.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpreadsheetGrid {
    /// Row-major cells.
    pub rows: Vec<Vec<CellValue>>,
}

impl SpreadsheetGrid {
    /// Creates a grid from rows, normalized.
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        let mut grid = Self { rows };
        grid.normalize();
        grid
    }

    /// Canonical form: blank cells are `Absent`, trailing blank cells are
    /// trimmed from each row and trailing empty rows are dropped.
    pub fn normalize(&mut self) {
        for row in &mut self.rows {
            for cell in row.iter_mut() {
                if cell.is_blank() {
                    *cell = CellValue::Absent;
                }
            }
            while matches!(row.last(), Some(CellValue::Absent)) {
                row.pop();
            }
        }
        while matches!(self.rows.last(), Some(row) if row.is_empty()) {
            self.rows.pop();
        }
    }

    /// Returns the cell at (row, col), `Absent` when out of range.
    pub fn get(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&CellValue::Absent)
    }

    /// Sets a cell, growing the grid as needed, then re-normalizes.
    pub fn set(&mut self, row: usize, col: usize, value: CellValue) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize(col + 1, CellValue::Absent);
        }
        cells[col] = value;
        self.normalize();
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Length of the longest row.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Returns true if the grid holds no cells.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A named sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    /// Sheet name as stored in the workbook.
    pub name: String,
    /// Sheet contents.
    pub grid: SpreadsheetGrid,
}

/// Ordered sheets of a decoded workbook.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Workbook {
    /// Sheets in workbook order.
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    /// Wraps an edited grid as the single sheet that gets written back.
    pub fn single(grid: SpreadsheetGrid) -> Self {
        Self {
            sheets: vec![Sheet {
                name: WRITTEN_SHEET_NAME.to_string(),
                grid,
            }],
        }
    }

    /// Returns the sheet at `index`.
    pub fn sheet(&self, index: usize) -> Result<&Sheet> {
        self.sheets.get(index).ok_or_else(|| {
            VaultError::parse(
                "spreadsheet",
                format!("sheet {} out of range ({} sheets)", index, self.sheets.len()),
            )
        })
    }

    /// Sheet names in order.
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }
}

/// On-disk spreadsheet format, derived from the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadsheetFormat {
    /// Office Open XML workbook (xlsx, xlsm).
    Ooxml,
    /// Comma-separated values.
    Csv,
    /// Formats calamine reads but this crate does not write (xls, xlsb, ods).
    ReadOnly,
}

impl SpreadsheetFormat {
    /// Picks the format for a path. Unknown extensions are treated as OOXML.
    pub fn for_path(path: &str) -> Self {
        match extension(path).as_deref() {
            Some("csv") => Self::Csv,
            Some("xls") | Some("xlsb") | Some("ods") => Self::ReadOnly,
            _ => Self::Ooxml,
        }
    }

    /// Returns true if edited grids can be written in this format.
    pub fn is_writable(&self) -> bool {
        !matches!(self, Self::ReadOnly)
    }
}

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Parses a spreadsheet payload. Container formats are sniffed from the
/// leading bytes; anything else is read as csv.
pub fn read_workbook(payload: &[u8]) -> Result<Workbook> {
    if payload.starts_with(ZIP_MAGIC) || payload.starts_with(OLE_MAGIC) {
        read_container(payload)
    } else {
        read_csv(payload)
    }
}

fn read_container(payload: &[u8]) -> Result<Workbook> {
    let mut sheets_reader = open_workbook_auto_from_rs(Cursor::new(payload.to_vec()))
        .map_err(|e| VaultError::parse("spreadsheet", e))?;

    let mut sheets = Vec::new();
    for name in sheets_reader.sheet_names() {
        let range = sheets_reader
            .worksheet_range(&name)
            .map_err(|e| VaultError::parse("spreadsheet", e))?;

        let mut rows = Vec::new();
        if let Some((start_row, start_col)) = range.start() {
            rows.resize_with(start_row as usize, Vec::new);
            for row in range.rows() {
                let mut cells = vec![CellValue::Absent; start_col as usize];
                cells.extend(row.iter().map(CellValue::from_calamine));
                rows.push(cells);
            }
        }
        sheets.push(Sheet {
            name,
            grid: SpreadsheetGrid::new(rows),
        });
    }

    debug!(sheets = sheets.len(), "Decoded workbook");
    Ok(Workbook { sheets })
}

fn read_csv(payload: &[u8]) -> Result<Workbook> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(payload);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| VaultError::parse("csv", e))?;
        rows.push(record.iter().map(CellValue::from_input).collect());
    }

    Ok(Workbook::single(SpreadsheetGrid::new(rows)))
}

/// Serializes a grid as the single sheet of a new file in `format`.
pub fn write_grid(grid: &SpreadsheetGrid, format: SpreadsheetFormat) -> Result<Vec<u8>> {
    match format {
        SpreadsheetFormat::Ooxml => write_ooxml(grid),
        SpreadsheetFormat::Csv => write_csv(grid),
        SpreadsheetFormat::ReadOnly => Err(VaultError::parse(
            "spreadsheet",
            "this format can be previewed but not written",
        )),
    }
}

fn write_csv(grid: &SpreadsheetGrid) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    for row in &grid.rows {
        // A record with no fields would be dropped entirely; keep the row.
        if row.is_empty() {
            writer
                .write_record([""])
                .map_err(|e| VaultError::parse("csv", e))?;
        } else {
            writer
                .write_record(row.iter().map(|c| c.to_string()))
                .map_err(|e| VaultError::parse("csv", e))?;
        }
    }
    writer
        .into_inner()
        .map_err(|e| VaultError::parse("csv", e.to_string()))
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/></Relationships>"#;

fn workbook_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        WRITTEN_SHEET_NAME
    )
}

fn write_ooxml(grid: &SpreadsheetGrid) -> Result<Vec<u8>> {
    let mut strings: Vec<&str> = Vec::new();
    let mut sheet = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );

    for (r, row) in grid.rows.iter().enumerate() {
        if row.iter().all(CellValue::is_blank) {
            continue;
        }
        let _ = write!(sheet, r#"<row r="{}">"#, r + 1);
        for (c, cell) in row.iter().enumerate() {
            let reference = cell_reference(r, c);
            match cell {
                CellValue::Absent => {}
                CellValue::Number(n) => {
                    let _ = write!(sheet, r#"<c r="{}"><v>{}</v></c>"#, reference, n);
                }
                CellValue::Text(s) if s.is_empty() => {}
                CellValue::Text(s) => {
                    let index = match strings.iter().position(|e| *e == s.as_str()) {
                        Some(index) => index,
                        None => {
                            strings.push(s.as_str());
                            strings.len() - 1
                        }
                    };
                    let _ = write!(sheet, r#"<c r="{}" t="s"><v>{}</v></c>"#, reference, index);
                }
            }
        }
        sheet.push_str("</row>");
    }
    sheet.push_str("</sheetData></worksheet>");

    let mut shared = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{0}" uniqueCount="{0}">"#,
        strings.len()
    );
    for s in &strings {
        let _ = write!(shared, r#"<si><t xml:space="preserve">{}</t></si>"#, xml_escape(s));
    }
    shared.push_str("</sst>");

    let workbook = workbook_xml();
    let parts: [(&str, &[u8]); 6] = [
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("_rels/.rels", ROOT_RELS.as_bytes()),
        ("xl/workbook.xml", workbook.as_bytes()),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.as_bytes()),
        ("xl/worksheets/sheet1.xml", sheet.as_bytes()),
        ("xl/sharedStrings.xml", shared.as_bytes()),
    ];

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);
    for (name, bytes) in parts {
        zip.start_file(name, options)
            .map_err(|e| VaultError::parse("spreadsheet", e))?;
        zip.write_all(bytes)?;
    }
    let cursor = zip
        .finish()
        .map_err(|e| VaultError::parse("spreadsheet", e))?;
    Ok(cursor.into_inner())
}

/// A1-style reference for a zero-based (row, col).
fn cell_reference(row: usize, col: usize) -> String {
    let mut letters = Vec::new();
    let mut n = col + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    format!("{}{}", String::from_utf8_lossy(&letters), row + 1)
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

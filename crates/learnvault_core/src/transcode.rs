//! Conversion between raw payloads, the base64 transport encoding and
//! decoded display forms.

use crate::classification::{classify, ContentCategory};
use crate::error::{Result, VaultError};
use crate::spreadsheet::{read_workbook, write_grid, SpreadsheetFormat, SpreadsheetGrid, Workbook};
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Decoded, human-editable form of a payload.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayForm {
    /// UTF-8 text.
    Text(String),
    /// Parsed workbook.
    Spreadsheet(Workbook),
}

/// Decodes a transport string into raw bytes.
///
/// The hosted API wraps base64 content with line breaks, so all ASCII
/// whitespace is removed first.
pub fn from_transport(encoded: &str) -> Result<Vec<u8>> {
    let compact: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| VaultError::parse("transport payload", e))
}

/// Encodes raw bytes for transport.
pub fn to_transport(payload: &[u8]) -> String {
    STANDARD.encode(payload)
}

/// Decodes a payload for display.
///
/// Text is recovered byte for byte as UTF-8; invalid sequences are a
/// parse failure rather than a lossy decode. Categories without a preview
/// are refused.
pub fn decode(payload: &[u8], category: ContentCategory) -> Result<DisplayForm> {
    match category {
        ContentCategory::Text { .. } => String::from_utf8(payload.to_vec())
            .map(DisplayForm::Text)
            .map_err(|e| VaultError::parse("text payload", e)),
        ContentCategory::Spreadsheet => read_workbook(payload).map(DisplayForm::Spreadsheet),
        other => Err(VaultError::PreviewUnsupported {
            category: other.name().to_string(),
        }),
    }
}

/// Encodes a display form into the payload stored at `path`.
///
/// Spreadsheets are written as a single sheet holding the first sheet of
/// the workbook, in the format implied by the path.
pub fn encode(form: &DisplayForm, path: &str) -> Result<Vec<u8>> {
    match (form, classify(path)) {
        (DisplayForm::Text(text), ContentCategory::Text { .. }) => Ok(text.as_bytes().to_vec()),
        (DisplayForm::Spreadsheet(workbook), ContentCategory::Spreadsheet) => {
            let grid = match workbook.sheets.first() {
                Some(sheet) => &sheet.grid,
                None => return encode_grid(&SpreadsheetGrid::default(), path),
            };
            encode_grid(grid, path)
        }
        (_, category) => Err(VaultError::parse(
            "display form",
            format!("cannot store this content as a {} file", category.name()),
        )),
    }
}

/// Encodes an edited grid for `path`.
pub fn encode_grid(grid: &SpreadsheetGrid, path: &str) -> Result<Vec<u8>> {
    write_grid(grid, SpreadsheetFormat::for_path(path))
}

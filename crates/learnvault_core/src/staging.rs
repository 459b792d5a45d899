//! File edits staged in an edit session, pending submission.

use crate::classification::{file_name, ContentCategory};
use crate::error::{Result, VaultError};
use crate::spreadsheet::{SpreadsheetFormat, SpreadsheetGrid};
use crate::transcode::encode_grid;
use crate::types::{RemoteFile, RepoPath, VersionToken};
use std::fs;
use std::path::Path;

/// Where a staged edit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOrigin {
    /// A local file uploaded as a new repository file.
    LocalUpload,
    /// A repository file opened and edited as text.
    RemoteEdit,
    /// A repository spreadsheet edited in place.
    SpreadsheetEdit,
}

/// A file write waiting for the session to be submitted.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedEdit {
    /// Target path.
    pub path: RepoPath,
    /// New payload.
    pub payload: Vec<u8>,
    /// Version token the write is conditioned on; None creates the path.
    pub precondition: Option<VersionToken>,
    /// Origin of the edit.
    pub origin: EditOrigin,
}

impl StagedEdit {
    /// Stages a local upload. The repository path is the file name and
    /// the write creates a new path.
    pub fn local_upload(name: &str, payload: Vec<u8>) -> Result<Self> {
        Ok(Self {
            path: RepoPath::new(file_name(name))?,
            payload,
            precondition: None,
            origin: EditOrigin::LocalUpload,
        })
    }

    /// Reads a local file and stages it as an upload.
    pub fn from_local_file(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| VaultError::InvalidPath(path.display().to_string()))?;
        let payload = fs::read(path)?;
        Self::local_upload(name, payload)
    }

    /// Stages new text for a file read from the repository.
    ///
    /// Binary workbooks are edited through [`StagedEdit::spreadsheet_edit`];
    /// only text files and csv accept raw text.
    pub fn text_edit(file: &RemoteFile, text: &str) -> Result<Self> {
        ensure_writable(file)?;
        let accepts_text = match file.category() {
            ContentCategory::Text { .. } => true,
            ContentCategory::Spreadsheet => {
                SpreadsheetFormat::for_path(file.path.as_str()) == SpreadsheetFormat::Csv
            }
            _ => false,
        };
        if !accepts_text {
            return Err(VaultError::PreviewUnsupported {
                category: file.category().name().to_string(),
            });
        }
        Ok(Self {
            path: file.path.clone(),
            payload: text.as_bytes().to_vec(),
            precondition: Some(file.version.clone()),
            origin: EditOrigin::RemoteEdit,
        })
    }

    /// Stages an edited grid for a spreadsheet read from the repository.
    ///
    /// The grid is written as the only sheet of the new file.
    pub fn spreadsheet_edit(file: &RemoteFile, grid: &SpreadsheetGrid) -> Result<Self> {
        ensure_writable(file)?;
        if !SpreadsheetFormat::for_path(file.path.as_str()).is_writable() {
            return Err(VaultError::parse(
                "spreadsheet",
                format!("{} can be previewed but not edited", file.path.file_name()),
            ));
        }
        Ok(Self {
            path: file.path.clone(),
            payload: encode_grid(grid, file.path.as_str())?,
            precondition: Some(file.version.clone()),
            origin: EditOrigin::SpreadsheetEdit,
        })
    }
}

fn ensure_writable(file: &RemoteFile) -> Result<()> {
    match (&file.revision, file.read_only) {
        (Some(revision), _) => Err(VaultError::ReadOnly {
            path: file.path.to_string(),
            revision: revision.to_string(),
        }),
        (None, true) => Err(VaultError::ReadOnly {
            path: file.path.to_string(),
            revision: "unknown".to_string(),
        }),
        (None, false) => Ok(()),
    }
}

//! Edit session lifecycle for one record.
//!
//! The session owns the draft fields, the preview of the attached file
//! and at most one staged file edit. It performs no I/O itself: the
//! [`Vault`](crate::Vault) drives reads, writes and catalog calls and
//! reports their outcome back through the transition methods here.

use crate::classification::{mime_type, ContentCategory};
use crate::error::{ErrorKind, Result, VaultError};
use crate::spreadsheet::{CellValue, SpreadsheetGrid, Workbook};
use crate::staging::StagedEdit;
use crate::transcode::{decode, DisplayForm};
use crate::types::{EditState, LearningRecord, RemoteFile, RepoPath, Revision};
use tracing::debug;
use uuid::Uuid;

/// What the preview pane shows for the attached file.
#[derive(Debug, Clone, PartialEq)]
pub enum Preview {
    /// No file attached.
    None,
    /// Decoded text.
    Text {
        /// Decoded content.
        text: String,
        /// Display language tag.
        language: &'static str,
    },
    /// Decoded workbook with the active sheet selected.
    Spreadsheet {
        /// All sheets.
        workbook: Workbook,
        /// Index of the sheet being shown and edited.
        active_sheet: usize,
    },
    /// The category has no decoded preview.
    Unsupported {
        /// Category of the file.
        category: ContentCategory,
        /// MIME type for an external viewer.
        mime: String,
    },
    /// The attached path does not exist.
    Missing,
    /// The file could not be read or decoded. Editing is disabled.
    Error {
        /// Failure kind.
        kind: ErrorKind,
        /// Human-readable description.
        message: String,
    },
}

impl Preview {
    /// Builds the preview for a payload at `path`.
    pub fn decode(path: &RepoPath, payload: &[u8]) -> Self {
        let category = path.category();
        match decode(payload, category) {
            Ok(DisplayForm::Text(text)) => Preview::Text {
                text,
                language: category.language().unwrap_or(crate::classification::PLAIN_TEXT),
            },
            Ok(DisplayForm::Spreadsheet(workbook)) => Preview::Spreadsheet {
                workbook,
                active_sheet: 0,
            },
            Err(VaultError::PreviewUnsupported { .. }) => Preview::Unsupported {
                category,
                mime: mime_type(path.as_str()),
            },
            Err(e) => Preview::from_error(&e),
        }
    }

    /// Builds the preview for a failed read.
    pub fn from_error(error: &VaultError) -> Self {
        match error {
            VaultError::NotFound { .. } => Preview::Missing,
            other => Preview::Error {
                kind: other.kind(),
                message: other.to_string(),
            },
        }
    }

    /// The grid of the active sheet, if this is a spreadsheet preview.
    pub fn active_grid(&self) -> Option<&SpreadsheetGrid> {
        match self {
            Preview::Spreadsheet {
                workbook,
                active_sheet,
            } => workbook.sheets.get(*active_sheet).map(|s| &s.grid),
            _ => None,
        }
    }
}

/// One record's create or edit session.
#[derive(Debug)]
pub struct EditSession {
    id: Uuid,
    state: EditState,
    record: LearningRecord,
    original_path: Option<RepoPath>,
    opened: Option<RemoteFile>,
    preview: Preview,
    staged: Option<StagedEdit>,
    notice: Option<String>,
}

impl Default for EditSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EditSession {
    /// Creates an idle session.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: EditState::Idle,
            record: LearningRecord::draft(),
            original_path: None,
            opened: None,
            preview: Preview::None,
            staged: None,
            notice: None,
        }
    }

    /// Session identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current state.
    pub fn state(&self) -> &EditState {
        &self.state
    }

    /// Draft fields.
    pub fn record(&self) -> &LearningRecord {
        &self.record
    }

    /// Preview of the attached file.
    pub fn preview(&self) -> &Preview {
        &self.preview
    }

    /// Staged file edit, if any.
    pub fn staged(&self) -> Option<&StagedEdit> {
        self.staged.as_ref()
    }

    /// File currently opened for preview or editing.
    pub fn opened(&self) -> Option<&RemoteFile> {
        self.opened.as_ref()
    }

    /// Last surfaced message (error or confirmation).
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Id of the record being edited; None for a new record.
    pub fn record_id(&self) -> Option<i64> {
        self.record.id
    }

    /// Opens the session for a blank record.
    pub fn open_draft(&mut self) -> Result<()> {
        self.transition(EditState::Drafting)?;
        self.record = LearningRecord::draft();
        self.original_path = None;
        Ok(())
    }

    /// Opens the session for an existing record.
    ///
    /// The caller reads the attached file, if any, and hands the outcome
    /// to [`show_file`](Self::show_file).
    pub fn open_record(&mut self, record: LearningRecord) -> Result<()> {
        self.transition(EditState::Drafting)?;
        self.original_path = record.github_path.clone();
        self.record = record;
        Ok(())
    }

    /// Editable draft fields. Refused once submission has started.
    pub fn fields_mut(&mut self) -> Result<&mut LearningRecord> {
        self.ensure_editable("edit fields")?;
        Ok(&mut self.record)
    }

    /// Shows the outcome of reading the attached file.
    ///
    /// A failed read leaves the session usable with the error in the
    /// preview. The record's path follows the shown file.
    pub fn show_file(&mut self, outcome: Result<RemoteFile>) -> Result<()> {
        self.ensure_editable("show file")?;
        match outcome {
            Ok(file) => {
                self.preview = Preview::decode(&file.path, &file.payload);
                self.record.github_path = Some(file.path.clone());
                debug!(session = %self.id, path = %file.path, read_only = file.read_only, "File opened");
                self.opened = Some(file);
            }
            Err(e) => {
                debug!(session = %self.id, error = %e, "File preview failed");
                self.preview = Preview::from_error(&e);
                self.opened = None;
            }
        }
        Ok(())
    }

    /// Selects the sheet shown for a spreadsheet preview.
    pub fn select_sheet(&mut self, index: usize) -> Result<()> {
        match &mut self.preview {
            Preview::Spreadsheet {
                workbook,
                active_sheet,
            } => {
                workbook.sheet(index)?;
                *active_sheet = index;
                Ok(())
            }
            _ => Err(VaultError::NothingStaged("no spreadsheet is open".to_string())),
        }
    }

    /// Stages a file edit, replacing any earlier one.
    pub fn stage(&mut self, edit: StagedEdit) -> Result<()> {
        self.ensure_editable("stage file")?;
        if self.state == EditState::Drafting {
            self.transition(EditState::FileStaged)?;
        }
        debug!(session = %self.id, path = %edit.path, origin = ?edit.origin, "File staged");
        self.record.github_path = Some(edit.path.clone());
        self.staged = Some(edit);
        Ok(())
    }

    /// Stages a local upload and previews its content.
    pub fn stage_upload(&mut self, edit: StagedEdit) -> Result<()> {
        let preview = Preview::decode(&edit.path, &edit.payload);
        self.stage(edit)?;
        self.opened = None;
        self.preview = preview;
        Ok(())
    }

    /// Stages new text for the opened file.
    pub fn stage_text(&mut self, text: &str) -> Result<()> {
        let file = self.opened_file()?;
        let edit = StagedEdit::text_edit(file, text)?;
        self.stage(edit)?;
        if let Preview::Text { text: shown, .. } = &mut self.preview {
            *shown = text.to_string();
        }
        Ok(())
    }

    /// Stages an edited grid for the opened spreadsheet.
    pub fn stage_grid(&mut self, grid: SpreadsheetGrid) -> Result<()> {
        let file = self.opened_file()?;
        let edit = StagedEdit::spreadsheet_edit(file, &grid)?;
        self.stage(edit)?;
        if let Preview::Spreadsheet {
            workbook,
            active_sheet,
        } = &mut self.preview
        {
            if let Some(sheet) = workbook.sheets.get_mut(*active_sheet) {
                sheet.grid = grid;
            }
        }
        Ok(())
    }

    /// Edits one cell of the active sheet and stages the result.
    pub fn set_cell(&mut self, row: usize, col: usize, value: CellValue) -> Result<()> {
        let mut grid = self
            .preview
            .active_grid()
            .cloned()
            .ok_or_else(|| VaultError::NothingStaged("no spreadsheet is open".to_string()))?;
        grid.set(row, col, value);
        self.stage_grid(grid)
    }

    fn opened_file(&self) -> Result<&RemoteFile> {
        self.opened
            .as_ref()
            .ok_or_else(|| VaultError::NothingStaged("no repository file is open".to_string()))
    }

    /// Starts submission and returns the record to submit plus the
    /// staged edit to write first, if any.
    ///
    /// Without a staged edit, a record whose path changed loses its
    /// commit reference since nothing has been written at the new path.
    pub fn begin_submit(&mut self) -> Result<(LearningRecord, Option<StagedEdit>)> {
        self.record.validate()?;
        self.transition(EditState::Submitting)?;
        if self.staged.is_none() && self.record.github_path != self.original_path {
            self.record.commit_sha = None;
        }
        Ok((self.record.clone(), self.staged.clone()))
    }

    /// The staged write failed or conflicted; the edit stays staged.
    pub fn write_failed(&mut self, error: &VaultError) -> Result<()> {
        self.transition(EditState::FileStaged)?;
        self.notice = Some(error.to_string());
        Ok(())
    }

    /// The record submission failed before any file was written.
    pub fn submit_failed(&mut self, error: &VaultError) -> Result<()> {
        let back = if self.staged.is_some() {
            EditState::FileStaged
        } else {
            EditState::Drafting
        };
        self.transition(back)?;
        self.notice = Some(error.to_string());
        Ok(())
    }

    /// The file was written but the record submission failed.
    pub fn rolled_back(&mut self, revision: &Revision, error: &VaultError) -> Result<()> {
        self.transition(EditState::RolledBack {
            reason: error.to_string(),
        })?;
        self.staged = None;
        self.notice = Some(format!(
            "The file was saved (revision {}) but the record was not: {}",
            revision.short(),
            error
        ));
        Ok(())
    }

    /// Submission finished; the session is torn down.
    pub fn committed(&mut self, revision: Option<Revision>) -> Result<()> {
        self.transition(EditState::Committed {
            revision: revision.clone(),
        })?;
        self.staged = None;
        self.opened = None;
        self.preview = Preview::None;
        self.notice = Some(match revision {
            Some(revision) => format!("Saved (revision {})", revision.short()),
            None => "Saved".to_string(),
        });
        Ok(())
    }

    /// Discards every draft field and staged edit.
    ///
    /// Refused while a submission is in flight.
    pub fn cancel(&mut self) -> Result<()> {
        if self.state == EditState::Submitting {
            return Err(VaultError::InvalidStateTransition {
                from: format!("{:?}", self.state),
                to: format!("{:?}", EditState::Idle),
            });
        }
        debug!(session = %self.id, "Session cancelled");
        *self = Self {
            id: self.id,
            ..Self::new()
        };
        Ok(())
    }

    fn ensure_editable(&self, action: &str) -> Result<()> {
        match self.state {
            EditState::Drafting | EditState::FileStaged => Ok(()),
            _ => Err(VaultError::InvalidStateTransition {
                from: format!("{:?}", self.state),
                to: action.to_string(),
            }),
        }
    }

    fn transition(&mut self, new_state: EditState) -> Result<()> {
        if !self.is_valid_transition(&new_state) {
            return Err(VaultError::InvalidStateTransition {
                from: format!("{:?}", self.state),
                to: format!("{:?}", new_state),
            });
        }
        debug!(session = %self.id, from = ?self.state, to = ?new_state, "Session transition");
        self.state = new_state;
        Ok(())
    }

    fn is_valid_transition(&self, new_state: &EditState) -> bool {
        use EditState::*;

        match (&self.state, new_state) {
            // Opening
            (Idle, Drafting) => true,

            // Staging
            (Drafting, FileStaged) => true,

            // Submitting
            (Drafting, Submitting) | (FileStaged, Submitting) => true,

            // Outcomes
            (Submitting, Committed { .. })
            | (Submitting, RolledBack { .. })
            | (Submitting, FileStaged)
            | (Submitting, Drafting) => true,

            // All other transitions are invalid
            _ => false,
        }
    }
}

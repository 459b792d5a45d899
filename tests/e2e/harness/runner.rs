use super::assertions::{Assertion, PreviewMatch, SessionStateMatch};
use super::clock::MockClock;
use super::scenario::Setup;
use super::steps::ScenarioStep;
use super::workspace::TestWorkspace;
use anyhow::{anyhow, bail, Context, Result};
use learnvault_core::{
    Config, EditSession, EditState, FileView, LearningRecord, MemoryCatalog, MemoryStore,
    Preview, QueryReport, RepoPath, Revision, Vault, VaultError,
};
use std::sync::Arc;
use std::time::Duration;

/// Executes scenarios against a vault over in-memory backends
pub struct ScenarioRunner {
    workspace: TestWorkspace,
    store: Arc<MemoryStore>,
    catalog: Arc<MemoryCatalog>,
    vault: Vault,
    clock: MockClock,
    session: Option<EditSession>,
    /// Error from the last fallible step, until an assertion checks it.
    unchecked: Option<VaultError>,
    view: Option<FileView>,
    report: Option<QueryReport>,
    summary: Option<String>,
    revisions: Vec<Revision>,
    current_step: usize,
}

impl ScenarioRunner {
    /// Create a new runner with the initial backend state
    pub fn new(setup: &Setup) -> Result<Self> {
        let workspace = TestWorkspace::empty()?;
        let clock = MockClock::new();
        let store = Arc::new(MemoryStore::new());
        let catalog = Arc::new(MemoryCatalog::new());

        let mut revisions = Vec::new();
        for (path, content) in &setup.remote_files {
            let receipt = store
                .put(path, content)
                .with_context(|| format!("Failed to seed {}", path))?;
            revisions.push(receipt.revision);
        }
        for name in &setup.categories {
            catalog.add_category(name);
        }
        for seed in &setup.records {
            let mut record = LearningRecord {
                title: seed.title.clone(),
                explanatory_text: seed.text.clone(),
                ..LearningRecord::default()
            };
            if let Some(path) = &seed.path {
                record.github_path = Some(RepoPath::new(path.as_str())?);
                record.commit_sha = revisions.last().cloned();
            }
            let tags: Vec<&str> = seed.tags.iter().map(String::as_str).collect();
            catalog.seed(record, &tags, seed.category.as_deref());
        }

        let vault = Vault::new(store.clone(), catalog.clone(), &Config::default())
            .with_time_provider(clock.as_provider());

        Ok(Self {
            workspace,
            store,
            catalog,
            vault,
            clock,
            session: None,
            unchecked: None,
            view: None,
            report: None,
            summary: None,
            revisions,
            current_step: 0,
        })
    }

    /// Get current step number
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    /// Execute all steps in sequence
    pub async fn execute(&mut self, steps: &[ScenarioStep]) -> Result<()> {
        for (i, step) in steps.iter().enumerate() {
            self.current_step = i;
            if !matches!(step, ScenarioStep::Assert { .. }) {
                self.ensure_checked()?;
            }
            self.execute_step(step)
                .await
                .with_context(|| format!("Step {}: {:?}", i, step))?;
        }
        self.current_step = steps.len();
        self.ensure_checked()
    }

    fn ensure_checked(&mut self) -> Result<()> {
        match self.unchecked.take() {
            Some(e) => Err(anyhow!("Unchecked error from a previous step: {}", e)),
            None => Ok(()),
        }
    }

    fn record<T>(&mut self, outcome: learnvault_core::Result<T>) -> Option<T> {
        match outcome {
            Ok(value) => Some(value),
            Err(e) => {
                self.unchecked = Some(e);
                None
            }
        }
    }

    fn session_mut(&mut self) -> Result<&mut EditSession> {
        self.session
            .as_mut()
            .ok_or_else(|| anyhow!("No open session"))
    }

    fn session(&self) -> Result<&EditSession> {
        self.session.as_ref().ok_or_else(|| anyhow!("No open session"))
    }

    fn record_id(&self, title: &str) -> Result<i64> {
        self.catalog
            .find_by_title(title)
            .and_then(|record| record.id)
            .ok_or_else(|| anyhow!("No record titled {:?}", title))
    }

    /// Execute a single step
    async fn execute_step(&mut self, step: &ScenarioStep) -> Result<()> {
        match step {
            ScenarioStep::Bootstrap => {
                let outcome = self.vault.bootstrap().await;
                self.record(outcome);
            }
            ScenarioStep::Reload => {
                let outcome = self.vault.reload().await;
                self.record(outcome);
            }
            ScenarioStep::RefreshListing => {
                let outcome = self.vault.refresh_listing().await;
                self.record(outcome);
            }

            ScenarioStep::OpenNew { title } => {
                let mut session = self.vault.open_new()?;
                session.fields_mut()?.title = title.clone();
                self.session = Some(session);
            }
            ScenarioStep::OpenRecord { title } => {
                let id = self.record_id(title)?;
                let outcome = self.vault.open_existing(id).await;
                if let Some(session) = self.record(outcome) {
                    self.session = Some(session);
                }
            }
            ScenarioStep::SetTags { tags } => {
                self.session_mut()?.fields_mut()?.tags = tags.iter().cloned().collect();
            }
            ScenarioStep::SetCategory { name } => {
                let id = self
                    .vault
                    .snapshot()
                    .category_id(name)
                    .ok_or_else(|| anyhow!("No category named {:?}", name))?;
                let record = self.session_mut()?.fields_mut()?;
                record.category_id = Some(id);
                record.category_name = Some(name.clone());
            }
            ScenarioStep::OpenRemoteFile { path } => {
                let session = self
                    .session
                    .as_mut()
                    .ok_or_else(|| anyhow!("No open session"))?;
                let outcome = self.vault.open_remote_file(session, path).await;
                self.record(outcome);
            }
            ScenarioStep::ViewFile {
                path,
                revision_of_write,
            } => {
                let revision = match revision_of_write {
                    Some(index) => Some(
                        self.revisions
                            .get(*index)
                            .ok_or_else(|| anyhow!("No write #{} recorded", index))?
                            .clone(),
                    ),
                    None => None,
                };
                let outcome = self
                    .vault
                    .view_file(path, revision.as_ref().map(Revision::as_str))
                    .await;
                self.view = self.record(outcome);
            }
            ScenarioStep::UploadLocal { name, content } => {
                let local = self.workspace.write_file(name, content)?;
                let session = self
                    .session
                    .as_mut()
                    .ok_or_else(|| anyhow!("No open session"))?;
                let outcome = self.vault.stage_local_file(session, &local);
                self.record(outcome);
            }
            ScenarioStep::StageText { text } => {
                let outcome = self.session_mut()?.stage_text(text);
                self.record(outcome);
            }
            ScenarioStep::SetCell { row, col, value } => {
                let outcome = self.session_mut()?.set_cell(*row, *col, value.clone());
                self.record(outcome);
            }
            ScenarioStep::Submit => {
                let session = self
                    .session
                    .as_mut()
                    .ok_or_else(|| anyhow!("No open session"))?;
                let outcome = self.vault.submit(session).await;
                if let Some(outcome) = self.record(outcome) {
                    self.revisions.extend(outcome.revision);
                }
            }
            ScenarioStep::Cancel => {
                let outcome = self.session_mut()?.cancel();
                self.record(outcome);
            }

            ScenarioStep::DeleteRecord { title } => {
                let id = self.record_id(title)?;
                let outcome = self.vault.delete_record(id).await;
                self.record(outcome);
            }
            ScenarioStep::CreateCategory { name } => {
                let outcome = self.vault.create_category(name).await;
                self.record(outcome);
            }

            ScenarioStep::ApplyFilters { filters } => {
                self.summary = Some(self.vault.apply_filters(filters.clone()));
            }
            ScenarioStep::Query { text } => {
                self.report = Some(self.vault.query(text));
            }

            ScenarioStep::ExternalWrite { path, content } => {
                let receipt = self.store.put(path, content)?;
                self.revisions.push(receipt.revision);
            }

            ScenarioStep::FailCatalog { endpoint } => self.catalog.fail(*endpoint),
            ScenarioStep::RecoverCatalog { endpoint } => self.catalog.recover(*endpoint),
            ScenarioStep::FailNextWrite { status } => self.store.fail_next_write(*status),
            ScenarioStep::FailNextList { status } => self.store.fail_next_list(*status),

            ScenarioStep::Wait { duration } => self.handle_wait(*duration).await,

            ScenarioStep::Assert { assertion } => self.handle_assertion(assertion)?,
        }
        Ok(())
    }

    async fn handle_wait(&mut self, duration: Duration) {
        self.clock.advance(duration);
        // The runtime clock is paused; sleeping auto-advances it and runs
        // any deferred refresh that falls due.
        tokio::time::sleep(duration).await;
    }

    // ===== Assertion handlers =====

    fn handle_assertion(&mut self, assertion: &Assertion) -> Result<()> {
        match assertion {
            Assertion::SessionState(expected) => self.assert_session_state(expected),
            Assertion::NoSession => match &self.session {
                Some(session) if session.state() != &EditState::Idle => {
                    bail!("Expected no session, found {:?}", session.state())
                }
                _ => Ok(()),
            },
            Assertion::SessionStaged { path } => {
                let staged = self
                    .session()?
                    .staged()
                    .ok_or_else(|| anyhow!("Nothing staged"))?;
                if staged.path.as_str() != path {
                    bail!("Expected {:?} staged, found {:?}", path, staged.path.as_str());
                }
                Ok(())
            }
            Assertion::NothingStaged => match self.session()?.staged() {
                Some(staged) => bail!("Expected nothing staged, found {}", staged.path),
                None => Ok(()),
            },
            Assertion::NoticeContains(text) => {
                let notice = self.session()?.notice().unwrap_or_default();
                if !notice.contains(text.as_str()) {
                    bail!("Notice {:?} does not contain {:?}", notice, text);
                }
                Ok(())
            }
            Assertion::Preview(expected) => {
                let preview = match (&self.session, &self.view) {
                    (Some(session), _) => session.preview(),
                    (None, Some(view)) => &view.preview,
                    (None, None) => bail!("Nothing opened"),
                };
                assert_preview(preview, expected)
            }
            Assertion::ViewedReadOnly(expected) => {
                let view = self.view.as_ref().ok_or_else(|| anyhow!("Nothing viewed"))?;
                if view.file.read_only != *expected {
                    bail!("Expected read_only = {}, found {}", expected, view.file.read_only);
                }
                Ok(())
            }

            Assertion::Succeeded => match self.unchecked.take() {
                Some(e) => bail!("Expected success, got: {}", e),
                None => Ok(()),
            },
            Assertion::FailedWith(kind) => {
                let error = self
                    .unchecked
                    .take()
                    .ok_or_else(|| anyhow!("Expected a {:?} failure, step succeeded", kind))?;
                if error.kind() != *kind {
                    bail!("Expected {:?}, got {:?}: {}", kind, error.kind(), error);
                }
                Ok(())
            }
            Assertion::FailedWithMessage(text) => {
                let error = self
                    .unchecked
                    .take()
                    .ok_or_else(|| anyhow!("Expected a failure, step succeeded"))?;
                if !error.to_string().contains(text.as_str()) {
                    bail!("Error {:?} does not contain {:?}", error.to_string(), text);
                }
                Ok(())
            }

            Assertion::RemoteFileEquals { path, content } => match self.store.get(path) {
                Some(actual) if actual == *content => Ok(()),
                Some(actual) => bail!(
                    "{} holds {:?}, expected {:?}",
                    path,
                    String::from_utf8_lossy(&actual),
                    String::from_utf8_lossy(content)
                ),
                None => bail!("{} does not exist", path),
            },
            Assertion::RemoteFileMissing { path } => match self.store.get(path) {
                Some(_) => bail!("{} exists", path),
                None => Ok(()),
            },
            Assertion::WriteCount(expected) => {
                let actual = self.store.write_count();
                if actual != *expected {
                    bail!("Expected {} writes, found {}", expected, actual);
                }
                Ok(())
            }

            Assertion::RecordCount(expected) => {
                let actual = self.catalog.record_count();
                if actual != *expected {
                    bail!("Expected {} records, found {}", expected, actual);
                }
                Ok(())
            }
            Assertion::RecordLinked { title, path } => {
                let record = self.catalog_record(title)?;
                let linked = record.github_path.as_ref().map(RepoPath::as_str);
                if linked != Some(path.as_str()) {
                    bail!("{:?} is linked to {:?}, expected {:?}", title, linked, path);
                }
                if record.commit_sha.is_none() {
                    bail!("{:?} has no commit reference", title);
                }
                Ok(())
            }
            Assertion::RecordUnlinked { title } => {
                let record = self.catalog_record(title)?;
                if let Some(sha) = &record.commit_sha {
                    bail!("{:?} still references commit {}", title, sha);
                }
                Ok(())
            }
            Assertion::RecordTags { title, tags } => {
                let record = self.catalog_record(title)?;
                let actual: Vec<&String> = record.tags.iter().collect();
                let mut expected: Vec<&String> = tags.iter().collect();
                expected.sort();
                if actual != expected {
                    bail!("{:?} has tags {:?}, expected {:?}", title, actual, expected);
                }
                Ok(())
            }
            Assertion::RecordCreatedAt { title, timestamp } => {
                let record = self.catalog_record(title)?;
                if record.created_at.as_deref() != Some(timestamp.as_str()) {
                    bail!(
                        "{:?} was created at {:?}, expected {:?}",
                        title,
                        record.created_at,
                        timestamp
                    );
                }
                Ok(())
            }

            Assertion::QueryTitles(expected) => {
                let report = self.report()?;
                let actual: Vec<&str> = report.records.iter().map(|r| r.title.as_str()).collect();
                if actual != *expected {
                    bail!("Query returned {:?}, expected {:?}", actual, expected);
                }
                Ok(())
            }
            Assertion::QueryFiles(expected) => {
                let report = self.report()?;
                let actual: Vec<&str> = report.files.iter().map(RepoPath::as_str).collect();
                if actual != *expected {
                    bail!("Query returned files {:?}, expected {:?}", actual, expected);
                }
                Ok(())
            }
            Assertion::RecordMessage(expected) => {
                let actual = &self.report()?.record_message;
                if actual != expected {
                    bail!("Record message {:?}, expected {:?}", actual, expected);
                }
                Ok(())
            }
            Assertion::FileMessage(expected) => {
                let actual = &self.report()?.file_message;
                if actual != expected {
                    bail!("File message {:?}, expected {:?}", actual, expected);
                }
                Ok(())
            }
            Assertion::FilterSummary(expected) => match &self.summary {
                Some(actual) if actual == expected => Ok(()),
                other => bail!("Filter summary {:?}, expected {:?}", other, expected),
            },

            Assertion::ListingContains(path) => {
                if !self.listed(path) {
                    bail!("{} is not in the listing", path);
                }
                Ok(())
            }
            Assertion::ListingLacks(path) => {
                if self.listed(path) {
                    bail!("{} is in the listing", path);
                }
                Ok(())
            }

            Assertion::Custom(check) => check(&self.vault),
        }
    }

    fn assert_session_state(&self, expected: &SessionStateMatch) -> Result<()> {
        let state = self.session()?.state();
        let matches = matches!(
            (expected, state),
            (SessionStateMatch::Idle, EditState::Idle)
                | (SessionStateMatch::Drafting, EditState::Drafting)
                | (SessionStateMatch::FileStaged, EditState::FileStaged)
                | (SessionStateMatch::Committed, EditState::Committed { .. })
                | (SessionStateMatch::RolledBack, EditState::RolledBack { .. })
        );
        if !matches {
            bail!("Expected session state {:?}, found {:?}", expected, state);
        }
        Ok(())
    }

    fn catalog_record(&self, title: &str) -> Result<LearningRecord> {
        self.catalog
            .find_by_title(title)
            .ok_or_else(|| anyhow!("No record titled {:?}", title))
    }

    fn report(&self) -> Result<&QueryReport> {
        self.report.as_ref().ok_or_else(|| anyhow!("No query was run"))
    }

    fn listed(&self, path: &str) -> bool {
        self.vault
            .listing()
            .snapshot()
            .iter()
            .any(|p| p.as_str() == path)
    }
}

fn assert_preview(preview: &Preview, expected: &PreviewMatch) -> Result<()> {
    let matches = match (expected, preview) {
        (PreviewMatch::None, Preview::None) => true,
        (PreviewMatch::TextContains(needle), Preview::Text { text, .. }) => {
            text.contains(needle.as_str())
        }
        (PreviewMatch::Spreadsheet { sheets }, Preview::Spreadsheet { workbook, .. }) => {
            workbook.sheets.len() == *sheets
        }
        (PreviewMatch::Unsupported(category), Preview::Unsupported { category: actual, .. }) => {
            category == actual
        }
        (PreviewMatch::Missing, Preview::Missing) => true,
        (PreviewMatch::Error(kind), Preview::Error { kind: actual, .. }) => kind == actual,
        _ => false,
    };
    if !matches {
        bail!("Expected preview {:?}, found {:?}", expected, preview);
    }
    Ok(())
}

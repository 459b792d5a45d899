//! Top-level handle tying the store, the catalog, search and edit sessions together.

use crate::catalog::{self, Catalog, CatalogSnapshot, HttpCatalog};
use crate::config::Config;
use crate::error::{Result, VaultError};
use crate::listing::ListingCache;
use crate::search::{SearchEngine, SearchFilters};
use crate::session::{EditSession, Preview};
use crate::staging::StagedEdit;
use crate::store::{DocumentStore, GitHubStore};
use crate::types::{LearningRecord, RemoteFile, RepoPath, Revision};
use crate::TimeProvider;
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Owned results of one query, both sections plus their rendered counts.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryReport {
    /// Trimmed query text.
    pub query: String,
    /// Matching records, sorted.
    pub records: Vec<LearningRecord>,
    /// Matching repository paths.
    pub files: Vec<RepoPath>,
    /// "N results" for the record section.
    pub record_message: String,
    /// "N results" for the file section.
    pub file_message: String,
}

/// A file opened for viewing, outside any edit session.
#[derive(Debug, Clone)]
pub struct FileView {
    /// The file as read.
    pub file: RemoteFile,
    /// Its decoded preview.
    pub preview: Preview,
}

/// Outcome of a successful submission.
#[derive(Debug)]
pub struct SubmitOutcome {
    /// Revision of the written file, if one was written.
    pub revision: Option<Revision>,
    /// Deferred listing refresh, when a file was written.
    pub refresh: Option<JoinHandle<()>>,
}

/// Releases a record's in-flight claim on drop.
struct InFlight<'a> {
    ids: &'a Mutex<HashSet<i64>>,
    id: i64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.ids
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.id);
    }
}

/// Learning vault: catalog, repository and search behind one handle.
pub struct Vault {
    store: Arc<dyn DocumentStore>,
    catalog: Arc<dyn Catalog>,
    search: SearchEngine,
    listing: Arc<ListingCache>,
    snapshot: RwLock<Arc<CatalogSnapshot>>,
    filters: RwLock<SearchFilters>,
    in_flight: Mutex<HashSet<i64>>,
    refresh_delay: Duration,
    time_provider: Option<Arc<dyn TimeProvider>>,
}

impl Vault {
    /// Creates a vault over the given collaborators.
    pub fn new(store: Arc<dyn DocumentStore>, catalog: Arc<dyn Catalog>, config: &Config) -> Self {
        Self {
            store,
            catalog,
            search: SearchEngine::new(&config.search),
            listing: Arc::new(ListingCache::new()),
            snapshot: RwLock::new(Arc::new(CatalogSnapshot::default())),
            filters: RwLock::new(SearchFilters::default()),
            in_flight: Mutex::new(HashSet::new()),
            refresh_delay: config.listing.refresh_delay(),
            time_provider: None,
        }
    }

    /// Creates a vault talking to the configured repository and catalog.
    pub fn connect(config: &Config) -> Result<Self> {
        config.validate()?;
        let http = config.http.build_client()?;
        let store = GitHubStore::new(&config.repository, http.clone());
        let catalog = HttpCatalog::new(&config.catalog, http);
        info!(
            owner = %config.repository.owner,
            repository = %config.repository.name,
            branch = %config.repository.branch,
            "Vault connected"
        );
        Ok(Self::new(Arc::new(store), Arc::new(catalog), config))
    }

    /// Sets a time provider for creation timestamps (for testing).
    pub fn with_time_provider(mut self, provider: impl TimeProvider + 'static) -> Self {
        self.time_provider = Some(Arc::new(provider));
        self
    }

    fn now(&self) -> i64 {
        match &self.time_provider {
            Some(provider) => provider.now(),
            None => Utc::now().timestamp(),
        }
    }

    fn timestamp(&self) -> Option<String> {
        DateTime::<Utc>::from_timestamp(self.now(), 0)
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    /// Loads the catalog and the repository listing concurrently.
    ///
    /// A catalog failure leaves the vault empty and is returned. A
    /// listing failure keeps the previous listing and is only logged.
    pub async fn bootstrap(&self) -> Result<usize> {
        let (records, listing) = tokio::join!(self.reload(), self.refresh_listing());
        if let Err(e) = listing {
            warn!(error = %e, "Repository listing unavailable");
        }
        records
    }

    /// Reloads the catalog snapshot. Returns the number of records.
    ///
    /// On failure the empty state is adopted; a half-joined snapshot is
    /// never installed.
    pub async fn reload(&self) -> Result<usize> {
        match catalog::bootstrap(self.catalog.as_ref()).await {
            Ok(snapshot) => {
                let count = snapshot.records.len();
                self.install(snapshot);
                Ok(count)
            }
            Err(e) => {
                error!(error = %e, "Catalog unavailable; showing an empty catalog");
                self.install(CatalogSnapshot::default());
                Err(e)
            }
        }
    }

    fn install(&self, snapshot: CatalogSnapshot) {
        *self.snapshot.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(snapshot);
    }

    /// Current catalog snapshot.
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        Arc::clone(&self.snapshot.read().unwrap_or_else(|e| e.into_inner()))
    }

    /// Current search filters.
    pub fn filters(&self) -> SearchFilters {
        self.filters.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Replaces the active filters and returns their summary.
    pub fn apply_filters(&self, filters: SearchFilters) -> String {
        let summary = filters.summary();
        debug!(%summary, "Filters replaced");
        *self.filters.write().unwrap_or_else(|e| e.into_inner()) = filters;
        summary
    }

    /// Runs a freeform query against the records and the listing.
    pub fn query(&self, freeform: &str) -> QueryReport {
        let snapshot = self.snapshot();
        let filters = self.filters();
        let results = self
            .search
            .query(&snapshot.records, &self.listing, &filters, freeform);
        QueryReport {
            record_message: results.record_message(),
            file_message: results.file_message(),
            query: results.query,
            records: results.records.into_iter().cloned().collect(),
            files: results.files,
        }
    }

    /// Listing cache shared with deferred refreshes.
    pub fn listing(&self) -> &Arc<ListingCache> {
        &self.listing
    }

    /// Re-lists the repository. Returns the number of paths.
    pub async fn refresh_listing(&self) -> Result<usize> {
        self.listing.refresh(self.store.as_ref()).await
    }

    /// Refreshes the listing after the configured propagation delay.
    pub fn schedule_listing_refresh(&self) -> JoinHandle<()> {
        self.listing
            .schedule_refresh(Arc::clone(&self.store), self.refresh_delay)
    }

    /// Reads a file for viewing. A pinned read is read-only.
    pub async fn view_file(&self, path: &str, revision: Option<&str>) -> Result<FileView> {
        let path = RepoPath::new(path)?;
        let revision = revision.map(Revision::new);
        let file = self.store.read(&path, revision.as_ref()).await?;
        let preview = Preview::decode(&file.path, &file.payload);
        Ok(FileView { file, preview })
    }

    /// Opens a session for a new record.
    pub fn open_new(&self) -> Result<EditSession> {
        let mut session = EditSession::new();
        session.open_draft()?;
        Ok(session)
    }

    /// Opens a session for an existing record and previews its file.
    ///
    /// A failed read leaves the session open with the error in the preview.
    pub async fn open_existing(&self, id: i64) -> Result<EditSession> {
        if self.is_in_flight(id) {
            return Err(VaultError::SessionBusy(id));
        }
        let record = self
            .snapshot()
            .record(id)
            .cloned()
            .ok_or(VaultError::RecordNotFound(id))?;
        let path = record.github_path.clone();

        let mut session = EditSession::new();
        session.open_record(record)?;
        if let Some(path) = path {
            let outcome = self.store.read(&path, None).await;
            session.show_file(outcome)?;
        }
        Ok(session)
    }

    /// Opens a repository file in the session for preview and editing.
    pub async fn open_remote_file(&self, session: &mut EditSession, path: &str) -> Result<()> {
        let path = RepoPath::new(path)?;
        let outcome = self.store.read(&path, None).await;
        session.show_file(outcome)
    }

    /// Stages a local file as a new repository file.
    pub fn stage_local_file(&self, session: &mut EditSession, path: &Path) -> Result<()> {
        let edit = StagedEdit::from_local_file(path)?;
        session.stage_upload(edit)
    }

    fn is_in_flight(&self, id: i64) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&id)
    }

    fn claim(&self, id: i64) -> Result<InFlight<'_>> {
        let mut ids = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !ids.insert(id) {
            return Err(VaultError::SessionBusy(id));
        }
        Ok(InFlight {
            ids: &self.in_flight,
            id,
        })
    }

    /// Submits the session: the staged file first, then the record.
    ///
    /// A failed or conflicting write leaves the edit staged and nothing
    /// is sent to the catalog. A catalog failure after a successful write
    /// is reported as [`VaultError::PartialFailure`]; the write is kept.
    pub async fn submit(&self, session: &mut EditSession) -> Result<SubmitOutcome> {
        let id = session.record_id();
        let _claim = id.map(|id| self.claim(id)).transpose()?;
        let (mut record, staged) = session.begin_submit()?;

        let mut revision = None;
        if let Some(edit) = &staged {
            match self
                .store
                .write(&edit.path, &edit.payload, edit.precondition.as_ref())
                .await
            {
                Ok(receipt) => {
                    record.github_path = Some(edit.path.clone());
                    record.commit_sha = Some(receipt.revision.clone());
                    revision = Some(receipt.revision);
                }
                Err(e) => {
                    warn!(path = %edit.path, error = %e, "Staged write failed; record not submitted");
                    session.write_failed(&e)?;
                    return Err(e);
                }
            }
        }

        let outcome = match id {
            Some(id) => self.catalog.update_record(id, &record).await,
            None => {
                if record.created_at.is_none() {
                    record.created_at = self.timestamp();
                }
                self.catalog.create_record(&record).await
            }
        };

        if let Err(e) = outcome {
            return Err(match (&revision, &staged) {
                (Some(revision), Some(edit)) => {
                    error!(
                        path = %edit.path,
                        revision = %revision.short(),
                        error = %e,
                        "File written but record submission failed"
                    );
                    session.rolled_back(revision, &e)?;
                    VaultError::PartialFailure {
                        path: edit.path.to_string(),
                        revision: revision.to_string(),
                        message: e.to_string(),
                    }
                }
                _ => {
                    warn!(error = %e, "Record submission failed");
                    session.submit_failed(&e)?;
                    e
                }
            });
        }

        session.committed(revision.clone())?;
        info!(
            record = ?id,
            title = %record.title,
            revision = revision.as_ref().map(|r| r.short()).unwrap_or("-"),
            "Record saved"
        );

        if let Err(e) = self.reload().await {
            warn!(error = %e, "Catalog reload after save failed");
        }
        let refresh = staged.map(|_| self.schedule_listing_refresh());
        Ok(SubmitOutcome { revision, refresh })
    }

    /// Deletes a record and reloads the catalog.
    pub async fn delete_record(&self, id: i64) -> Result<()> {
        let _claim = self.claim(id)?;
        self.catalog.delete_record(id).await?;
        info!(record = id, "Record deleted");
        if let Err(e) = self.reload().await {
            warn!(error = %e, "Catalog reload after delete failed");
        }
        Ok(())
    }

    /// Creates a category and reloads the catalog.
    pub async fn create_category(&self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(VaultError::InvalidRecord(
                "category name must not be empty".to_string(),
            ));
        }
        if self.snapshot().category_id(name).is_some() {
            return Err(VaultError::InvalidRecord(format!(
                "category {:?} already exists",
                name
            )));
        }
        self.catalog.create_category(name).await?;
        info!(category = name, "Category created");
        if let Err(e) = self.reload().await {
            warn!(error = %e, "Catalog reload after category insert failed");
        }
        Ok(())
    }
}

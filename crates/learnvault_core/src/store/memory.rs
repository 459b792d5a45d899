//! In-process document store.
//!
//! Keeps every revision so pinned reads behave like the hosted store.
//! Used by the scenario tests and the CLI's `--offline` mode.

use super::{DocumentStore, WriteReceipt};
use crate::error::{Result, VaultError};
use crate::types::{RemoteFile, RepoPath, Revision, VersionToken};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::debug;

type Snapshot = BTreeMap<RepoPath, StoredFile>;

#[derive(Debug, Clone)]
struct StoredFile {
    version: VersionToken,
    payload: Arc<Vec<u8>>,
}

#[derive(Debug, Default)]
struct Injected {
    read: Option<u16>,
    write: Option<u16>,
    list: Option<u16>,
}

#[derive(Debug, Default)]
struct Repository {
    head: Snapshot,
    revisions: HashMap<Revision, Snapshot>,
    sequence: u64,
    writes: u64,
    failures: Injected,
    latency: Option<Duration>,
}

impl Repository {
    fn commit(&mut self, path: &RepoPath, payload: &[u8]) -> WriteReceipt {
        self.sequence += 1;

        let mut hasher = blake3::Hasher::new();
        hasher.update(path.as_str().as_bytes());
        hasher.update(&[0]);
        hasher.update(payload);
        hasher.update(&self.sequence.to_le_bytes());
        let version = VersionToken::new(hasher.finalize().to_hex().to_string());

        let mut hasher = blake3::Hasher::new();
        hasher.update(b"revision");
        hasher.update(&self.sequence.to_le_bytes());
        hasher.update(version.as_str().as_bytes());
        let revision = Revision::new(hex::encode(&hasher.finalize().as_bytes()[..20]));

        self.head.insert(
            path.clone(),
            StoredFile {
                version: version.clone(),
                payload: Arc::new(payload.to_vec()),
            },
        );
        self.revisions.insert(revision.clone(), self.head.clone());
        self.writes += 1;

        WriteReceipt { version, revision }
    }
}

/// Thread-safe in-memory repository with failure injection.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Repository>,
}

fn injected(operation: &str, status: u16) -> VaultError {
    VaultError::Transport {
        operation: operation.to_string(),
        status: Some(status),
        message: format!("injected HTTP {}", status),
    }
}

impl MemoryStore {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a file, as if committed by someone else. Builder form.
    pub fn with_file(self, path: &str, payload: impl AsRef<[u8]>) -> Result<Self> {
        self.put(path, payload)?;
        Ok(self)
    }

    /// Commits a file without any precondition check, simulating an
    /// out-of-band edit by another tool or user.
    pub fn put(&self, path: &str, payload: impl AsRef<[u8]>) -> Result<WriteReceipt> {
        let path = RepoPath::new(path)?;
        Ok(self.repo_mut().commit(&path, payload.as_ref()))
    }

    /// Returns the current payload of a path.
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        let repo = self.repo();
        repo.head
            .iter()
            .find(|(p, _)| p.as_str() == path)
            .map(|(_, file)| file.payload.as_ref().clone())
    }

    /// Returns the current version token of a path.
    pub fn version_of(&self, path: &str) -> Option<VersionToken> {
        self.repo()
            .head
            .iter()
            .find(|(p, _)| p.as_str() == path)
            .map(|(_, file)| file.version.clone())
    }

    /// Number of successful writes so far, seeded files included.
    pub fn write_count(&self) -> u64 {
        self.repo().writes
    }

    /// Makes the next read fail with the given HTTP status.
    pub fn fail_next_read(&self, status: u16) {
        self.repo_mut().failures.read = Some(status);
    }

    /// Makes the next write fail with the given HTTP status.
    pub fn fail_next_write(&self, status: u16) {
        self.repo_mut().failures.write = Some(status);
    }

    /// Makes the next list fail with the given HTTP status.
    pub fn fail_next_list(&self, status: u16) {
        self.repo_mut().failures.list = Some(status);
    }

    /// Delays every operation, to hold requests in flight.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.repo_mut().latency = latency;
    }

    fn repo(&self) -> RwLockReadGuard<'_, Repository> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn repo_mut(&self) -> RwLockWriteGuard<'_, Repository> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    async fn simulate_latency(&self) {
        let latency = self.repo().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn read(&self, path: &RepoPath, revision: Option<&Revision>) -> Result<RemoteFile> {
        self.simulate_latency().await;
        let mut repo = self.repo_mut();
        if let Some(status) = repo.failures.read.take() {
            return Err(injected("read", status));
        }

        let snapshot = match revision {
            Some(revision) => repo.revisions.get(revision).ok_or_else(|| VaultError::NotFound {
                path: format!("{}@{}", path, revision.short()),
            })?,
            None => &repo.head,
        };
        let file = snapshot.get(path).ok_or_else(|| VaultError::NotFound {
            path: path.to_string(),
        })?;

        debug!(path = %path, version = %file.version.short(), "Read from memory store");
        Ok(RemoteFile {
            path: path.clone(),
            version: file.version.clone(),
            revision: revision.cloned(),
            payload: file.payload.as_ref().clone(),
            read_only: revision.is_some(),
        })
    }

    async fn write(
        &self,
        path: &RepoPath,
        payload: &[u8],
        precondition: Option<&VersionToken>,
    ) -> Result<WriteReceipt> {
        self.simulate_latency().await;
        let mut repo = self.repo_mut();
        if let Some(status) = repo.failures.write.take() {
            return Err(injected("write", status));
        }

        let precondition = precondition.filter(|token| !token.as_str().is_empty());
        let current = repo.head.get(path).map(|file| &file.version);
        if current != precondition {
            return Err(VaultError::Conflict {
                path: path.to_string(),
                expected: precondition.map(|token| token.to_string()),
            });
        }

        let receipt = repo.commit(path, payload);
        debug!(path = %path, version = %receipt.version.short(), "Wrote to memory store");
        Ok(receipt)
    }

    async fn list(&self) -> Result<Vec<RepoPath>> {
        self.simulate_latency().await;
        let mut repo = self.repo_mut();
        if let Some(status) = repo.failures.list.take() {
            return Err(injected("list", status));
        }
        Ok(repo.head.keys().cloned().collect())
    }
}

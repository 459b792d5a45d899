//! Versioned document store: the repository I/O boundary.
//!
//! Every read returns the file's current version token; every write is
//! conditioned on one. A stale or missing precondition for an existing
//! path is always a [`VaultError::Conflict`], never an overwrite.

mod github;
mod memory;

pub use github::GitHubStore;
pub use memory::MemoryStore;

use crate::error::Result;
use crate::types::{RemoteFile, RepoPath, Revision, VersionToken};
use async_trait::async_trait;

#[cfg(doc)]
use crate::error::VaultError;

/// Outcome of a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReceipt {
    /// New version token of the written path.
    pub version: VersionToken,
    /// Revision created by the write.
    pub revision: Revision,
}

/// Remote repository holding versioned files.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads a file at the current head, or pinned to `revision`.
    ///
    /// Pinned reads are returned with `read_only` set.
    async fn read(&self, path: &RepoPath, revision: Option<&Revision>) -> Result<RemoteFile>;

    /// Writes a file conditioned on `precondition`.
    ///
    /// `None` creates a new path and conflicts if the path exists.
    async fn write(
        &self,
        path: &RepoPath,
        payload: &[u8],
        precondition: Option<&VersionToken>,
    ) -> Result<WriteReceipt>;

    /// Lists every file path at the head of the branch, in tree order.
    async fn list(&self) -> Result<Vec<RepoPath>>;
}

/// Commit message used for file writes.
pub fn commit_message(path: &RepoPath) -> String {
    format!("Update {}", path)
}

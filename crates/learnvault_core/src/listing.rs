//! Cached listing of every file path in the repository.
//!
//! The held list is an immutable snapshot behind an `Arc`; a refresh
//! builds a new list and swaps it in, so readers always see either the
//! old or the new listing in full.

use crate::error::Result;
use crate::store::DocumentStore;
use crate::types::RepoPath;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct Held {
    paths: Arc<Vec<RepoPath>>,
    ticket: u64,
}

/// Snapshot cache of repository paths.
#[derive(Debug, Default)]
pub struct ListingCache {
    held: RwLock<Held>,
    next_ticket: AtomicU64,
}

impl ListingCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Arc<Vec<RepoPath>> {
        self.held
            .read()
            .map(|held| Arc::clone(&held.paths))
            .unwrap_or_else(|e| Arc::clone(&e.into_inner().paths))
    }

    /// Number of held paths.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Returns true if nothing has been listed yet (or the repository is empty).
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Replaces the held listing.
    pub fn replace(&self, paths: Vec<RepoPath>) {
        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        self.install(ticket, paths);
    }

    /// Fetches the listing from the store and swaps it in.
    ///
    /// When refreshes overlap, a slower older listing never replaces a
    /// newer one. On failure the previous snapshot is kept.
    pub async fn refresh(&self, store: &dyn DocumentStore) -> Result<usize> {
        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        let paths = store.list().await?;
        let count = paths.len();
        if self.install(ticket, paths) {
            info!(paths = count, "Repository listing refreshed");
        } else {
            debug!(ticket, "Discarded listing superseded by a newer refresh");
        }
        Ok(count)
    }

    fn install(&self, ticket: u64, paths: Vec<RepoPath>) -> bool {
        let mut held = self.held.write().unwrap_or_else(|e| e.into_inner());
        if ticket < held.ticket {
            return false;
        }
        held.paths = Arc::new(paths);
        held.ticket = ticket;
        true
    }

    /// Case-insensitive containment filter over the held paths.
    ///
    /// An empty (or all-whitespace) query matches nothing.
    pub fn find(&self, query: &str) -> Vec<RepoPath> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.snapshot()
            .iter()
            .filter(|path| path.as_str().to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    /// Refreshes after `delay` on a background task.
    ///
    /// The hosted tree endpoint lags behind writes, so a listing taken
    /// right after a commit may not show the new path yet.
    pub fn schedule_refresh(
        self: &Arc<Self>,
        store: Arc<dyn DocumentStore>,
        delay: Duration,
    ) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        debug!(delay_ms = delay.as_millis() as u64, "Scheduled listing refresh");
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = cache.refresh(store.as_ref()).await {
                warn!(error = %e, "Deferred listing refresh failed");
            }
        })
    }
}

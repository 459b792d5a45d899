//! LearnVault Core Library
//!
//! A catalog of learning records linked to versioned files in a hosted
//! repository, providing:
//! - Content classification and transcoding (text, spreadsheets)
//! - Optimistically concurrent repository reads and writes
//! - Tag/category filtering with locale-aware sorting
//! - Edit sessions that write the file before submitting the record
//!
//! # Quick Start
//!
//! ```
//! use learnvault_core::{classify, ContentCategory};
//!
//! assert_eq!(classify("Dockerfile"), ContentCategory::Text { language: "docker" });
//! assert_eq!(classify("report.XLSX"), ContentCategory::Spreadsheet);
//! assert_eq!(classify("photo.PNG"), ContentCategory::Image);
//! ```
//!
//! # Features
//!
//! ## Optimistic Concurrency
//!
//! Every write is conditioned on the version token returned by the last
//! read. A stale token is a conflict, never an overwrite:
//!
//! ```
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! use learnvault_core::{DocumentStore, MemoryStore, RepoPath, VaultError};
//!
//! let store = MemoryStore::new().with_file("notes.md", "v1").unwrap();
//! let path = RepoPath::new("notes.md").unwrap();
//!
//! let file = store.read(&path, None).await.unwrap();
//! store.write(&path, b"v2", Some(&file.version)).await.unwrap();
//!
//! let again = store.write(&path, b"v3", Some(&file.version)).await;
//! assert!(matches!(again, Err(VaultError::Conflict { .. })));
//! # }
//! ```
//!
//! ## Search
//!
//! Tag filters use AND semantics and titles sort by the collation
//! locale:
//!
//! ```
//! use learnvault_core::{LearningRecord, SearchConfig, SearchEngine, SearchFilters};
//!
//! let record = |title: &str, tags: &[&str]| LearningRecord {
//!     title: title.into(),
//!     tags: tags.iter().map(|t| t.to_string()).collect(),
//!     ..LearningRecord::default()
//! };
//! let records = vec![record("JavaScript入門", &["js"]), record("Go基礎", &["go", "backend"])];
//!
//! let engine = SearchEngine::new(&SearchConfig::default());
//! let filters = SearchFilters {
//!     tags: ["go".to_string()].into(),
//!     ..SearchFilters::default()
//! };
//! let found = engine.search(&records, &filters, "");
//! assert_eq!(found.len(), 1);
//! assert_eq!(found[0].title, "Go基礎");
//! ```

mod auth;
mod catalog;
mod classification;
mod config;
mod error;
mod listing;
mod search;
mod session;
mod spreadsheet;
mod staging;
mod store;
mod transcode;
mod types;
mod vault;

pub use auth::{exchange_code, Credential};
pub use catalog::{
    bootstrap, join_tags, Catalog, CatalogEndpoint, CatalogSnapshot, HttpCatalog, MemoryCatalog,
};
pub use classification::{classify, extension, file_name, mime_type, ContentCategory, PLAIN_TEXT};
pub use config::{
    AuthConfig, CatalogConfig, Config, HttpConfig, ListingConfig, RepositoryConfig, SearchConfig,
};
pub use error::{ErrorKind, Result, VaultError};
pub use listing::ListingCache;
pub use search::{CategoryFilter, QueryResults, SearchEngine, SearchFilters, SortOrder};
pub use session::{EditSession, Preview};
pub use spreadsheet::{
    read_workbook, write_grid, CellValue, Sheet, SpreadsheetFormat, SpreadsheetGrid, Workbook,
    WRITTEN_SHEET_NAME,
};
pub use staging::{EditOrigin, StagedEdit};
pub use store::{commit_message, DocumentStore, GitHubStore, MemoryStore, WriteReceipt};
pub use transcode::{decode, encode, encode_grid, from_transport, to_transport, DisplayForm};
pub use types::*;
pub use vault::{FileView, QueryReport, SubmitOutcome, Vault};

/// Time provider trait for testing.
///
/// Allows injecting a fixed clock for record creation timestamps. Only
/// used when explicitly set via `Vault::with_time_provider()`.
pub trait TimeProvider: Send + Sync {
    /// Returns the current Unix timestamp in seconds.
    fn now(&self) -> i64;
}

impl<F> TimeProvider for F
where
    F: Fn() -> i64 + Send + Sync,
{
    fn now(&self) -> i64 {
        self()
    }
}

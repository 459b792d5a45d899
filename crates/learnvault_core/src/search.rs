//! Record search: category, tag and freeform filters plus a
//! locale-aware title sort.
//!
//! The three filter stages commute; sorting always runs last. Searching
//! never fails, an empty result is just an empty list.

use crate::config::SearchConfig;
use crate::error::{Result, VaultError};
use crate::listing::ListingCache;
use crate::types::{LearningRecord, RepoPath};
use icu_collator::{Collator, CollatorOptions};
use icu_locid::Locale;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Category selector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryFilter {
    /// No restriction.
    #[default]
    All,
    /// Exact category name.
    Named(String),
}

/// `*` or an empty string selects every category. Any other input names a
/// category exactly, so a category called `all` stays selectable.
impl FromStr for CategoryFilter {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "" | "*" => Ok(Self::All),
            name => Ok(Self::Named(name.to_string())),
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// Sort key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    /// Title, ascending.
    #[default]
    NameAsc,
    /// Title, descending.
    NameDesc,
}

impl FromStr for SortOrder {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "name-asc" => Ok(Self::NameAsc),
            "name-desc" => Ok(Self::NameDesc),
            other => Err(VaultError::ConfigError(format!(
                "unknown sort order {:?} (expected name-asc or name-desc)",
                other
            ))),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NameAsc => f.write_str("name-asc"),
            Self::NameDesc => f.write_str("name-desc"),
        }
    }
}

/// Structured search filters. Kept until replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Every tag must be present on a matching record.
    pub tags: BTreeSet<String>,
    /// Category restriction.
    pub category: CategoryFilter,
    /// Result order.
    pub sort: SortOrder,
}

impl SearchFilters {
    /// One-line description of the active filters.
    pub fn summary(&self) -> String {
        let tags = if self.tags.is_empty() {
            "none".to_string()
        } else {
            self.tags.iter().cloned().collect::<Vec<_>>().join(", ")
        };
        format!(
            "Filters applied: tags [{}], category {}, sort {}",
            tags, self.category, self.sort
        )
    }

    fn matches(&self, record: &LearningRecord) -> bool {
        let category_ok = match &self.category {
            CategoryFilter::All => true,
            CategoryFilter::Named(name) => record.category_name.as_deref() == Some(name.as_str()),
        };
        category_ok && record.has_all_tags(&self.tags)
    }
}

fn matches_freeform(record: &LearningRecord, needle: &str) -> bool {
    needle.is_empty()
        || record.title.to_lowercase().contains(needle)
        || record.explanatory_text.to_lowercase().contains(needle)
}

/// Resolves queries against a record set.
#[derive(Debug, Clone)]
pub struct SearchEngine {
    locale: Option<Locale>,
}

impl SearchEngine {
    /// Creates an engine collating titles for the configured locale.
    ///
    /// An unparseable locale falls back to codepoint order.
    pub fn new(config: &SearchConfig) -> Self {
        let locale = match config.locale.parse::<Locale>() {
            Ok(locale) => Some(locale),
            Err(e) => {
                warn!(locale = %config.locale, error = %e, "Invalid collation locale");
                None
            }
        };
        Self { locale }
    }

    /// Filters and sorts `records`.
    pub fn search<'a>(
        &self,
        records: &'a [LearningRecord],
        filters: &SearchFilters,
        query: &str,
    ) -> Vec<&'a LearningRecord> {
        let needle = query.trim().to_lowercase();
        let mut matched: Vec<&LearningRecord> = records
            .iter()
            .filter(|record| filters.matches(record))
            .filter(|record| matches_freeform(record, &needle))
            .collect();

        self.sort(&mut matched, filters.sort);
        debug!(
            total = records.len(),
            matched = matched.len(),
            sort = %filters.sort,
            "Record search"
        );
        matched
    }

    fn sort(&self, records: &mut [&LearningRecord], order: SortOrder) {
        let collator = self.collator();
        let compare = |a: &str, b: &str| -> Ordering {
            let primary = match &collator {
                Some(collator) => collator.compare(a, b),
                None => Ordering::Equal,
            };
            primary.then_with(|| a.cmp(b))
        };
        match order {
            SortOrder::NameAsc => records.sort_by(|a, b| compare(&a.title, &b.title)),
            SortOrder::NameDesc => records.sort_by(|a, b| compare(&b.title, &a.title)),
        }
    }

    fn collator(&self) -> Option<Collator> {
        let locale = self.locale.as_ref()?;
        match Collator::try_new(&locale.into(), CollatorOptions::new()) {
            Ok(collator) => Some(collator),
            Err(e) => {
                warn!(locale = %locale, error = %e, "Collator unavailable; using codepoint order");
                None
            }
        }
    }

    /// Runs the record search and the path search for one query.
    pub fn query<'a>(
        &self,
        records: &'a [LearningRecord],
        listing: &ListingCache,
        filters: &SearchFilters,
        query: &str,
    ) -> QueryResults<'a> {
        QueryResults {
            query: query.trim().to_string(),
            records: self.search(records, filters, query),
            files: listing.find(query),
        }
    }
}

/// Both result sections for one query.
#[derive(Debug, Clone)]
pub struct QueryResults<'a> {
    /// Trimmed query text.
    pub query: String,
    /// Matching records, sorted.
    pub records: Vec<&'a LearningRecord>,
    /// Matching repository paths, in listing order.
    pub files: Vec<RepoPath>,
}

impl QueryResults<'_> {
    /// Rendered count for the record section.
    pub fn record_message(&self) -> String {
        count_message(self.records.len())
    }

    /// Rendered count for the file section.
    pub fn file_message(&self) -> String {
        count_message(self.files.len())
    }
}

fn count_message(count: usize) -> String {
    match count {
        1 => "1 result".to_string(),
        n => format!("{} results", n),
    }
}

//! Core types for learning records and repository files.

use crate::classification::{classify, ContentCategory};
use crate::error::{Result, VaultError};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Highest understanding level a record can carry.
pub const MAX_UNDERSTANDING_LEVEL: u8 = 5;

/// Slash-separated path relative to the repository root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoPath(String);

impl RepoPath {
    /// Validates and wraps a repository path.
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let valid = !path.is_empty()
            && !path.starts_with('/')
            && !path.ends_with('/')
            && path
                .split('/')
                .all(|segment| !segment.is_empty() && segment != "." && segment != "..");
        if valid {
            Ok(Self(path))
        } else {
            Err(VaultError::InvalidPath(path))
        }
    }

    /// Returns the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Final path component.
    pub fn file_name(&self) -> &str {
        crate::classification::file_name(&self.0)
    }

    /// Content category of the path.
    pub fn category(&self) -> ContentCategory {
        classify(&self.0)
    }
}

impl TryFrom<String> for RepoPath {
    type Error = VaultError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<RepoPath> for String {
    fn from(value: RepoPath) -> Self {
        value.0
    }
}

impl fmt::Display for RepoPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw value.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the raw value.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// First seven characters, for logs and messages.
            pub fn short(&self) -> &str {
                match self.0.char_indices().nth(7) {
                    Some((end, _)) => &self.0[..end],
                    None => &self.0,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_id!(
    /// Identifies a file's exact content state. Changes on every write and
    /// is the precondition for the next one.
    VersionToken
);

opaque_id!(
    /// Identifies a repository-wide state (a commit). Reads pinned to a
    /// revision are historical and read-only.
    Revision
);

/// Understanding level, 0 through 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct UnderstandingLevel(u8);

impl UnderstandingLevel {
    /// Validates a level.
    pub fn new(level: u8) -> Result<Self> {
        if level <= MAX_UNDERSTANDING_LEVEL {
            Ok(Self(level))
        } else {
            Err(VaultError::InvalidRecord(format!(
                "understanding level {} is outside 0..={}",
                level, MAX_UNDERSTANDING_LEVEL
            )))
        }
    }

    /// Returns the raw level.
    pub fn get(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for UnderstandingLevel {
    type Error = VaultError;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl From<UnderstandingLevel> for u8 {
    fn from(value: UnderstandingLevel) -> Self {
        value.0
    }
}

/// A cataloged learning record.
///
/// Field names follow the catalog's JSON representation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LearningRecord {
    /// Catalog-assigned id; None for an unsaved draft.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Title, used for sorting and freeform search.
    pub title: String,

    /// Body text, used for freeform search.
    #[serde(default, deserialize_with = "null_as_default")]
    pub explanatory_text: String,

    /// Self-assessed understanding.
    #[serde(default)]
    pub understanding_level: UnderstandingLevel,

    /// Optional external reference.
    #[serde(default, deserialize_with = "blank_as_none")]
    pub reference_url: Option<String>,

    /// Category reference used when submitting.
    #[serde(default)]
    pub category_id: Option<i64>,

    /// Category name as joined by the catalog.
    #[serde(default)]
    pub category_name: Option<String>,

    /// Tag names; order is irrelevant.
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: BTreeSet<String>,

    /// Attached repository file.
    #[serde(default, deserialize_with = "blank_path_as_none")]
    pub github_path: Option<RepoPath>,

    /// Revision produced by the last write of the attached file.
    #[serde(default, deserialize_with = "blank_revision_as_none")]
    pub commit_sha: Option<Revision>,

    /// Creation timestamp (RFC 3339).
    #[serde(default)]
    pub created_at: Option<String>,
}

// The catalog stores "" for an unset path or commit and leaves joined
// columns null.

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn blank_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.trim().is_empty()))
}

fn blank_path_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<RepoPath>, D::Error>
where
    D: Deserializer<'de>,
{
    blank_as_none(deserializer)?
        .map(|path| RepoPath::new(path.trim()).map_err(D::Error::custom))
        .transpose()
}

fn blank_revision_as_none<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Revision>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(blank_as_none(deserializer)?.map(|sha| Revision::new(sha.trim())))
}

impl LearningRecord {
    /// Creates a blank draft.
    pub fn draft() -> Self {
        Self::default()
    }

    /// Checks the fields a submission needs.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(VaultError::InvalidRecord("title must not be empty".to_string()));
        }
        if self.commit_sha.is_some() && self.github_path.is_none() {
            return Err(VaultError::InvalidRecord(
                "a commit reference requires a repository path".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns true if every tag in `required` is present.
    pub fn has_all_tags<'a>(&self, required: impl IntoIterator<Item = &'a String>) -> bool {
        required.into_iter().all(|tag| self.tags.contains(tag))
    }
}

/// Tag as listed by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Catalog id.
    pub id: i64,
    /// Display name.
    pub name: String,
}

/// Association between a record and a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagLink {
    /// Record id.
    pub learning_id: i64,
    /// Tag id.
    pub tag_id: i64,
}

/// Category as listed by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Catalog id.
    pub id: i64,
    /// Display name.
    pub name: String,
}

/// A file as read from the repository. Never cached beyond one session.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteFile {
    /// Repository path.
    pub path: RepoPath,
    /// Current version token, the precondition for writing this file.
    pub version: VersionToken,
    /// Revision the read was pinned to, if any.
    pub revision: Option<Revision>,
    /// Raw payload bytes.
    pub payload: Vec<u8>,
    /// Set for pinned reads; such files can not be written back.
    pub read_only: bool,
}

impl RemoteFile {
    /// Content category derived from the path.
    pub fn category(&self) -> ContentCategory {
        self.path.category()
    }
}

/// Edit session state machine states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditState {
    /// Nothing opened yet.
    Idle,

    /// Record fields are being edited.
    Drafting,

    /// A file edit is staged for the next submit.
    FileStaged,

    /// Submission is in flight.
    Submitting,

    /// The record (and staged file, if any) were saved.
    Committed {
        /// Revision of the written file, if one was written.
        revision: Option<Revision>,
    },

    /// The file write landed but the record submission failed.
    RolledBack {
        /// Catalog failure description.
        reason: String,
    },
}

impl EditState {
    /// Returns true once the session can no longer change.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed { .. } | Self::RolledBack { .. })
    }
}

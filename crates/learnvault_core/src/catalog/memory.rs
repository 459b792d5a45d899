//! In-process catalog with per-endpoint failure injection.

use super::Catalog;
use crate::error::{Result, VaultError};
use crate::types::{Category, LearningRecord, Tag, TagLink};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

/// Catalog endpoints, for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogEndpoint {
    /// `list_records`
    ListRecords,
    /// `list_tags`
    ListTags,
    /// `list_tag_links`
    ListTagLinks,
    /// `list_categories`
    ListCategories,
    /// `create_record`
    CreateRecord,
    /// `update_record`
    UpdateRecord,
    /// `delete_record`
    DeleteRecord,
    /// `create_category`
    CreateCategory,
}

#[derive(Debug, Default)]
struct Tables {
    records: BTreeMap<i64, LearningRecord>,
    tags: Vec<Tag>,
    links: Vec<TagLink>,
    categories: Vec<Category>,
    next_id: i64,
    failing: HashSet<CatalogEndpoint>,
}

impl Tables {
    fn allocate(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn tag_id(&mut self, name: &str) -> i64 {
        if let Some(tag) = self.tags.iter().find(|t| t.name == name) {
            return tag.id;
        }
        let id = self.allocate();
        self.tags.push(Tag {
            id,
            name: name.to_string(),
        });
        id
    }

    fn store(&mut self, id: i64, mut record: LearningRecord) {
        self.links.retain(|link| link.learning_id != id);
        for name in std::mem::take(&mut record.tags) {
            let tag_id = self.tag_id(&name);
            self.links.push(TagLink {
                learning_id: id,
                tag_id,
            });
        }
        record.id = Some(id);
        record.category_name = record
            .category_id
            .and_then(|cid| self.categories.iter().find(|c| c.id == cid))
            .map(|c| c.name.clone());
        self.records.insert(id, record);
    }

    fn check(&self, endpoint: CatalogEndpoint) -> Result<()> {
        if self.failing.contains(&endpoint) {
            return Err(VaultError::Transport {
                operation: format!("{:?}", endpoint),
                status: Some(500),
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

/// Catalog held in memory.
///
/// Behaves like the backend: tags are stored as links and joined on
/// read, unknown tag names are created on write, and category names are
/// resolved from category ids.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    tables: Mutex<Tables>,
}

impl MemoryCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Adds a category and returns its id.
    pub fn add_category(&self, name: &str) -> i64 {
        let mut tables = self.tables();
        let id = tables.allocate();
        tables.categories.push(Category {
            id,
            name: name.to_string(),
        });
        id
    }

    /// Stores a record with the given tags and category, returning its id.
    pub fn seed(&self, mut record: LearningRecord, tags: &[&str], category: Option<&str>) -> i64 {
        let mut tables = self.tables();
        record.tags = tags.iter().map(|t| t.to_string()).collect();
        record.category_id = category.and_then(|name| {
            tables
                .categories
                .iter()
                .find(|c| c.name == name)
                .map(|c| c.id)
        });
        let id = tables.allocate();
        tables.store(id, record);
        id
    }

    /// Returns a stored record with its tags joined.
    pub fn get(&self, id: i64) -> Option<LearningRecord> {
        let tables = self.tables();
        let mut record = tables.records.get(&id)?.clone();
        record.tags = tables
            .links
            .iter()
            .filter(|link| link.learning_id == id)
            .filter_map(|link| tables.tags.iter().find(|t| t.id == link.tag_id))
            .map(|t| t.name.clone())
            .collect();
        Some(record)
    }

    /// Returns the first stored record with the given title, tags joined.
    pub fn find_by_title(&self, title: &str) -> Option<LearningRecord> {
        let id = {
            let tables = self.tables();
            tables
                .records
                .iter()
                .find(|(_, record)| record.title == title)
                .map(|(id, _)| *id)?
        };
        self.get(id)
    }

    /// Number of stored records.
    pub fn record_count(&self) -> usize {
        self.tables().records.len()
    }

    /// Makes `endpoint` fail until [`recover`](Self::recover) is called.
    pub fn fail(&self, endpoint: CatalogEndpoint) {
        self.tables().failing.insert(endpoint);
    }

    /// Clears an injected failure.
    pub fn recover(&self, endpoint: CatalogEndpoint) {
        self.tables().failing.remove(&endpoint);
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn list_records(&self) -> Result<Vec<LearningRecord>> {
        let tables = self.tables();
        tables.check(CatalogEndpoint::ListRecords)?;
        Ok(tables.records.values().cloned().collect())
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        let tables = self.tables();
        tables.check(CatalogEndpoint::ListTags)?;
        Ok(tables.tags.clone())
    }

    async fn list_tag_links(&self) -> Result<Vec<TagLink>> {
        let tables = self.tables();
        tables.check(CatalogEndpoint::ListTagLinks)?;
        Ok(tables.links.clone())
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let tables = self.tables();
        tables.check(CatalogEndpoint::ListCategories)?;
        Ok(tables.categories.clone())
    }

    async fn create_record(&self, record: &LearningRecord) -> Result<()> {
        let mut tables = self.tables();
        tables.check(CatalogEndpoint::CreateRecord)?;
        let id = tables.allocate();
        tables.store(id, record.clone());
        Ok(())
    }

    async fn update_record(&self, id: i64, record: &LearningRecord) -> Result<()> {
        let mut tables = self.tables();
        tables.check(CatalogEndpoint::UpdateRecord)?;
        if !tables.records.contains_key(&id) {
            return Err(VaultError::RecordNotFound(id));
        }
        tables.store(id, record.clone());
        Ok(())
    }

    async fn delete_record(&self, id: i64) -> Result<()> {
        let mut tables = self.tables();
        tables.check(CatalogEndpoint::DeleteRecord)?;
        if tables.records.remove(&id).is_none() {
            return Err(VaultError::RecordNotFound(id));
        }
        tables.links.retain(|link| link.learning_id != id);
        Ok(())
    }

    async fn create_category(&self, name: &str) -> Result<()> {
        {
            let tables = self.tables();
            tables.check(CatalogEndpoint::CreateCategory)?;
        }
        self.add_category(name);
        Ok(())
    }
}

//! Catalog backend client and the startup bootstrap.

mod memory;

pub use memory::{CatalogEndpoint, MemoryCatalog};

use crate::config::CatalogConfig;
use crate::error::{Result, VaultError};
use crate::types::{Category, LearningRecord, Tag, TagLink};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, error, info};

/// Record, tag and category storage.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Lists every record. Tags are joined separately from the links.
    async fn list_records(&self) -> Result<Vec<LearningRecord>>;

    /// Lists every tag.
    async fn list_tags(&self) -> Result<Vec<Tag>>;

    /// Lists record/tag associations.
    async fn list_tag_links(&self) -> Result<Vec<TagLink>>;

    /// Lists every category.
    async fn list_categories(&self) -> Result<Vec<Category>>;

    /// Creates a record. Unknown tag names are created by the backend.
    async fn create_record(&self, record: &LearningRecord) -> Result<()>;

    /// Replaces the record with the given id.
    async fn update_record(&self, id: i64, record: &LearningRecord) -> Result<()>;

    /// Deletes a record.
    async fn delete_record(&self, id: i64) -> Result<()>;

    /// Creates a category.
    async fn create_category(&self, name: &str) -> Result<()>;
}

/// Everything the bootstrap loads, with tags joined into records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogSnapshot {
    /// Records with tag names attached.
    pub records: Vec<LearningRecord>,
    /// All tags.
    pub tags: Vec<Tag>,
    /// All categories.
    pub categories: Vec<Category>,
}

impl CatalogSnapshot {
    /// Returns the record with the given id.
    pub fn record(&self, id: i64) -> Option<&LearningRecord> {
        self.records.iter().find(|r| r.id == Some(id))
    }

    /// Looks up a category id by name.
    pub fn category_id(&self, name: &str) -> Option<i64> {
        self.categories.iter().find(|c| c.name == name).map(|c| c.id)
    }
}

/// Loads records, tags, tag links and categories concurrently.
///
/// The four reads are joined; if any of them fails the whole bootstrap
/// fails with [`VaultError::PartialJoin`] naming the failed reads, so
/// no half-joined cross references are ever returned.
pub async fn bootstrap(catalog: &dyn Catalog) -> Result<CatalogSnapshot> {
    let (records, tags, links, categories) = tokio::join!(
        catalog.list_records(),
        catalog.list_tags(),
        catalog.list_tag_links(),
        catalog.list_categories(),
    );

    let mut failed = Vec::new();
    for (name, outcome) in [
        ("records", records.as_ref().err()),
        ("tags", tags.as_ref().err()),
        ("tag links", links.as_ref().err()),
        ("categories", categories.as_ref().err()),
    ] {
        if let Some(e) = outcome {
            error!(read = name, error = %e, "Catalog read failed");
            failed.push(name.to_string());
        }
    }

    match (records, tags, links, categories) {
        (Ok(records), Ok(tags), Ok(links), Ok(categories)) => {
            let records = join_tags(records, &tags, &links);
            info!(
                records = records.len(),
                tags = tags.len(),
                categories = categories.len(),
                "Catalog loaded"
            );
            Ok(CatalogSnapshot {
                records,
                tags,
                categories,
            })
        }
        _ => Err(VaultError::PartialJoin { failed }),
    }
}

/// Replaces each record's tags with the names its links resolve to.
/// Links to unknown tag ids are dropped.
pub fn join_tags(
    mut records: Vec<LearningRecord>,
    tags: &[Tag],
    links: &[TagLink],
) -> Vec<LearningRecord> {
    let names: HashMap<i64, &str> = tags.iter().map(|t| (t.id, t.name.as_str())).collect();
    let mut by_record: HashMap<i64, Vec<&str>> = HashMap::new();
    for link in links {
        match names.get(&link.tag_id) {
            Some(name) => by_record.entry(link.learning_id).or_default().push(*name),
            None => debug!(tag_id = link.tag_id, "Dropping link to unknown tag"),
        }
    }

    for record in &mut records {
        record.tags = record
            .id
            .and_then(|id| by_record.get(&id))
            .map(|names| names.iter().map(|n| n.to_string()).collect())
            .unwrap_or_default();
    }
    records
}

/// Catalog client over the backend's JSON endpoints.
pub struct HttpCatalog {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct NewCategory<'a> {
    name: &'a str,
}

impl HttpCatalog {
    /// Creates a client rooted at the configured base URL.
    pub fn new(config: &CatalogConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/{}", self.base_url, endpoint))
            .header("X-Requested-With", "XMLHttpRequest")
    }

    async fn execute(&self, operation: &str, builder: RequestBuilder) -> Result<reqwest::Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| VaultError::transport(operation, e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(VaultError::Transport {
                operation: operation.to_string(),
                status: Some(status.as_u16()),
                message: format!("HTTP {}", status),
            });
        }
        Ok(response)
    }

    async fn get_list<T: DeserializeOwned + Send>(&self, endpoint: &str) -> Result<Vec<T>> {
        debug!(endpoint, "Catalog read");
        let response = self.execute(endpoint, self.request(Method::GET, endpoint)).await?;
        response
            .json()
            .await
            .map_err(|e| VaultError::parse(endpoint, e))
    }

    async fn post<B: Serialize + Sync + ?Sized>(&self, endpoint: &str, body: Option<&B>) -> Result<()> {
        debug!(endpoint, "Catalog write");
        let mut builder = self.request(Method::POST, endpoint);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.execute(endpoint, builder).await?;
        Ok(())
    }
}

#[async_trait]
impl Catalog for HttpCatalog {
    async fn list_records(&self) -> Result<Vec<LearningRecord>> {
        self.get_list("learning").await
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        self.get_list("tag_list").await
    }

    async fn list_tag_links(&self) -> Result<Vec<TagLink>> {
        self.get_list("learning_tag_list").await
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        self.get_list("category_list").await
    }

    async fn create_record(&self, record: &LearningRecord) -> Result<()> {
        self.post("learning_insert", Some(record)).await
    }

    async fn update_record(&self, id: i64, record: &LearningRecord) -> Result<()> {
        self.post(&format!("learning_update/{}", id), Some(record))
            .await
    }

    async fn delete_record(&self, id: i64) -> Result<()> {
        self.post::<()>(&format!("learning_delete/{}", id), None)
            .await
    }

    async fn create_category(&self, name: &str) -> Result<()> {
        self.post("category_insert", Some(&NewCategory { name }))
            .await
    }
}

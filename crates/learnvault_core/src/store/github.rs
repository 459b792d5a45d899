//! Document store backed by the hosted contents API.

use super::{commit_message, DocumentStore, WriteReceipt};
use crate::config::RepositoryConfig;
use crate::error::{Result, VaultError};
use crate::transcode::{from_transport, to_transport};
use crate::types::{RemoteFile, RepoPath, Revision, VersionToken};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const ACCEPT: &str = "application/vnd.github.v3+json";

/// Hosted repository client.
///
/// Holds the credential obtained at login; the caller builds the HTTP
/// client once and shares it.
pub struct GitHubStore {
    http: reqwest::Client,
    api_base: String,
    owner: String,
    name: String,
    branch: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BlobResponse {
    content: String,
}

#[derive(Debug, Serialize)]
struct PutRequest<'a> {
    message: String,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ShaRef {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    content: ShaRef,
    commit: ShaRef,
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: String,
}

impl GitHubStore {
    /// Creates a store for the configured repository.
    pub fn new(config: &RepositoryConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            owner: config.owner.clone(),
            name: config.name.clone(),
            branch: config.branch.clone(),
            token: config.token.clone(),
        }
    }

    fn repo_url(&self, suffix: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base,
            encode_segment(&self.owner),
            encode_segment(&self.name),
            suffix
        )
    }

    fn contents_url(&self, path: &RepoPath) -> String {
        let encoded: Vec<String> = path.as_str().split('/').map(encode_segment).collect();
        self.repo_url(&format!("contents/{}", encoded.join("/")))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.http.request(method, url).header("Accept", ACCEPT);
        match &self.token {
            Some(token) => builder.header("Authorization", format!("token {}", token)),
            None => builder,
        }
    }

    async fn send(&self, operation: &str, builder: RequestBuilder) -> Result<Response> {
        builder
            .send()
            .await
            .map_err(|e| VaultError::transport(operation, e.to_string()))
    }

    async fn fetch_blob(&self, version: &VersionToken) -> Result<Vec<u8>> {
        let url = self.repo_url(&format!("git/blobs/{}", version));
        let response = self.send("read blob", self.request(Method::GET, &url)).await?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error("read blob", version.as_str(), status, None, &body));
        }
        let blob: BlobResponse = response
            .json()
            .await
            .map_err(|e| VaultError::parse("blob response", e))?;
        from_transport(&blob.content)
    }
}

#[async_trait]
impl DocumentStore for GitHubStore {
    async fn read(&self, path: &RepoPath, revision: Option<&Revision>) -> Result<RemoteFile> {
        let url = self.contents_url(path);
        let reference = revision.map(Revision::as_str).unwrap_or(&self.branch);
        debug!(path = %path, reference = %reference, "Reading file");

        let builder = self
            .request(Method::GET, &url)
            .query(&[("ref", reference)]);
        let response = self.send("read", builder).await?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error("read", path.as_str(), status, None, &body));
        }

        let contents: ContentsResponse = response
            .json()
            .await
            .map_err(|e| VaultError::parse("contents response", e))?;
        let version = VersionToken::new(contents.sha);

        let payload = match (contents.encoding.as_deref(), contents.content) {
            (Some("base64"), Some(content)) => from_transport(&content)?,
            _ => {
                // Large files come back without inline content.
                debug!(path = %path, version = %version.short(), "Fetching blob");
                self.fetch_blob(&version).await?
            }
        };

        Ok(RemoteFile {
            path: path.clone(),
            version,
            revision: revision.cloned(),
            payload,
            read_only: revision.is_some(),
        })
    }

    async fn write(
        &self,
        path: &RepoPath,
        payload: &[u8],
        precondition: Option<&VersionToken>,
    ) -> Result<WriteReceipt> {
        let url = self.contents_url(path);
        let precondition = precondition.filter(|token| !token.as_str().is_empty());
        let body = PutRequest {
            message: commit_message(path),
            content: to_transport(payload),
            branch: &self.branch,
            sha: precondition.map(VersionToken::as_str),
        };
        debug!(
            path = %path,
            precondition = precondition.map(VersionToken::short).unwrap_or("none"),
            bytes = payload.len(),
            "Writing file"
        );

        let response = self
            .send("write", self.request(Method::PUT, &url).json(&body))
            .await?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(
                "write",
                path.as_str(),
                status,
                precondition.map(VersionToken::as_str),
                &body,
            ));
        }

        let put: PutResponse = response
            .json()
            .await
            .map_err(|e| VaultError::parse("write response", e))?;
        let receipt = WriteReceipt {
            version: VersionToken::new(put.content.sha),
            revision: Revision::new(put.commit.sha),
        };
        info!(
            path = %path,
            version = %receipt.version.short(),
            revision = %receipt.revision.short(),
            "File written"
        );
        Ok(receipt)
    }

    async fn list(&self) -> Result<Vec<RepoPath>> {
        let url = self.repo_url(&format!("git/trees/{}", encode_segment(&self.branch)));
        let builder = self
            .request(Method::GET, &url)
            .query(&[("recursive", "1")]);
        let response = self.send("list", builder).await?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error("list", &self.branch, status, None, &body));
        }

        let tree: TreeResponse = response
            .json()
            .await
            .map_err(|e| VaultError::parse("tree response", e))?;
        if tree.truncated {
            warn!(
                entries = tree.tree.len(),
                "Repository tree was truncated by the server; listing is incomplete"
            );
        }
        Ok(blob_paths(tree.tree))
    }
}

fn blob_paths(entries: Vec<TreeEntry>) -> Vec<RepoPath> {
    entries
        .into_iter()
        .filter(|entry| entry.kind == "blob")
        .filter_map(|entry| match RepoPath::new(entry.path) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(error = %e, "Skipping tree entry");
                None
            }
        })
        .collect()
}

/// Maps a non-success status onto the error taxonomy.
fn status_error(
    operation: &str,
    target: &str,
    status: u16,
    precondition: Option<&str>,
    body: &str,
) -> VaultError {
    let message = serde_json::from_str::<ApiMessage>(body)
        .map(|m| m.message)
        .unwrap_or_else(|_| format!("HTTP {}", status));

    match (operation, status) {
        (_, 404) => VaultError::NotFound {
            path: target.to_string(),
        },
        ("write", 409) => VaultError::Conflict {
            path: target.to_string(),
            expected: precondition.map(str::to_string),
        },
        // Creating a path that already exists without a precondition.
        ("write", 422) if precondition.is_none() => VaultError::Conflict {
            path: target.to_string(),
            expected: None,
        },
        _ => VaultError::Transport {
            operation: operation.to_string(),
            status: Some(status),
            message,
        },
    }
}

/// Percent-encodes one URL path segment.
fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

//! Configuration for the repository, catalog and search.
//!
//! A `Config` is built once at process start and handed to the
//! constructors that need it. Nothing in the core reads the process
//! environment.

use crate::error::{Result, VaultError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Comprehensive configuration for a learnvault client.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Remote content repository.
    #[serde(default)]
    pub repository: RepositoryConfig,

    /// Catalog backend.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Identity handoff.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Record search.
    #[serde(default)]
    pub search: SearchConfig,

    /// Repository listing cache.
    #[serde(default)]
    pub listing: ListingConfig,

    /// Shared HTTP client settings.
    #[serde(default)]
    pub http: HttpConfig,
}

impl Config {
    /// Load configuration from a file, falling back to defaults when it is missing.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .map_err(|e| VaultError::ConfigError(format!("failed to read config: {}", e)))?;
            toml::from_str(&content)
                .map_err(|e| VaultError::ConfigError(format!("failed to parse config: {}", e)))
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| VaultError::ConfigError(format!("failed to serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, content)
            .map_err(|e| VaultError::ConfigError(format!("failed to write config: {}", e)))?;
        Ok(())
    }

    /// Checks that the remote repository is fully identified.
    pub fn validate(&self) -> Result<()> {
        if self.repository.owner.trim().is_empty() || self.repository.name.trim().is_empty() {
            return Err(VaultError::ConfigError(
                "repository owner and name must be set".to_string(),
            ));
        }
        if self.repository.branch.trim().is_empty() {
            return Err(VaultError::ConfigError("repository branch must be set".to_string()));
        }
        Ok(())
    }
}

/// Remote content repository configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Base URL of the hosted API (default: https://api.github.com).
    pub api_base: String,

    /// Repository owner (user or organisation).
    pub owner: String,

    /// Repository name.
    pub name: String,

    /// Branch that reads and writes target (default: main).
    pub branch: String,

    /// Credential obtained from the identity handoff.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            owner: String::new(),
            name: String::new(),
            branch: "main".to_string(),
            token: None,
        }
    }
}

/// Catalog backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Base URL that the catalog endpoints are relative to.
    pub base_url: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
        }
    }
}

/// Identity handoff configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Endpoint that exchanges an authorization code for a credential.
    pub token_url: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_url: "http://localhost:8080/github".to_string(),
        }
    }
}

/// Record search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// BCP 47 locale used for title collation (default: ja).
    pub locale: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            locale: "ja".to_string(),
        }
    }
}

/// Repository listing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    /// Delay before refreshing the listing after a new file was committed.
    /// The hosted tree endpoint lags behind writes (default: 3 seconds).
    pub refresh_delay_secs: u64,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            refresh_delay_secs: 3,
        }
    }
}

impl ListingConfig {
    /// Returns the refresh delay as a Duration.
    pub fn refresh_delay(&self) -> Duration {
        Duration::from_secs(self.refresh_delay_secs)
    }
}

/// Shared HTTP client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds (default: 30).
    pub timeout_secs: u64,

    /// User agent sent with every request. The hosted API rejects requests without one.
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("learnvault/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpConfig {
    /// Returns the request timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Builds the HTTP client shared by the store, the catalog and the login exchange.
    pub fn build_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout())
            .user_agent(self.user_agent.clone())
            .build()
            .map_err(|e| VaultError::ConfigError(format!("failed to build HTTP client: {}", e)))
    }
}

//! CLI commands.

pub mod category;
pub mod files;
pub mod login;
pub mod record;
pub mod search;

use anyhow::{Context as _, Result};
use indicatif::{ProgressBar, ProgressStyle};
use learnvault_core::{Config, MemoryCatalog, MemoryStore, Vault};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Global options shared by every command.
pub struct Context {
    config_path: PathBuf,
    token: Option<String>,
    offline: bool,
}

impl Context {
    pub fn new(config_path: PathBuf, token: Option<String>, offline: bool) -> Self {
        Self {
            config_path,
            token,
            offline,
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Loads the config file and applies command-line overrides.
    pub fn config(&self) -> Result<Config> {
        let mut config = Config::load(&self.config_path)
            .with_context(|| format!("Failed to load {}", self.config_path.display()))?;
        if let Some(token) = &self.token {
            config.repository.token = Some(token.clone());
        }
        Ok(config)
    }

    /// Builds the vault, without loading anything yet.
    pub fn vault(&self) -> Result<Vault> {
        let config = self.config()?;
        if self.offline {
            return Ok(Vault::new(
                Arc::new(MemoryStore::new()),
                Arc::new(MemoryCatalog::new()),
                &config,
            ));
        }
        Vault::connect(&config).context("Failed to set up the remote services")
    }

    /// Builds the vault and loads the catalog and listing.
    ///
    /// A catalog failure is reported and the (empty) vault is still
    /// returned so that repository commands keep working.
    pub async fn loaded_vault(&self) -> Result<Vault> {
        let vault = self.vault()?;
        let pb = spinner("Loading catalog...");
        let loaded = vault.bootstrap().await;
        pb.finish_and_clear();
        if let Err(e) = loaded {
            warn_user(&format!("{}", e));
            if let Some(hint) = e.recovery_suggestion() {
                warn_user(hint);
            }
        }
        Ok(vault)
    }
}

/// Spinner on stderr for a remote call.
pub fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Prints a warning line on stderr.
pub fn warn_user(message: &str) {
    eprintln!("{} {}", console::style("warning:").yellow().bold(), message);
}

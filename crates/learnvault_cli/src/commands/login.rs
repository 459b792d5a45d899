//! Login command - single-use authorization code exchange.

use super::{spinner, Context};
use anyhow::{Context as _, Result};
use console::style;
use learnvault_core::exchange_code;

pub async fn run(ctx: &Context, code: &str) -> Result<()> {
    let mut config = ctx.config()?;
    let http = config.http.build_client()?;

    let pb = spinner("Exchanging authorization code...");
    let credential = exchange_code(&http, &config.auth.token_url, code).await;
    pb.finish_and_clear();
    let credential = credential.context("Login failed")?;

    config.repository.token = Some(credential.into_inner());
    config
        .save(ctx.config_path())
        .with_context(|| format!("Failed to save {}", ctx.config_path().display()))?;

    println!(
        "{} Logged in; credential saved to {}",
        style("✓").green(),
        ctx.config_path().display()
    );
    Ok(())
}

//! Category commands.

use super::Context;
use anyhow::{Context as _, Result};
use console::style;

pub async fn add(ctx: &Context, name: &str) -> Result<()> {
    let vault = ctx.loaded_vault().await?;
    vault
        .create_category(name)
        .await
        .with_context(|| format!("Failed to create category {:?}", name))?;
    println!("{} Created category {}", style("✓").green(), name.trim());
    Ok(())
}

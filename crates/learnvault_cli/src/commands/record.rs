//! Record commands - create, edit and delete through an edit session.

use super::{spinner, warn_user, Context};
use anyhow::{anyhow, bail, Context as _, Result};
use clap::Args;
use console::style;
use learnvault_core::{
    CellValue, EditSession, Preview, RepoPath, UnderstandingLevel, Vault,
};
use std::fs;
use std::path::PathBuf;

/// Record fields and file options shared by `record new` and `record edit`.
#[derive(Args, Debug, Default)]
pub struct RecordFields {
    /// Explanatory text
    #[arg(long)]
    text: Option<String>,
    /// Understanding level (0-5)
    #[arg(long)]
    level: Option<u8>,
    /// Reference URL
    #[arg(long)]
    url: Option<String>,
    /// Category name
    #[arg(long)]
    category: Option<String>,
    /// Tag (repeatable; replaces the record's tags)
    #[arg(short, long = "tag")]
    tags: Vec<String>,
    /// Upload a local file as a new repository file
    #[arg(long, conflicts_with = "attach")]
    file: Option<PathBuf>,
    /// Link an existing repository file
    #[arg(long)]
    attach: Option<String>,
    /// Replace the linked text file's content with this local file
    #[arg(long)]
    content: Option<PathBuf>,
    /// Edit a spreadsheet cell as ROW,COL=VALUE (1-based, repeatable)
    #[arg(long = "cell")]
    cells: Vec<String>,
}

pub async fn create(ctx: &Context, title: &str, fields: &RecordFields) -> Result<()> {
    let vault = ctx.loaded_vault().await?;
    let mut session = vault.open_new()?;
    session.fields_mut()?.title = title.to_string();
    prepare(&vault, &mut session, fields).await?;
    submit(&vault, &mut session).await
}

pub async fn edit(
    ctx: &Context,
    id: i64,
    title: Option<&str>,
    fields: &RecordFields,
) -> Result<()> {
    let vault = ctx.loaded_vault().await?;

    let pb = spinner("Opening record...");
    let session = vault.open_existing(id).await;
    pb.finish_and_clear();
    let mut session = session.with_context(|| format!("Failed to open record {}", id))?;

    report_preview(&session);
    if let Some(title) = title {
        session.fields_mut()?.title = title.to_string();
    }
    prepare(&vault, &mut session, fields).await?;
    submit(&vault, &mut session).await
}

pub async fn delete(ctx: &Context, id: i64) -> Result<()> {
    let vault = ctx.loaded_vault().await?;
    if vault.snapshot().record(id).is_none() {
        bail!("No record with id {}", id);
    }
    vault
        .delete_record(id)
        .await
        .with_context(|| format!("Failed to delete record {}", id))?;
    println!("{} Deleted record {}", style("✓").green(), id);
    Ok(())
}

async fn prepare(vault: &Vault, session: &mut EditSession, fields: &RecordFields) -> Result<()> {
    let snapshot = vault.snapshot();
    {
        let record = session.fields_mut()?;
        if let Some(text) = &fields.text {
            record.explanatory_text = text.clone();
        }
        if let Some(level) = fields.level {
            record.understanding_level = UnderstandingLevel::new(level)?;
        }
        if let Some(url) = &fields.url {
            record.reference_url = Some(url.clone()).filter(|u| !u.is_empty());
        }
        if let Some(name) = &fields.category {
            let id = snapshot.category_id(name).ok_or_else(|| {
                anyhow!(
                    "Unknown category {:?}; create it with 'learnvault category add'",
                    name
                )
            })?;
            record.category_id = Some(id);
            record.category_name = Some(name.clone());
        }
        if !fields.tags.is_empty() {
            record.tags = fields.tags.iter().cloned().collect();
        }
    }

    if let Some(path) = &fields.file {
        vault
            .stage_local_file(session, path)
            .with_context(|| format!("Failed to stage {}", path.display()))?;
    }

    if let Some(path) = &fields.attach {
        let pb = spinner("Reading file...");
        let opened = vault.open_remote_file(session, path).await;
        pb.finish_and_clear();
        opened.with_context(|| format!("Failed to open {}", path))?;
        report_preview(session);
        if matches!(session.preview(), Preview::Missing) {
            // Linking a path that does not exist yet is allowed.
            session.fields_mut()?.github_path = Some(RepoPath::new(path.as_str())?);
        }
    }

    if let Some(content) = &fields.content {
        let text = fs::read_to_string(content)
            .with_context(|| format!("Failed to read {}", content.display()))?;
        session
            .stage_text(&text)
            .context("Failed to stage the new content")?;
    }

    for cell in &fields.cells {
        let (row, col, value) = parse_cell(cell)?;
        session
            .set_cell(row, col, value)
            .with_context(|| format!("Failed to edit cell {}", cell))?;
    }

    Ok(())
}

async fn submit(vault: &Vault, session: &mut EditSession) -> Result<()> {
    let pb = spinner("Saving...");
    let outcome = vault.submit(session).await;
    pb.finish_and_clear();

    match outcome {
        Ok(outcome) => {
            println!(
                "{} {}",
                style("✓").green(),
                session.notice().unwrap_or("Saved")
            );
            if let Some(revision) = outcome.revision {
                println!("  commit {}", style(revision).dim());
            }
            Ok(())
        }
        Err(e) => Err(anyhow::Error::new(e).context("Failed to save the record")),
    }
}

fn report_preview(session: &EditSession) {
    match session.preview() {
        Preview::Missing => warn_user("The linked file does not exist in the repository."),
        Preview::Error { message, .. } => {
            warn_user(&format!("Preview failed: {} (editing disabled)", message))
        }
        Preview::Unsupported { category, .. } => warn_user(&format!(
            "{} files can be linked but not edited.",
            category.name()
        )),
        _ => {}
    }
}

/// Parses `ROW,COL=VALUE` with 1-based coordinates.
fn parse_cell(input: &str) -> Result<(usize, usize, CellValue)> {
    let (coords, value) = input
        .split_once('=')
        .ok_or_else(|| anyhow!("Cell edit {:?} is not ROW,COL=VALUE", input))?;
    let (row, col) = coords
        .split_once(',')
        .ok_or_else(|| anyhow!("Cell edit {:?} is not ROW,COL=VALUE", input))?;
    let row: usize = row.trim().parse().context("Invalid row")?;
    let col: usize = col.trim().parse().context("Invalid column")?;
    if row == 0 || col == 0 {
        bail!("Cell coordinates start at 1");
    }
    Ok((row - 1, col - 1, CellValue::from_input(value)))
}

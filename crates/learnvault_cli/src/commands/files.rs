//! Repository file commands.

use super::{spinner, Context};
use anyhow::{Context as _, Result};
use console::style;
use learnvault_core::{Preview, SpreadsheetGrid};

pub async fn list(ctx: &Context, filter: Option<&str>) -> Result<()> {
    let vault = ctx.vault()?;

    let pb = spinner("Listing repository...");
    let listed = vault.refresh_listing().await;
    pb.finish_and_clear();
    listed.context("Failed to list repository files")?;

    let paths = match filter {
        Some(filter) => vault.listing().find(filter),
        None => vault.listing().snapshot().as_ref().clone(),
    };
    for path in &paths {
        println!("{}", path);
    }
    eprintln!("{}", style(format!("{} paths", paths.len())).dim());
    Ok(())
}

pub async fn show(ctx: &Context, path: &str, rev: Option<&str>, sheet: usize) -> Result<()> {
    let vault = ctx.vault()?;

    let pb = spinner("Reading file...");
    let view = vault.view_file(path, rev).await;
    pb.finish_and_clear();
    let view = view.with_context(|| format!("Failed to read {}", path))?;

    let mut header = format!(
        "{} ({}, version {})",
        view.file.path,
        view.file.category(),
        view.file.version.short()
    );
    if let Some(revision) = &view.file.revision {
        header.push_str(&format!(" at {} [read-only]", revision.short()));
    }
    println!("{}", style(header).bold());

    match &view.preview {
        Preview::Text { text, .. } => print!("{}", text),
        Preview::Spreadsheet { workbook, .. } => {
            let names = workbook.sheet_names().join(", ");
            println!("{}", style(format!("Sheets: {}", names)).dim());
            let shown = workbook.sheet(sheet)?;
            println!("{}", style(format!("[{}]", shown.name)).cyan());
            print_grid(&shown.grid);
        }
        Preview::Unsupported { category, mime } => {
            println!("Preview is not supported for {} files ({})", category.name(), mime);
        }
        Preview::Missing => println!("File not found"),
        Preview::Error { message, .. } => {
            println!("{} {}", style("Preview failed:").red(), message);
        }
        Preview::None => {}
    }
    Ok(())
}

fn print_grid(grid: &SpreadsheetGrid) {
    for (index, row) in grid.rows.iter().enumerate() {
        let cells: Vec<String> = row.iter().map(|c| c.to_string()).collect();
        println!("{:>4}  {}", style(index + 1).dim(), cells.join("\t"));
    }
}

//! Search command - records and paths for one query.

use super::Context;
use anyhow::Result;
use console::style;
use learnvault_core::{CategoryFilter, SearchFilters, SortOrder};

pub async fn run(
    ctx: &Context,
    query: Option<&str>,
    tags: Vec<String>,
    category: Option<&str>,
    sort: SortOrder,
) -> Result<()> {
    let vault = ctx.loaded_vault().await?;

    let filters = SearchFilters {
        tags: tags.into_iter().collect(),
        category: category.unwrap_or("*").parse::<CategoryFilter>()?,
        sort,
    };
    println!("{}", style(vault.apply_filters(filters)).dim());

    let report = vault.query(query.unwrap_or(""));

    println!();
    println!(
        "{} ({})",
        style("Records").bold(),
        style(&report.record_message).cyan()
    );
    for record in &report.records {
        let id = record.id.map(|id| id.to_string()).unwrap_or_default();
        let tags = record.tags.iter().cloned().collect::<Vec<_>>().join(", ");
        println!(
            "  {:>5}  {}  {}",
            style(id).dim(),
            record.title,
            style(format!("[{}]", tags)).yellow()
        );
        if let Some(path) = &record.github_path {
            println!("         {}", style(path).dim());
        }
    }

    if !report.query.is_empty() {
        println!();
        println!(
            "{} ({})",
            style("Files").bold(),
            style(&report.file_message).cyan()
        );
        for path in &report.files {
            println!("  {}", path);
        }
    }

    Ok(())
}

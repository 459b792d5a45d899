//! LearnVault CLI - learning records linked to files in a hosted repository.

use clap::{Parser, Subcommand};
use console::style;
use learnvault_core::{SortOrder, VaultError};
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;

use commands::record::RecordFields;
use commands::Context;

#[derive(Parser)]
#[command(name = "learnvault")]
#[command(about = "Learning records backed by a versioned file repository", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, env = "LEARNVAULT_CONFIG", default_value = "learnvault.toml")]
    config: PathBuf,
    /// Repository credential (overrides the config file)
    #[arg(long, global = true, env = "LEARNVAULT_TOKEN", hide_env_values = true)]
    token: Option<String>,
    /// Use empty in-memory backends instead of the remote services
    #[arg(long, global = true)]
    offline: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Exchange an authorization code for a repository credential
    Login {
        /// Authorization code from the identity provider
        #[arg(long)]
        code: String,
    },
    /// Search records and repository paths
    Search {
        /// Freeform query (matches titles, bodies and paths)
        query: Option<String>,
        /// Required tag (repeatable; all must match)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
        /// Category name (default: every category; "*" also selects every category)
        #[arg(short, long)]
        category: Option<String>,
        /// Sort order (name-asc, name-desc)
        #[arg(long, default_value = "name-asc")]
        sort: SortOrder,
    },
    /// Repository file commands
    Files {
        #[command(subcommand)]
        command: FilesCommands,
    },
    /// Record commands
    Record {
        #[command(subcommand)]
        command: RecordCommands,
    },
    /// Category commands
    Category {
        #[command(subcommand)]
        command: CategoryCommands,
    },
}

#[derive(Subcommand)]
enum FilesCommands {
    /// List repository paths
    List {
        /// Case-insensitive path filter
        filter: Option<String>,
    },
    /// Show a file's preview
    Show {
        /// Repository path
        path: String,
        /// Revision to read (read-only)
        #[arg(long)]
        rev: Option<String>,
        /// Sheet index for spreadsheets
        #[arg(long, default_value = "0")]
        sheet: usize,
    },
}

#[derive(Subcommand)]
enum RecordCommands {
    /// Create a record
    New {
        /// Record title
        title: String,
        #[command(flatten)]
        fields: RecordFields,
    },
    /// Edit an existing record
    Edit {
        /// Record id
        id: i64,
        /// New title
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        fields: RecordFields,
    },
    /// Delete a record
    Delete {
        /// Record id
        id: i64,
    },
}

#[derive(Subcommand)]
enum CategoryCommands {
    /// Create a category
    Add {
        /// Category name
        name: String,
    },
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = Context::new(cli.config, cli.token, cli.offline);

    match cli.command {
        Commands::Login { code } => commands::login::run(&ctx, &code).await,
        Commands::Search {
            query,
            tags,
            category,
            sort,
        } => commands::search::run(&ctx, query.as_deref(), tags, category.as_deref(), sort).await,
        Commands::Files { command } => match command {
            FilesCommands::List { filter } => commands::files::list(&ctx, filter.as_deref()).await,
            FilesCommands::Show { path, rev, sheet } => {
                commands::files::show(&ctx, &path, rev.as_deref(), sheet).await
            }
        },
        Commands::Record { command } => match command {
            RecordCommands::New { title, fields } => {
                commands::record::create(&ctx, &title, &fields).await
            }
            RecordCommands::Edit { id, title, fields } => {
                commands::record::edit(&ctx, id, title.as_deref(), &fields).await
            }
            RecordCommands::Delete { id } => commands::record::delete(&ctx, id).await,
        },
        Commands::Category { command } => match command {
            CategoryCommands::Add { name } => commands::category::add(&ctx, &name).await,
        },
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Initialize tracing subscriber
    // Respects RUST_LOG environment variable (e.g., RUST_LOG=debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", style("error:").red().bold(), e);
            if let Some(hint) = e
                .chain()
                .find_map(|cause| cause.downcast_ref::<VaultError>())
                .and_then(VaultError::recovery_suggestion)
            {
                eprintln!("  {} {}", style("hint:").cyan(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

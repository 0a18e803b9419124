//! CLI for the migrate-dsl tool.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use migrate_dsl::prelude::*;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "migrate")]
#[command(author, version, about = "Composable source migrations for TypeScript and JavaScript", long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a migration over a directory or file
    Run {
        /// Path to migrate
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Name of a built-in migration
        #[arg(short, long, conflicts_with = "config", required_unless_present = "config")]
        migration: Option<String>,

        /// Migration config file (YAML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Preview changes without writing them
        #[arg(long)]
        dry_run: bool,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// List built-in migrations
    List,

    /// Show supported languages
    Languages,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::Run {
            path,
            migration,
            config,
            dry_run,
            format,
        } => cmd_run(path, migration, config, dry_run, format),
        Commands::List => cmd_list(),
        Commands::Languages => cmd_languages(),
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn cmd_run(
    path: PathBuf,
    migration: Option<String>,
    config: Option<PathBuf>,
    dry_run: bool,
    format: Format,
) -> Result<()> {
    let migration: Box<dyn Migration> = match (migration, config) {
        (_, Some(config)) => Box::new(
            ConfigBasedMigration::load(&config)
                .with_context(|| format!("Failed to load config {}", config.display()))?,
        ),
        (Some(name), None) => {
            let mut registry = MigrationRegistry::new();
            match registry.take(&name) {
                Some(migration) => migration,
                None => bail!(
                    "Unknown migration '{name}'; available: {}",
                    registry.names().join(", ")
                ),
            }
        }
        (None, None) => bail!("Either --migration or --config is required"),
    };

    let mut runner = Runner::in_dir(&path).boxed_migration(migration);
    if dry_run {
        runner = runner.dry_run();
    }

    let result = runner.run().context("Migration failed")?;

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        Format::Text => print_text(&result),
    }

    Ok(())
}

fn print_text(result: &RunResult) {
    if result.dry_run {
        println!("{}", result.colorized_diff());
    }

    for file in &result.files {
        match file.status {
            FileStatus::Unchanged | FileStatus::Transformed => {}
            FileStatus::PartiallyTransformed => {
                println!("{}: {}", file.path.display(), file.status);
                for diagnostic in &file.diagnostics {
                    println!("  {diagnostic}");
                }
                for failure in &file.failures {
                    println!("  {failure}");
                }
            }
            FileStatus::Failed => {
                println!(
                    "{}: failed: {}",
                    file.path.display(),
                    file.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
    }

    if result.dry_run {
        println!("\n{}", result.summary);
    } else {
        println!("Modified {} file(s)", result.files_modified());
    }
}

fn cmd_list() -> Result<()> {
    let registry = MigrationRegistry::new();
    println!("Available migrations:");
    for migration in registry.all() {
        println!("  {:<26} {}", migration.name(), migration.description());
    }
    Ok(())
}

fn cmd_languages() -> Result<()> {
    let registry = LanguageRegistry::new();
    println!("Supported languages:");
    for lang in registry.all() {
        println!(
            "  {} (extensions: {})",
            lang.name(),
            lang.extensions().join(", ")
        );
    }
    Ok(())
}

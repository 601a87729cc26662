//! Quarry - Modrinth plugin browser & installer
//!
//! Usage:
//!   quarry search worldedit          # Search the catalog
//!   quarry versions worldedit        # List compatible versions
//!   quarry install worldedit         # Download newest compatible + deps
//!   quarry installed                 # List downloaded files
//!   quarry remove worldedit.jar      # Delete a downloaded file

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use dialoguer::{Confirm, theme::ColorfulTheme};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quarry_core::prelude::*;

#[derive(Parser)]
#[command(name = "quarry")]
#[command(about = "Modrinth plugin browser & installer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the catalog for plugins
    Search {
        query: String,

        /// Restrict to a loader (repeatable); defaults come from config
        #[arg(long = "loader")]
        loaders: Vec<Loader>,

        /// Disable the loader filter entirely
        #[arg(long)]
        any_loader: bool,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show plugin details
    Show {
        /// Plugin id or slug
        plugin: String,
    },

    /// List versions compatible with the loader filter, newest first
    Versions {
        /// Plugin id or slug
        plugin: String,

        #[arg(long = "loader")]
        loaders: Vec<Loader>,

        #[arg(long)]
        any_loader: bool,

        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Download a plugin and its required dependencies
    Install {
        /// Plugin id or slug, optionally pinned as name@<version number>
        plugin: String,

        #[arg(long = "loader")]
        loaders: Vec<Loader>,

        #[arg(long)]
        any_loader: bool,

        /// Target plugins directory (defaults to ./plugins detection)
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// List downloaded plugin files
    Installed {
        #[arg(long)]
        dir: Option<PathBuf>,

        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Delete a downloaded plugin file
    #[command(alias = "rm")]
    Remove {
        /// Filename inside the plugins directory
        filename: String,

        #[arg(long)]
        dir: Option<PathBuf>,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quarry=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = QuarryConfig::load()?;
    let client = match config.api_url.clone() {
        Some(url) => ModrinthClient::with_base_url(url)?,
        None => ModrinthClient::new()?,
    };

    match cli.command {
        Commands::Search {
            query,
            loaders,
            any_loader,
            format,
        } => {
            let filter = loader_filter(&loaders, any_loader, &config);
            run_search(&client, &query, &filter, format).await
        }
        Commands::Show { plugin } => run_show(&client, &plugin).await,
        Commands::Versions {
            plugin,
            loaders,
            any_loader,
            format,
        } => {
            let filter = loader_filter(&loaders, any_loader, &config);
            run_versions(&client, &plugin, &filter, format).await
        }
        Commands::Install {
            plugin,
            loaders,
            any_loader,
            dir,
            yes,
        } => {
            let filter = loader_filter(&loaders, any_loader, &config);
            let target = plugins_dir(&config, dir.as_deref())?;
            run_install(&client, &plugin, &filter, &target, yes).await
        }
        Commands::Installed { dir, format } => {
            let target = plugins_dir(&config, dir.as_deref())?;
            run_installed(&target, format)
        }
        Commands::Remove { filename, dir, yes } => {
            let target = plugins_dir(&config, dir.as_deref())?;
            run_remove(&target, &filename, yes)
        }
    }
}

/// Explicit flags win over config defaults; `--any-loader` wins over both.
fn loader_filter(loaders: &[Loader], any_loader: bool, config: &QuarryConfig) -> LoaderFilter {
    if any_loader {
        LoaderFilter::Any
    } else if !loaders.is_empty() {
        LoaderFilter::any_of(loaders.iter().cloned())
    } else {
        LoaderFilter::any_of(config.default_loaders.iter().cloned())
    }
}

fn plugins_dir(config: &QuarryConfig, flag: Option<&Path>) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    let override_dir = flag.or(config.plugins_dir.as_deref());
    resolve_plugins_dir(&cwd, override_dir)
}

async fn run_search(
    client: &ModrinthClient,
    query: &str,
    filter: &LoaderFilter,
    format: OutputFormat,
) -> Result<()> {
    let hits = client.search(query, filter).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&hits)?),
        OutputFormat::Table => {
            if hits.is_empty() {
                println!("No results found.");
                return Ok(());
            }
            println!("{:<24} {:<16} {:>12}  Description", "Slug", "Author", "Downloads");
            println!("{}", "-".repeat(78));
            for hit in &hits {
                println!(
                    "{:<24} {:<16} {:>12}  {}",
                    hit.slug,
                    hit.author,
                    hit.downloads,
                    style(truncate(&hit.description, 48)).dim()
                );
            }
        }
    }
    Ok(())
}

async fn run_show(client: &ModrinthClient, plugin: &str) -> Result<()> {
    let details = client.get_plugin(plugin).await?;
    println!("{} ({})", style(&details.title).bold(), details.slug);
    println!("Downloads: {}", details.downloads);
    println!();
    println!("{}", details.display_text());
    Ok(())
}

async fn run_versions(
    client: &ModrinthClient,
    plugin: &str,
    filter: &LoaderFilter,
    format: OutputFormat,
) -> Result<()> {
    let details = client.get_plugin(plugin).await?;
    let versions = client.get_versions(&details.id).await?;
    let compatible = filter_by_loader(versions, filter);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&compatible)?),
        OutputFormat::Table => {
            if compatible.is_empty() {
                println!("No compatible versions.");
                return Ok(());
            }
            println!("{:<16} {:<24} {:<12} File", "Version", "Loaders", "Published");
            println!("{}", "-".repeat(78));
            for version in &compatible {
                let loaders: Vec<&str> = version.loaders.iter().map(|l| l.as_str()).collect();
                println!(
                    "{:<16} {:<24} {:<12} {}",
                    version.version_number,
                    loaders.join(", "),
                    version.date_published.format("%Y-%m-%d"),
                    version
                        .primary_file()
                        .map(|f| f.filename.as_str())
                        .unwrap_or("-")
                );
            }
        }
    }
    Ok(())
}

async fn run_install(
    client: &ModrinthClient,
    plugin_spec: &str,
    filter: &LoaderFilter,
    target: &Path,
    yes: bool,
) -> Result<()> {
    let (name, pinned) = match plugin_spec.split_once('@') {
        Some((name, version)) => (name, Some(version)),
        None => (plugin_spec, None),
    };

    // Only a failure fetching the chosen root version is fatal.
    let details = client.get_plugin(name).await?;
    let versions = client.get_versions(&details.id).await?;
    let compatible = filter_by_loader(versions, filter);
    let root = match pinned {
        Some(wanted) => compatible
            .into_iter()
            .find(|v| v.version_number == wanted || v.id == wanted)
            .with_context(|| {
                format!("No compatible version '{wanted}' of '{}' found", details.title)
            })?,
        None => compatible
            .into_iter()
            .next()
            .with_context(|| format!("No compatible version of '{}' found", details.title))?,
    };

    let resolver = DependencyResolver::new(client);
    let closure = resolver.resolve(root, filter).await?;

    println!(
        "Installing {} {} to {}",
        style(&details.title).bold(),
        closure.root().version.version_number,
        target.display()
    );
    for entry in &closure.entries {
        println!(
            "  {:<40} {}",
            entry.file.filename,
            human_size(entry.file.size)
        );
    }
    for optional in &closure.optional {
        println!(
            "  {} optional, not installed: {}",
            style("•").dim(),
            optional.label()
        );
    }
    for warning in &closure.warnings {
        println!("  {} {}", style("⚠").yellow(), warning);
    }

    if !yes {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Download {} file(s)?", closure.entries.len()))
            .default(true)
            .interact()?;
        if !confirmed {
            println!("Installation cancelled.");
            return Ok(());
        }
    }

    // Ctrl-C flips the token; the in-flight file records a failure and
    // remaining entries are not started.
    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let fetcher = HttpFetcher::new(client.http());
    let orchestrator = DownloadOrchestrator::new(&fetcher);
    let outcomes = orchestrator.download(&closure, target, &cancel).await;

    let mut failed = 0;
    for outcome in &outcomes {
        match &outcome.status {
            DownloadStatus::Success => {
                println!(
                    "{} {} ({})",
                    style("✓").green(),
                    outcome.filename,
                    human_size(outcome.bytes)
                );
            }
            DownloadStatus::SkippedExists => {
                println!("{} {} already exists, skipped", style("•").dim(), outcome.filename);
            }
            DownloadStatus::Failed { reason } => {
                failed += 1;
                println!("{} {} failed: {}", style("✗").red(), outcome.filename, reason);
            }
        }
    }
    if outcomes.len() < closure.entries.len() {
        println!(
            "{} download cancelled, {} file(s) not started",
            style("⚠").yellow(),
            closure.entries.len() - outcomes.len()
        );
    }

    if failed > 0 {
        bail!("{failed} download(s) failed");
    }
    Ok(())
}

#[derive(Serialize)]
struct InstalledFile {
    filename: String,
    size: u64,
}

fn run_installed(target: &Path, format: OutputFormat) -> Result<()> {
    let mut files = Vec::new();
    let entries = std::fs::read_dir(target)
        .with_context(|| format!("Failed to read plugins directory: {}", target.display()))?;
    for entry in entries {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        files.push(InstalledFile {
            filename: entry.file_name().to_string_lossy().into_owned(),
            size: metadata.len(),
        });
    }
    files.sort_by(|a, b| a.filename.cmp(&b.filename));

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&files)?),
        OutputFormat::Table => {
            if files.is_empty() {
                println!("No plugins in {}", target.display());
                return Ok(());
            }
            println!("{:<48} Size", "File");
            println!("{}", "-".repeat(60));
            for file in &files {
                println!("{:<48} {}", file.filename, human_size(file.size));
            }
        }
    }
    Ok(())
}

fn run_remove(target: &Path, filename: &str, yes: bool) -> Result<()> {
    if filename.contains('/') || filename.contains('\\') || filename == ".." {
        bail!("Invalid filename: {filename}");
    }
    let path = target.join(filename);
    if !path.is_file() {
        bail!("No such file: {}", path.display());
    }

    if !yes {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Delete {}?", path.display()))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Removal cancelled.");
            return Ok(());
        }
    }

    std::fs::remove_file(&path)
        .with_context(|| format!("Failed to delete {}", path.display()))?;
    println!("{} Deleted {}", style("✓").green(), path.display());
    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

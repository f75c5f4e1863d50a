//! tidesync - reconcile and transfer directory trees
//!
//! Compares a source tree against a target tree, plans the minimal set of
//! copies and container creations, and executes them with post-copy
//! verification. Entries present only at the target are never removed.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use tidesync_domain::LocalDomain;
use tidesync_engine::{SyncEngine, SyncRequest, TreeWalker, WalkOptions};
use tidesync_types::{ChangeReport, EntryKind, StorageDomain, TransferPolicy, WalkItem};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// tidesync - reconcile and transfer directory trees
#[derive(Parser)]
#[command(
    name = "tidesync",
    version = env!("CARGO_PKG_VERSION"),
    about = "One-way tree synchronization with integrity verification",
    long_about = "tidesync walks a source and a target tree, diffs them by size and\n\
                  checksum, and copies what differs. It never deletes anything at the\n\
                  target; extra entries there are left alone."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Quiet mode - minimal output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synchronize a source tree into a target tree
    Sync {
        /// Source directory
        source: PathBuf,
        /// Target directory
        target: PathBuf,
        /// Plan only, make no changes
        #[arg(long)]
        dry_run: bool,
        /// Replace target leaves that differ from the source
        #[arg(long)]
        overwrite: bool,
        /// Record recoverable failures and keep going
        #[arg(long)]
        ignore_errors: bool,
        /// Do not descend past this depth below the roots
        #[arg(long)]
        max_depth: Option<usize>,
        /// Recreate empty source directories at the target
        #[arg(long)]
        copy_empty_dirs: bool,
        /// Skip checksum comparison and post-copy verification
        #[arg(long)]
        no_verify: bool,
        /// Print the change report as JSON
        #[arg(long)]
        json: bool,
    },
    /// List a tree the way the sync walk sees it
    Tree {
        /// Directory to walk
        path: PathBuf,
        /// Do not descend past this depth below the root
        #[arg(long)]
        max_depth: Option<usize>,
    },
    /// Print the checksum of a single file
    Checksum {
        /// File to hash
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.debug, cli.quiet)?;

    match cli.command {
        Commands::Sync {
            source,
            target,
            dry_run,
            overwrite,
            ignore_errors,
            max_depth,
            copy_empty_dirs,
            no_verify,
            json,
        } => {
            let policy = TransferPolicy {
                overwrite,
                ignore_err: ignore_errors,
                max_depth,
                copy_empty_containers: copy_empty_dirs,
                dry_run,
                verify_checksum: !no_verify,
            };
            sync_command(source, target, policy, json, cli.quiet).await?;
        }
        Commands::Tree { path, max_depth } => {
            tree_command(path, max_depth).await?;
        }
        Commands::Checksum { path } => {
            checksum_command(path).await?;
        }
    }

    Ok(())
}

fn init_logging(debug: bool, quiet: bool) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if debug {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

async fn sync_command(
    source: PathBuf,
    target: PathBuf,
    policy: TransferPolicy,
    json: bool,
    quiet: bool,
) -> Result<()> {
    info!("syncing {} into {}", source.display(), target.display());

    if !quiet && !json {
        println!(
            "{} Syncing {} into {}{}",
            style("⟲").blue().bold(),
            style(source.display()).cyan(),
            style(target.display()).cyan(),
            if policy.dry_run {
                style(" (dry run)").yellow().to_string()
            } else {
                String::new()
            }
        );
    }

    let source_root = LocalDomain::sync_path(&source)
        .with_context(|| format!("invalid source path {}", source.display()))?;
    let target_root = LocalDomain::sync_path(&target)
        .with_context(|| format!("invalid target path {}", target.display()))?;

    let cancel = CancellationToken::new();
    let signal_guard = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_guard.cancel();
        }
    });

    let request = SyncRequest::new(
        Arc::new(LocalDomain::new(&source)),
        source_root,
        Arc::new(LocalDomain::new(&target)),
        target_root,
    )
    .with_policy(policy)
    .with_cancel(cancel);

    match SyncEngine::new().sync(request).await {
        Ok(report) => {
            print_report(&report, json, quiet)?;
            if report.cancelled {
                anyhow::bail!("sync cancelled");
            }
            Ok(())
        }
        Err(failure) => {
            print_report(&failure.report, json, quiet)?;
            Err(anyhow::Error::new(failure.error).context("sync aborted"))
        }
    }
}

async fn tree_command(path: PathBuf, max_depth: Option<usize>) -> Result<()> {
    let domain = LocalDomain::new(&path);
    let root = LocalDomain::sync_path(&path)
        .with_context(|| format!("invalid path {}", path.display()))?;

    let options = WalkOptions {
        max_depth,
        compute_checksums: false,
    };
    let mut walker = TreeWalker::open(&domain, &root, options).await?;
    while let Some(item) = walker.next_item().await {
        match item {
            WalkItem::Entry(entry) => {
                let marker = match entry.kind {
                    EntryKind::Container => style("dir ").blue(),
                    EntryKind::Leaf => style("file").green(),
                };
                println!("{} {:>10}  {}", marker, entry.size, entry.rel);
            }
            WalkItem::Unreadable { rel, reason } => {
                println!("{} {}: {}", style("!!").red().bold(), rel, reason);
            }
        }
    }
    Ok(())
}

async fn checksum_command(path: PathBuf) -> Result<()> {
    let domain = LocalDomain::new(path.parent().unwrap_or(&path));
    let sync_path = LocalDomain::sync_path(&path)
        .with_context(|| format!("invalid path {}", path.display()))?;
    let digest = domain.checksum(&sync_path).await?;
    println!("{digest}  {}", path.display());
    Ok(())
}

fn print_report(report: &ChangeReport, json: bool, quiet: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    if quiet {
        return Ok(());
    }

    if report.is_noop() {
        println!("{} Trees already in sync", style("✓").green());
        return Ok(());
    }

    println!();
    println!("{}", style("Change Report:").bold().underlined());
    println!(
        "  Directories created: {}",
        style(report.containers_created.len()).green()
    );
    println!("  Files copied: {}", style(report.copies.len()).green());
    println!(
        "  Bytes copied: {}",
        style(format_bytes(report.bytes_copied())).green()
    );
    println!("  Skipped: {}", style(report.skipped.len()).yellow());
    println!(
        "  Failures: {}",
        if report.failures.is_empty() {
            style(report.failures.len()).green()
        } else {
            style(report.failures.len()).red()
        }
    );
    for failure in &report.failures {
        println!("    {} {}: {}", style("✗").red(), failure.rel, failure.cause);
    }
    if report.cancelled {
        println!("  {}", style("Cancelled before completion").yellow().bold());
    }
    if report.dry_run {
        println!("  {}", style("Dry run - nothing was changed").yellow());
    }
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512.00 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn test_cli_parses_sync_flags() {
        let cli = Cli::try_parse_from([
            "tidesync",
            "sync",
            "/a",
            "/b",
            "--overwrite",
            "--max-depth",
            "3",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Commands::Sync {
                overwrite,
                max_depth,
                json,
                dry_run,
                ..
            } => {
                assert!(overwrite);
                assert_eq!(max_depth, Some(3));
                assert!(json);
                assert!(!dry_run);
            }
            _ => panic!("expected sync command"),
        }
    }
}

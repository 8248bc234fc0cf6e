//! `lft` CLI: build, query, and list filename indexes.

use clap::{Parser, Subcommand};
use lft::config::{ConfigLoader, ManagerConfig};
use lft::logging::init_logging;
use lft::manager::{persistence, Manager};
use lft::mount::{MountTable, SerialUri};
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "lft", about = "Fast filename search over mounted filesystems")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable logging output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the index for a directory and persist it to the cache
    Index { path: String },
    /// Search an indexed directory for matching filenames
    Search {
        path: String,
        keyword: String,
        /// Treat the keyword as a regular expression
        #[arg(long)]
        regex: bool,
    },
    /// List index roots found in the cache
    List,
}

fn main() {
    let cli = Cli::parse();

    let mut config = match ConfigLoader::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };
    if !cli.verbose {
        config.logging.level = "off".to_string();
    }
    if let Err(e) = init_logging(&config.logging) {
        eprintln!("error: {e}");
        process::exit(1);
    }

    match run(&cli.command, config) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{output}");
            }
        }
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

fn run(command: &Command, config: ManagerConfig) -> Result<String, Box<dyn std::error::Error>> {
    let mounts = Arc::new(MountTable::new());
    match command {
        Command::Index { path } => {
            let target = absolute(path)?;
            let serial = serial_for(&target)?;
            mounts.add(target.clone(), serial.clone());
            let manager = Manager::new(config, mounts)?;
            if manager.has_lft(&target) {
                // Reindexing replaces the cached copy.
                let _ = std::fs::remove_file(
                    manager.cache_dir().join(persistence::lft_file_name(&serial)),
                );
                manager.refresh(None);
            }
            let ticket = manager.add_path(&target)?;
            match ticket.wait() {
                Some(index) => {
                    let (files, dirs) = {
                        let guard = index.read();
                        (guard.file_count(), guard.dir_count())
                    };
                    info!(files, dirs, "Build finished");
                    if manager.sync(None).is_empty() {
                        return Err(format!("failed to persist index for {target}").into());
                    }
                    Ok(format!("indexed {target}: {files} files, {dirs} directories"))
                }
                None => Err(format!("failed to index {target}").into()),
            }
        }
        Command::Search { path, keyword, regex } => {
            let target = absolute(path)?;
            seed_cached_root(&config, &mounts, &target)?;
            let manager = Manager::new(config, mounts)?;
            if !manager.has_lft(&target) {
                return Err(format!("{target} is not indexed; run `lft index` first").into());
            }
            let results = manager.search(&target, keyword, *regex);
            Ok(results.join("\n"))
        }
        Command::List => {
            let cache = persistence::cache_dir(&config)?;
            let mut roots = Vec::new();
            for entry in std::fs::read_dir(&cache)? {
                let entry = entry?;
                let name = entry.file_name();
                let Some(name) = name.to_str() else { continue };
                if let Some(stem) = name.strip_suffix(".lft") {
                    roots.push(persistence::serial_from_file_stem(stem).to_string());
                }
            }
            roots.sort();
            Ok(roots.join("\n"))
        }
    }
}

fn absolute(path: &str) -> Result<String, Box<dyn std::error::Error>> {
    let canonical = std::fs::canonicalize(path)?;
    canonical
        .to_str()
        .map(|p| p.to_string())
        .ok_or_else(|| format!("path {path:?} is not valid UTF-8").into())
}

/// Serial URI for the device behind `path`, derived from its device id
/// plus the path itself so each indexed root maps to one cache file.
/// Separators are folded so the derived filename stays flat.
fn serial_for(path: &str) -> Result<SerialUri, std::io::Error> {
    let meta = std::fs::metadata(path)?;
    let flat = path.trim_start_matches('/').replace('/', "_");
    Ok(SerialUri::new(
        format!("dev:{}:{}", meta.dev(), flat).into_bytes(),
    ))
}

/// Walk `path` upward looking for an indexed ancestor in the cache and
/// register it as the mount point.
fn seed_cached_root(
    config: &ManagerConfig,
    mounts: &MountTable,
    path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let cache = persistence::cache_dir(config)?;
    let mut candidate = Path::new(path);
    loop {
        let text = candidate.to_str().unwrap_or("/");
        if let Ok(serial) = serial_for(text) {
            if cache.join(persistence::lft_file_name(&serial)).exists() {
                mounts.add(text, serial);
                return Ok(());
            }
        }
        match candidate.parent() {
            Some(parent) => candidate = parent,
            None => return Ok(()),
        }
    }
}

//! Cache management commands.

use crate::cli::args::CacheAction;
use crate::core::cache::{cache_key, fingerprint_file, CacheStore};
use crate::models::cache::Staleness;
use crate::Result;
use colored::Colorize;
use std::path::Path;

fn open(config_path: Option<&Path>, cache: Option<&Path>) -> Result<CacheStore> {
    let config = super::load_settings(config_path, cache)?;
    Ok(CacheStore::load(&config.cache_location, config.fingerprint_strategy))
}

fn describe(store: &CacheStore, source: &Path) -> colored::ColoredString {
    let staleness = match fingerprint_file(store.strategy(), source) {
        Ok(fp) => store.staleness(source, &fp),
        Err(_) => return "missing".red(),
    };
    match staleness {
        Staleness::Fresh => "fresh".green(),
        Staleness::NoEntry => "untracked".normal(),
        Staleness::Invalidated => "invalidated".yellow(),
        Staleness::FingerprintChanged => "changed".yellow(),
        Staleness::OutputMissing => "output missing".yellow(),
    }
}

/// Run a cache subcommand.
pub async fn cache(config_path: Option<&Path>, cache: Option<&Path>, action: &CacheAction) -> Result<()> {
    let mut store = open(config_path, cache)?;

    match action {
        CacheAction::List => {
            println!(
                "{} {} ({} entries)",
                "[CACHE]".bold().cyan(),
                store.path().display(),
                store.len()
            );
            if store.is_empty() {
                return Ok(());
            }
            println!();
            println!("{:<16} {:<22} {}", "STATUS", "CONVERTED", "SOURCE");
            for entry in store.entries() {
                println!(
                    "{:<16} {:<22} {}",
                    describe(&store, &entry.source_path),
                    entry.converted_at.format("%Y-%m-%d %H:%M:%S"),
                    entry.source_path.display()
                );
            }
            return Ok(());
        }
        CacheAction::Invalidate { path } => {
            let key = cache_key(path);
            if store.invalidate(&key) {
                println!("{} {}", "[INVALIDATED]".yellow(), key.display());
            } else {
                println!("{} no entry for {}", "[SKIP]".dimmed(), key.display());
            }
        }
        CacheAction::Prune => {
            let removed = store.prune_missing();
            println!("{} removed {} entries", "[PRUNE]".cyan(), removed);
        }
        CacheAction::Clear => {
            let count = store.len();
            store.clear();
            println!("{} removed {} entries", "[CLEAR]".cyan(), count);
        }
    }

    if store.is_dirty() {
        store.persist()?;
    }
    Ok(())
}

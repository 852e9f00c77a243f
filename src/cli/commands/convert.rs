//! Convert command implementation.

use crate::cli::args::ConvertArgs;
use crate::core::cache::CacheStore;
use crate::core::pipeline::Pipeline;
use crate::core::report;
use crate::core::scanner;
use crate::core::scheduler::Scheduler;
use crate::models::outcome::RunReport;
use crate::Result;
use colored::Colorize;
use std::path::Path;
use std::sync::atomic::Ordering;

/// Scan the library root and convert every NFO file found.
pub async fn convert(config_path: Option<&Path>, cache: Option<&Path>, args: &ConvertArgs) -> Result<RunReport> {
    let mut config = super::load_settings(config_path, cache)?;
    args.apply(&mut config);

    println!(
        "{} {}",
        "[CONVERT]".bold().cyan(),
        config.scan_root.display()
    );
    if config.dry_run {
        println!("{}", "[DRY-RUN] Nothing will be written.".yellow());
    }

    let scan = scanner::scan_directory(&config.scan_root, &config.exclude_dirs)?;
    println!(
        "  Found {} NFO files ({} files in {} directories, {} excluded)",
        scan.nfo_files.len().to_string().green(),
        scan.total_files_scanned,
        scan.total_dirs_scanned,
        scan.excluded_dirs.len()
    );

    let mut store = CacheStore::load(&config.cache_location, config.fingerprint_strategy);
    let scheduler = Scheduler::new(Pipeline::new(config)?).with_progress(!args.no_progress);

    let stop = scheduler.stop_handle();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing in-flight conversions");
            stop.store(true, Ordering::SeqCst);
        }
    });

    let result = scheduler.run_all(scan.nfo_files, &mut store).await;
    watcher.abort();
    let run = result?;

    report::print_summary(&run);
    if let Some(ref path) = args.report {
        report::save_report(&run, path)?;
        println!("  Report saved to {}", path.display());
    }

    Ok(run)
}

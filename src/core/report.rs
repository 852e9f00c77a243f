//! Run reporting: console summary and JSON report file.

use crate::models::outcome::{ConversionStatus, RenameOutcome, RunReport};
use crate::Result;
use colored::Colorize;
use std::path::Path;

/// Print a colored summary of a run.
pub fn print_summary(report: &RunReport) {
    let elapsed = report.finished_at - report.started_at;

    println!();
    if report.dry_run {
        println!("{}", "[DRY-RUN] No files were written.".bold().yellow());
    }
    println!("{}", "[SUMMARY]".bold().cyan());
    println!("  {} {}", "Files:".bold(), report.outcomes.len());
    println!(
        "  {} {}",
        "Converted:".bold(),
        report.converted_count().to_string().green()
    );
    println!("  {} {}", "Skipped:".bold(), report.skipped_count());
    let failed = report.failed_count();
    if failed > 0 {
        println!("  {} {}", "Failed:".bold(), failed.to_string().red());
    } else {
        println!("  {} {}", "Failed:".bold(), failed);
    }

    let planned = report
        .outcomes
        .iter()
        .filter(|o| matches!(o.rename, Some(RenameOutcome::Planned { .. })))
        .count();
    if report.renamed_count() > 0 || planned > 0 {
        println!(
            "  {} {}",
            "Renamed:".bold(),
            if report.dry_run { planned } else { report.renamed_count() }
        );
    }
    println!(
        "  {} {:.1}s",
        "Elapsed:".bold(),
        elapsed.num_milliseconds() as f64 / 1000.0
    );

    if failed > 0 {
        println!();
        println!("{}", "[FAILURES]".bold().red());
        for outcome in report.failures() {
            if let ConversionStatus::Failed { error } = &outcome.status {
                println!("  {} {}", outcome.source_path.display(), error.as_str().dimmed());
            }
        }
    }

    let rename_failures: Vec<_> = report
        .outcomes
        .iter()
        .filter_map(|o| match &o.rename {
            Some(RenameOutcome::Failed { error }) => Some((&o.source_path, error)),
            _ => None,
        })
        .collect();
    if !rename_failures.is_empty() {
        println!();
        println!("{}", "[RENAME FAILURES]".bold().yellow());
        for (path, error) in rename_failures {
            println!("  {} {}", path.display(), error.as_str().dimmed());
        }
    }
}

/// Save the run report as pretty JSON.
pub fn save_report(report: &RunReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    tracing::info!("Run report saved to {:?}", path);
    Ok(())
}

/// Load a run report written by [`save_report`].
pub fn load_report(path: &Path) -> Result<RunReport> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::outcome::ConversionOutcome;
    use chrono::Utc;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_report() {
        let temp_dir = TempDir::new().unwrap();
        let report = RunReport {
            run_id: "run-1".to_string(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            dry_run: false,
            outcomes: vec![
                ConversionOutcome::converted(PathBuf::from("/a.nfo"), PathBuf::from("/a.mkv.vsmeta"), false),
                ConversionOutcome::skipped(PathBuf::from("/b.nfo"), None, "up-to-date"),
                ConversionOutcome::failed(PathBuf::from("/c.nfo"), None, "Malformed NFO source: x"),
            ],
        };

        let path = temp_dir.path().join("reports").join("run.json");
        save_report(&report, &path).unwrap();

        let json = std::fs::read_to_string(&path).unwrap();
        assert!(json.contains("\"status\": \"skipped\""));
        assert!(json.contains("\"reason\": \"up-to-date\""));

        let loaded = load_report(&path).unwrap();
        assert_eq!(loaded.outcomes, report.outcomes);
        assert_eq!(loaded.failed_count(), 1);
    }
}

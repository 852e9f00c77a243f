//! Conversion outcomes and run reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Result status of converting one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ConversionStatus {
    /// Output was (or in dry-run, would be) written.
    Converted,
    /// Nothing to do.
    Skipped { reason: String },
    /// Conversion failed.
    Failed { error: String },
}

/// Result of the optional rename step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rename", rename_all = "snake_case")]
pub enum RenameOutcome {
    /// Media set renamed.
    Renamed { from: PathBuf, to: PathBuf },
    /// Dry-run: media set would be renamed.
    Planned { from: PathBuf, to: PathBuf },
    /// Current name already looks well-formed.
    WellFormed,
    /// No media file paired with the source.
    NoMediaFile,
    /// Rename failed; the conversion itself succeeded.
    Failed { error: String },
}

/// Outcome of converting one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionOutcome {
    /// Source (NFO) path as submitted.
    pub source_path: PathBuf,
    /// Status.
    #[serde(flatten)]
    pub status: ConversionStatus,
    /// Output path, when one was resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    /// Whether this was a dry run.
    #[serde(default)]
    pub dry_run: bool,
    /// Rename step result, when renaming is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rename: Option<RenameOutcome>,
}

impl ConversionOutcome {
    pub fn converted(source_path: PathBuf, output_path: PathBuf, dry_run: bool) -> Self {
        Self {
            source_path,
            status: ConversionStatus::Converted,
            output_path: Some(output_path),
            dry_run,
            rename: None,
        }
    }

    pub fn skipped<S: Into<String>>(
        source_path: PathBuf,
        output_path: Option<PathBuf>,
        reason: S,
    ) -> Self {
        Self {
            source_path,
            status: ConversionStatus::Skipped {
                reason: reason.into(),
            },
            output_path,
            dry_run: false,
            rename: None,
        }
    }

    pub fn failed<S: Into<String>>(
        source_path: PathBuf,
        output_path: Option<PathBuf>,
        error: S,
    ) -> Self {
        Self {
            source_path,
            status: ConversionStatus::Failed {
                error: error.into(),
            },
            output_path,
            dry_run: false,
            rename: None,
        }
    }

    /// Mark the outcome as belonging to a dry run (or not).
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn is_converted(&self) -> bool {
        matches!(self.status, ConversionStatus::Converted)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, ConversionStatus::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, ConversionStatus::Failed { .. })
    }
}

/// Aggregated result of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Run identifier.
    pub run_id: String,
    /// Start timestamp.
    pub started_at: DateTime<Utc>,
    /// Finish timestamp.
    pub finished_at: DateTime<Utc>,
    /// Whether this was a dry run.
    pub dry_run: bool,
    /// One outcome per submitted source.
    pub outcomes: Vec<ConversionOutcome>,
}

impl RunReport {
    pub fn converted_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_converted()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }

    pub fn renamed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.rename, Some(RenameOutcome::Renamed { .. })))
            .count()
    }

    /// Outcomes that failed.
    pub fn failures(&self) -> impl Iterator<Item = &ConversionOutcome> {
        self.outcomes.iter().filter(|o| o.is_failed())
    }
}

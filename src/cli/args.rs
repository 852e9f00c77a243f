//! Command line argument definitions.

use crate::codec::FormatEdition;
use crate::core::nfo_reader::RatingScale;
use crate::models::cache::FingerprintStrategy;
use crate::models::config::Config;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// nfo2vsmeta - Convert NFO sidecar metadata into VSMETA files
#[derive(Parser, Debug)]
#[command(name = "nfo2vsmeta")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (default: <config dir>/nfo2vsmeta/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Cache store location (overrides the configuration)
    #[arg(long, global = true, value_name = "FILE")]
    pub cache: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert every NFO file below a library root
    Convert(ConvertArgs),

    /// Decode a VSMETA file and print its fields
    Inspect {
        /// Path to the .vsmeta file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Print the decoded metadata as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage the conversion cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

/// Options for `convert`. Unset options keep their configured values.
#[derive(Args, Debug, Default)]
pub struct ConvertArgs {
    /// Library root to scan
    #[arg(value_name = "SCAN_ROOT")]
    pub scan_root: Option<PathBuf>,

    /// Write VSMETA files under this directory instead of next to the media
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Number of concurrent conversions (default: one per core)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Dry run - show what would be done
    #[arg(long)]
    pub dry_run: bool,

    /// Reconvert even when the cache says a file is up to date
    #[arg(long)]
    pub force: bool,

    /// Convert files whose output exists but is not in the cache
    #[arg(long)]
    pub no_skip_existing: bool,

    /// Rename media files after their metadata
    #[arg(long)]
    pub rename: bool,

    /// Rename template, e.g. "{title} ({year})"
    #[arg(long, value_name = "TEMPLATE")]
    pub template: Option<String>,

    /// Fingerprint strategy: content or metadata
    #[arg(long, value_name = "STRATEGY")]
    pub fingerprint: Option<FingerprintStrategy>,

    /// Output format edition: legacy, standard or utf16
    #[arg(long, value_name = "EDITION")]
    pub edition: Option<FormatEdition>,

    /// Source rating scale: five_point, auto or ten_point
    #[arg(long, value_name = "SCALE")]
    pub rating_scale: Option<RatingScale>,

    /// Save a JSON run report to this path
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl ConvertArgs {
    /// Apply command line overrides to a loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(ref root) = self.scan_root {
            config.scan_root = root.clone();
        }
        if let Some(ref dir) = self.output_dir {
            config.output_dir = Some(dir.clone());
        }
        if let Some(jobs) = self.jobs {
            config.concurrency = jobs;
        }
        if let Some(ref template) = self.template {
            config.rename_template = template.clone();
        }
        if let Some(strategy) = self.fingerprint {
            config.fingerprint_strategy = strategy;
        }
        if let Some(edition) = self.edition {
            config.codec.edition = edition;
        }
        if let Some(scale) = self.rating_scale {
            config.reader.rating_scale = scale;
        }
        config.dry_run |= self.dry_run;
        config.force |= self.force;
        config.rename_enabled |= self.rename;
        if self.no_skip_existing {
            config.skip_existing = false;
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List cache entries and whether they are still fresh
    List,

    /// Mark a source as needing reconversion
    Invalidate {
        /// Source NFO path
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// Drop entries whose source file no longer exists
    Prune,

    /// Remove every entry
    Clear,
}

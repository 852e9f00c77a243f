//! nfo2vsmeta CLI
//!
//! A command-line tool for converting NFO metadata into VSMETA files.

use clap::Parser;
use nfo2vsmeta::cli::{
    args::{Cli, Commands},
    commands::{cache, convert, inspect},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    let config_path = cli.config.as_deref();
    let cache_path = cli.cache.as_deref();

    match cli.command {
        Commands::Convert(args) => {
            let report = convert::convert(config_path, cache_path, &args).await?;
            if report.failed_count() > 0 {
                anyhow::bail!("{} files failed to convert", report.failed_count());
            }
        }

        Commands::Inspect { file, json } => {
            inspect::inspect(config_path, &file, json)?;
        }

        Commands::Cache { action } => {
            cache::cache(config_path, cache_path, &action).await?;
        }
    }

    Ok(())
}

/// Initialize the logging system.
fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("nfo2vsmeta=debug")
    } else {
        EnvFilter::new("nfo2vsmeta=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}

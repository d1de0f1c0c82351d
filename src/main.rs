//! Reports catalog tracks whose file is gone and media files the catalog does
//! not know about.

mod error;

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use exn::ResultExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tunecheck_config::Config;
use tunecheck_library::{CatalogOutcome, MediaFilter, Reconciler};

use crate::error::{ErrorKind, Result};

#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Read configuration from this file instead of the user config directory
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Catalog export to read, overriding the configured one
    #[arg(long, value_name = "FILE")]
    catalog: Option<PathBuf>,

    /// Media directory to walk, overriding the configured one
    #[arg(long, value_name = "DIR")]
    media: Option<PathBuf>,

    /// More log output; repeat for more detail
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn filter(verbose: u8) -> EnvFilter {
    let level = match verbose {
        0 => return EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    EnvFilter::new(level)
}

/// Command-line paths are relative to the working directory, not to the
/// library directory.
fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn run(cli: Cli) -> Result<CatalogOutcome> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    let catalog = cli.catalog.as_deref().map_or_else(|| config.catalog_path(), absolute);
    let media = cli.media.as_deref().map_or_else(|| config.media_path(), absolute);
    let filter = MediaFilter::new(&config.ignored_extensions, &config.bundle_extensions);

    let reconciler = Reconciler::new(catalog, media).with_filter(filter);
    tracing::info!(
        catalog = %reconciler.catalog().display(),
        media = %reconciler.media().display(),
        "Reconciling library"
    );
    let summary = reconciler
        .run(&mut io::stdout().lock(), &mut io::stderr().lock())
        .or_raise(|| ErrorKind::Reconcile)?;
    Ok(summary.outcome)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    tracing_subscriber::registry()
        .with(filter(cli.verbose))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match run(cli) {
        Ok(CatalogOutcome::Failed(_)) => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = ?err, "tunecheck failed");
            ExitCode::FAILURE
        },
    }
}

//! CLI entry point for the usersync tool.

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};
use usersync_core::{ChromeRenderer, Config, SessionStore, sync};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Args carry the password, so log selected fields rather than Debug.
    debug!(
        base_url = %args.base_url,
        session_file = %args.session_file.display(),
        output = %args.output.display(),
        "CLI arguments parsed"
    );
    info!("Usersync starting");

    let config = Config::new(
        &args.base_url,
        args.username,
        args.password,
        args.session_file,
        args.output,
    )?;

    let mut store = SessionStore::load(&config.session_file);
    let renderer = ChromeRenderer::new();

    let report = sync::run(&config, &mut store, &renderer).await?;

    info!(
        total = report.total,
        fetched = report.fetched,
        authenticated = report.authenticated,
        "Sync complete"
    );

    Ok(())
}

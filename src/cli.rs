//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use usersync_core::config::{
    DEFAULT_BASE_URL, DEFAULT_OUTPUT_FILE, DEFAULT_PASSWORD, DEFAULT_SESSION_FILE, DEFAULT_USERNAME,
};

/// Sync the user directory out of a legacy web app with no public API.
///
/// One run authenticates when needed, fetches the user list, scrapes the
/// current-user record from the rendered settings page, and writes the
/// combined list as pretty-printed JSON.
#[derive(Parser, Debug)]
#[command(name = "usersync")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Base URL of the legacy application
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Login username
    #[arg(long, default_value = DEFAULT_USERNAME)]
    pub username: String,

    /// Login password
    #[arg(long, default_value = DEFAULT_PASSWORD)]
    pub password: String,

    /// Session cookie file path
    #[arg(long, default_value = DEFAULT_SESSION_FILE)]
    pub session_file: PathBuf,

    /// Output file path for the combined user list
    #[arg(short, long, default_value = DEFAULT_OUTPUT_FILE)]
    pub output: PathBuf,
}

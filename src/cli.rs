//! Command-line interface definitions for Deliver Cute.
//!
//! Credentials are deliberately not flags; they come from the `USERNAME` and
//! `PASSWORD` environment variables (see [`crate::config`]).

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for a single delivery run.
///
/// # Examples
///
/// ```sh
/// # Scheduled run: mail everyone whose hour is now
/// deliver_cute --roster /etc/deliver_cute/roster.yaml
///
/// # Debug send of every board to one address
/// deliver_cute someone@example.com
///
/// # Seed the roster with the default boards
/// deliver_cute --seed
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Send a single debug digest to this address, ignoring delivery hours
    pub to_addr: Option<String>,

    /// Path to the YAML roster of boards and recipients
    #[arg(long, env = "DELIVER_CUTE_ROSTER", default_value = "roster.yaml")]
    pub roster: PathBuf,

    /// Maximum number of top posts to take from each board
    #[arg(long, default_value_t = 10)]
    pub limit: usize,

    /// Render digests and log them instead of sending mail
    #[arg(long)]
    pub dry_run: bool,

    /// Seed the roster with the default boards and a debug subscriber, then exit
    #[arg(long)]
    pub seed: bool,

    /// Identity string sent to the listing source
    #[arg(long, env = "DELIVER_CUTE_USER_AGENT")]
    pub user_agent: Option<String>,
}

//! # Deliver Cute
//!
//! Gathers the day's top image posts from a list of boards and emails each
//! subscriber a digest of the boards they follow, at the hour they chose.
//!
//! ## Usage
//!
//! ```sh
//! USERNAME=me@example.com PASSWORD=... deliver_cute --roster roster.yaml
//! ```
//!
//! Meant to be invoked once an hour by an external scheduler; each invocation
//! does a single pass and exits.
//!
//! ## Architecture
//!
//! 1. **Routing**: pick the recipients whose hour is now (US/Pacific)
//! 2. **Gathering**: fetch top-of-day posts for the union of their boards
//! 3. **Cleaning**: drop duplicate links, rewrite page links to direct images
//! 4. **Delivery**: filter, sort and render one digest per recipient, then mail it

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod boards;
mod cli;
mod config;
mod dedupe;
mod deliver;
mod error;
mod links;
mod models;
mod outputs;
mod retry;
mod roster;
mod router;
mod utils;

use boards::reddit::RedditListing;
use cli::Cli;
use config::Config;
use error::DeliveryError;
use links::HttpPages;
use outputs::mail::Transport;
use retry::RetryListing;
use roster::{YamlRoster, seed_roster_file};
use utils::build_http_client;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("deliver_cute starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // Credentials are checked before anything touches the network or disk
    let config = match Config::from_cli(&args) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Global security variables not set");
            return Err(e.into());
        }
    };
    debug!(?config, "Built configuration");

    if args.seed {
        let store = seed_roster_file(&config.roster_path, config.to_addr()).await?;
        info!(
            path = %config.roster_path.display(),
            boards = store.roster().boards.len(),
            recipients = store.roster().recipients.len(),
            "Roster seeded"
        );
        return Ok(());
    }

    let store = YamlRoster::load(&config.roster_path).await?;
    let client = build_http_client(&config.user_agent, config.http_timeout)?;
    let source = RetryListing::new(
        RedditListing::new(client.clone()),
        config.listing_retries,
        config.listing_base_delay,
    );
    let pages = HttpPages::new(client);
    let transport = Transport::from_config(&config)?;

    let now = chrono::Utc::now();
    let report = match deliver::run(&config, &store, &source, &pages, &transport, now).await {
        Ok(report) => report,
        Err(e) => {
            error!(delivered = 0, error = %e, "Delivery run aborted");
            return Err(e.into());
        }
    };

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        delivered = report.delivered,
        failed = report.failed,
        "Execution complete"
    );

    if report.failed > 0 {
        return Err(DeliveryError::PartialDelivery {
            delivered: report.delivered,
            failed: report.failed,
        }
        .into());
    }
    Ok(())
}

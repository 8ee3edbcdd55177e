//! Run configuration, built once at startup and passed by reference.
//!
//! Credentials are read from the environment; everything else comes from the
//! CLI or the constants below.

use crate::cli::Cli;
use crate::error::ConfigError;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "rust:deliver_cute:v0.2 (by /u/____OOOO____)";
pub const SMTP_HOST: &str = "smtp.gmail.com";
pub const SMTP_PORT: u16 = 587;
pub const FROM_NAME: &str = "Deliver Cute";
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(20);
pub const SMTP_TIMEOUT: Duration = Duration::from_secs(30);
pub const LISTING_RETRIES: usize = 3;
pub const LISTING_BASE_DELAY: Duration = Duration::from_secs(1);
pub const FETCH_CONCURRENCY: usize = 4;
const MAX_LIMIT: usize = 100;

/// Everything a run needs, with no ambient global state.
#[derive(Clone)]
pub struct Config {
    /// Mail account, also the sender address.
    pub username: String,
    pub password: String,
    /// Explicit debug recipient from the command line.
    pub debug_addr: Option<String>,
    pub roster_path: PathBuf,
    pub limit: usize,
    pub dry_run: bool,
    pub user_agent: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub from_name: String,
    pub http_timeout: Duration,
    pub smtp_timeout: Duration,
    pub listing_retries: usize,
    pub listing_base_delay: Duration,
    pub fetch_concurrency: usize,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("debug_addr", &self.debug_addr)
            .field("roster_path", &self.roster_path)
            .field("limit", &self.limit)
            .field("dry_run", &self.dry_run)
            .field("user_agent", &self.user_agent)
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Build from parsed CLI arguments and the process environment.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        Self::from_lookup(cli, |key| std::env::var(key).ok())
    }

    /// Build from CLI arguments and an arbitrary variable lookup.
    pub fn from_lookup<F>(cli: &Cli, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::MissingCredential(key))
        };
        let username = required("USERNAME")?;
        let password = required("PASSWORD")?;

        if cli.limit == 0 || cli.limit > MAX_LIMIT {
            return Err(ConfigError::Invalid {
                option: "--limit",
                reason: format!("{} is outside 1-{MAX_LIMIT}", cli.limit),
            });
        }

        Ok(Self {
            username,
            password,
            debug_addr: cli.to_addr.clone(),
            roster_path: cli.roster.clone(),
            limit: cli.limit,
            dry_run: cli.dry_run,
            user_agent: cli
                .user_agent
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            smtp_host: SMTP_HOST.to_string(),
            smtp_port: SMTP_PORT,
            from_name: FROM_NAME.to_string(),
            http_timeout: HTTP_TIMEOUT,
            smtp_timeout: SMTP_TIMEOUT,
            listing_retries: LISTING_RETRIES,
            listing_base_delay: LISTING_BASE_DELAY,
            fetch_concurrency: FETCH_CONCURRENCY,
        })
    }

    /// The address a debug digest goes to: the explicit one, else our own.
    pub fn to_addr(&self) -> &str {
        self.debug_addr.as_deref().unwrap_or(&self.username)
    }
}

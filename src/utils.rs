//! Utility functions for hour formatting, log truncation, HTTP client
//! construction and file system checks.

use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, instrument};

/// Format a 24-hour number as a 12-hour `H:00 AM/PM` label.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(format_hour(0), "12:00 AM");
/// assert_eq!(format_hour(13), "1:00 PM");
/// ```
pub fn format_hour(hour: u8) -> String {
    let twelve = match hour % 12 {
        0 => 12,
        h => h,
    };
    let meridiem = if hour < 12 { "AM" } else { "PM" };
    format!("{twelve}:00 {meridiem}")
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes (on a char boundary) with an
/// ellipsis and the number of dropped bytes appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Build the shared HTTP client used for listings and page fetches.
///
/// Every request gets the same identity string and the same upper bound on
/// total request time.
pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()
}

/// Create the directory that will hold `path` if it is missing.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub async fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).await?;
    debug!(dir = %parent.display(), "Roster directory ready");
    Ok(())
}

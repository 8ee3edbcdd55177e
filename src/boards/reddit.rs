//! Reddit board listing.
//!
//! Reads the public `top.json` listing of a subreddit with `t=day`, which
//! needs no OAuth session, only an identifying user agent. The response is a
//! `Listing` whose children each wrap a `t3` post object; we keep only the
//! fields the digest uses.
//!
//! # URL Pattern
//!
//! `https://www.reddit.com/r/{board}/top.json?t=day&limit={limit}&raw_json=1`
//!
//! `raw_json=1` stops Reddit from HTML-escaping titles and URLs itself, so
//! the renderer escapes exactly once.

use super::BoardSource;
use crate::error::DeliveryError;
use crate::models::Post;
use crate::utils::truncate_for_log;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

pub const REDDIT_BASE_URL: &str = "https://www.reddit.com";

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    data: PostData,
}

#[derive(Debug, Deserialize)]
struct PostData {
    subreddit: String,
    title: String,
    #[serde(default)]
    url: Option<String>,
    permalink: String,
    score: i64,
}

/// Board source backed by Reddit's public listing endpoint.
#[derive(Debug, Clone)]
pub struct RedditListing {
    client: Client,
    base_url: String,
}

impl RedditListing {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, REDDIT_BASE_URL)
    }

    pub fn with_base_url(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn listing_url(&self, board: &str, limit: usize) -> String {
        format!(
            "{}/r/{}/top.json?t=day&limit={}&raw_json=1",
            self.base_url,
            urlencoding::encode(board),
            limit
        )
    }
}

impl BoardSource for RedditListing {
    #[instrument(level = "info", skip(self), fields(source = "reddit"))]
    async fn top_of_day(&self, board: &str, limit: usize) -> Result<Vec<Post>, DeliveryError> {
        let url = self.listing_url(board, limit);
        let listing_err = |e: reqwest::Error| DeliveryError::Listing {
            board: board.to_string(),
            status: e.status().map(|s| s.as_u16()),
            reason: e.to_string(),
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(listing_err)?;
        let body = response.text().await.map_err(listing_err)?;
        debug!(bytes = body.len(), "Fetched listing");

        let posts = parse_listing(&body, limit).map_err(|e| {
            warn!(preview = %truncate_for_log(&body, 200), "Listing did not decode");
            DeliveryError::ListingDecode {
                board: board.to_string(),
                reason: e.to_string(),
            }
        })?;
        info!(count = posts.len(), "Listed top posts of the day");
        Ok(posts)
    }
}

/// Decode a listing body into posts, keeping at most `limit` entries.
///
/// Self posts without a link are skipped. Relative permalinks are made
/// absolute against the Reddit host.
fn parse_listing(body: &str, limit: usize) -> Result<Vec<Post>, serde_json::Error> {
    let listing: Listing = serde_json::from_str(body)?;
    Ok(listing
        .data
        .children
        .into_iter()
        .filter_map(|child| {
            let data = child.data;
            let url = data.url.filter(|u| !u.is_empty())?;
            let permalink = if data.permalink.starts_with('/') {
                format!("{REDDIT_BASE_URL}{}", data.permalink)
            } else {
                data.permalink
            };
            Some(Post {
                board: data.subreddit,
                permalink,
                url,
                title: data.title,
                score: data.score,
            })
        })
        .take(limit)
        .collect())
}

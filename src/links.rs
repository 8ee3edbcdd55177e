//! Media link normalization.
//!
//! Every post that reaches the renderer must carry a direct, absolute media
//! URL. For each post, in order:
//!
//! 1. protocol-relative links (`//host/path`) get an `http:` prefix
//! 2. video hosts are dropped
//! 3. animated clips we cannot display yet (`.gifv`, gfycat) are dropped
//! 4. direct media links pass through
//! 5. anything else is resolved by fetching the linking page and reading the
//!    `src` of the image inside `div.post-image`; failure drops the post
//!
//! Step 5 only understands imgur's page markup. Other hosts fail extraction
//! and their posts are dropped with a diagnostic.

use crate::error::DeliveryError;
use crate::models::Post;
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

static VIDEO_PAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(youtu\.be|youtube\.com|v\.redd\.it|vimeo\.com)").expect("video pattern")
});

static DIRECT_PAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^https?://i\.(imgur\.com|redd\.it|reddituploads\.com)/\S+",
    )
    .expect("direct media pattern")
});

static POST_IMAGE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.post-image img").expect("post image selector"));

/// What to do with a post's link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkAction {
    Drop(DropReason),
    /// Already a direct media link.
    Keep,
    /// Needs the linking page fetched and scraped.
    Resolve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Video,
    /// Formats the digest cannot display yet.
    AnimatedClip,
}

/// Links to streaming video hosts.
pub fn is_video_link(url: &str) -> bool {
    VIDEO_PAT.is_match(url)
}

/// `.gifv` links and gfycat pages.
pub fn is_animated_clip(url: &str) -> bool {
    url.to_ascii_lowercase().ends_with("gifv") || url.contains("gfycat")
}

/// Links served straight from a known image host.
///
/// The host alone decides: `i.reddituploads.com` links carry no file
/// extension, only a hash and query string.
pub fn is_direct_media(url: &str) -> bool {
    DIRECT_PAT.is_match(url)
}

/// Prefix protocol-relative links with `http:`.
pub fn fix_protocol(url: &str) -> String {
    match url.strip_prefix("//") {
        Some(rest) => format!("http://{rest}"),
        None => url.to_string(),
    }
}

/// Decide what to do with an already protocol-fixed link.
pub fn classify(url: &str) -> LinkAction {
    if is_video_link(url) {
        LinkAction::Drop(DropReason::Video)
    } else if is_animated_clip(url) {
        LinkAction::Drop(DropReason::AnimatedClip)
    } else if is_direct_media(url) {
        LinkAction::Keep
    } else {
        LinkAction::Resolve
    }
}

/// Pull the image `src` out of an imgur-style page.
pub fn find_source_link(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&POST_IMAGE)
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(str::trim)
        .filter(|src| !src.is_empty())
        .map(str::to_string)
}

/// Fetches a linking page's HTML.
pub trait PageFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String, DeliveryError>;
}

/// [`PageFetcher`] over a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpPages {
    client: Client,
}

impl HttpPages {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl PageFetcher for HttpPages {
    #[instrument(level = "debug", skip(self))]
    async fn fetch_page(&self, url: &str) -> Result<String, DeliveryError> {
        let fetch_err = |e: reqwest::Error| DeliveryError::PageFetch {
            url: url.to_string(),
            reason: e.to_string(),
        };
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(fetch_err)?;
        response.text().await.map_err(fetch_err)
    }
}

/// Resolve a linking page to the direct image it shows.
async fn resolve_link<F: PageFetcher>(fetcher: &F, page_url: &str) -> Option<String> {
    let html = match fetcher.fetch_page(page_url).await {
        Ok(html) => html,
        Err(e) => {
            warn!(url = %page_url, error = %e, "Error trying to get img src");
            return None;
        }
    };
    let Some(src) = find_source_link(&html) else {
        warn!(url = %page_url, "Error trying to get img src: no post image on page");
        return None;
    };

    let src = fix_protocol(&src);
    let absolute = match Url::parse(&src) {
        Ok(u) => u,
        Err(_) => match Url::parse(page_url).and_then(|base| base.join(&src)) {
            Ok(u) => u,
            Err(e) => {
                warn!(url = %page_url, %src, error = %e, "Image src is not a usable URL");
                return None;
            }
        },
    };
    if !matches!(absolute.scheme(), "http" | "https") {
        warn!(url = %page_url, src = %absolute, "Image src is not an http link");
        return None;
    }
    Some(absolute.to_string())
}

/// Normalize one post, returning `None` when it should be dropped.
pub async fn normalize_post<F: PageFetcher>(mut post: Post, fetcher: &F) -> Option<Post> {
    let link = fix_protocol(&post.url);
    let link = match classify(&link) {
        LinkAction::Drop(DropReason::Video) => {
            info!(url = %link, "Discarding video link");
            return None;
        }
        LinkAction::Drop(DropReason::AnimatedClip) => {
            debug!(url = %link, "Discarding animated clip");
            return None;
        }
        LinkAction::Keep => link,
        LinkAction::Resolve => {
            let resolved = resolve_link(fetcher, &link).await?;
            if let LinkAction::Drop(reason) = classify(&resolved) {
                debug!(url = %link, %resolved, ?reason, "Resolved link is not displayable");
                return None;
            }
            debug!(url = %link, %resolved, "Resolved direct link");
            resolved
        }
    };
    post.url = link;
    Some(post)
}

/// Normalize every post, keeping input order among survivors.
///
/// Up to `concurrency` linking pages are fetched at once. Failures never
/// propagate; the affected post is simply absent from the result.
#[instrument(level = "info", skip_all)]
pub async fn normalize_posts<I, F>(posts: I, fetcher: &F, concurrency: usize) -> Vec<Post>
where
    I: IntoIterator<Item = Post>,
    F: PageFetcher,
{
    let mut total = 0usize;
    let kept: Vec<Post> = stream::iter(posts.into_iter().inspect(|_| total += 1))
        .map(|post| normalize_post(post, fetcher))
        .buffered(concurrency.max(1))
        .filter_map(std::future::ready)
        .collect()
        .await;
    info!(total, kept = kept.len(), "Normalized media links");
    kept
}

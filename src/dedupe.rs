//! Duplicate post removal.

use crate::models::Post;
use std::collections::HashSet;
use tracing::debug;

/// Lazily drop posts whose `url` was already seen, keeping the first one.
///
/// Survivors keep their relative order. Duplicates are expected when
/// several boards cross-post the same image, so they are only traced.
pub fn dedupe_posts<I>(posts: I) -> impl Iterator<Item = Post>
where
    I: IntoIterator<Item = Post>,
{
    let mut seen = HashSet::new();
    posts.into_iter().filter(move |post| {
        let fresh = seen.insert(post.url.clone());
        if !fresh {
            debug!(url = %post.url, board = %post.board, "Omitting duplicate");
        }
        fresh
    })
}

//! Board listing sources and the post gatherer.
//!
//! A [`BoardSource`] answers one question: "what are the top N posts on
//! board B today?". [`gather_posts`] asks it for every board a run needs and
//! flattens the answers into one ordered pool.
//!
//! # Sources
//!
//! | Source | Module | Method |
//! |--------|--------|--------|
//! | Reddit | [`reddit`] | public `top.json` listing, `t=day` |
//!
//! Wrap a source in [`crate::retry::RetryListing`] to get backoff on
//! transient failures.

pub mod reddit;

use crate::error::DeliveryError;
use crate::models::Post;
use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, instrument};

/// Something that can list a board's top posts for the current day.
pub trait BoardSource {
    /// Fetch at most `limit` top posts of the day from `board`, best first.
    ///
    /// Fewer than `limit` posts, or none at all, is a normal answer.
    async fn top_of_day(&self, board: &str, limit: usize) -> Result<Vec<Post>, DeliveryError>;
}

/// Gather the top posts of every board in `boards`.
///
/// Boards are fetched up to `concurrency` at a time, but the result keeps
/// board order and each board's own ranking. A board that fails is logged
/// and skipped; if every board fails the listing source is considered
/// unreachable and the run has nothing to deliver.
#[instrument(level = "info", skip_all, fields(boards = boards.len(), limit = limit))]
pub async fn gather_posts<S: BoardSource>(
    source: &S,
    boards: &[String],
    limit: usize,
    concurrency: usize,
) -> Result<Vec<Post>, DeliveryError> {
    if boards.is_empty() {
        info!("No boards requested; nothing to gather");
        return Ok(Vec::new());
    }

    let results: Vec<(&String, Result<Vec<Post>, DeliveryError>)> = stream::iter(boards)
        .map(|board| async move { (board, source.top_of_day(board, limit).await) })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut posts = Vec::new();
    let mut failed = 0usize;
    for (board, result) in results {
        match result {
            Ok(batch) => {
                for post in &batch {
                    debug!(board = %post.board, url = %post.url, score = post.score, "Retrieved post");
                }
                posts.extend(batch);
            }
            Err(e) => {
                failed += 1;
                error!(board = %board, error = %e, "Skipping board");
            }
        }
    }

    if failed == boards.len() {
        return Err(DeliveryError::ListingUnreachable(failed));
    }

    info!(count = posts.len(), failed_boards = failed, "Gathered posts");
    Ok(posts)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// In-memory listing keyed by board name. Unknown boards fail.
    #[derive(Debug, Default)]
    pub(crate) struct FakeBoards {
        pub listings: HashMap<String, Vec<Post>>,
        pub calls: RefCell<Vec<(String, usize)>>,
    }

    impl FakeBoards {
        pub(crate) fn with(mut self, board: &str, posts: Vec<Post>) -> Self {
            self.listings.insert(board.to_string(), posts);
            self
        }
    }

    impl BoardSource for FakeBoards {
        async fn top_of_day(&self, board: &str, limit: usize) -> Result<Vec<Post>, DeliveryError> {
            self.calls.borrow_mut().push((board.to_string(), limit));
            match self.listings.get(board) {
                Some(posts) => Ok(posts.iter().take(limit).cloned().collect()),
                None => Err(DeliveryError::Listing {
                    board: board.to_string(),
                    status: Some(404),
                    reason: "no such board".into(),
                }),
            }
        }
    }

    pub(crate) fn post(board: &str, url: &str, score: i64) -> Post {
        Post {
            board: board.to_string(),
            permalink: format!("https://www.reddit.com/r/{board}/comments/{score}/"),
            url: url.to_string(),
            title: format!("{board} post scoring {score}"),
            score,
        }
    }

    fn names(boards: &[&str]) -> Vec<String> {
        boards.iter().map(|b| b.to_string()).collect()
    }

    #[tokio::test]
    async fn test_gather_flattens_in_board_order() {
        let source = FakeBoards::default()
            .with(
                "aww",
                vec![
                    post("aww", "https://i.imgur.com/a.jpg", 9),
                    post("aww", "https://i.imgur.com/b.jpg", 4),
                ],
            )
            .with(
                "Eyebleach",
                vec![post("Eyebleach", "https://i.imgur.com/c.jpg", 7)],
            );

        let posts = gather_posts(&source, &names(&["Eyebleach", "aww"]), 10, 4)
            .await
            .unwrap();
        let urls: Vec<_> = posts.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://i.imgur.com/c.jpg",
                "https://i.imgur.com/a.jpg",
                "https://i.imgur.com/b.jpg"
            ]
        );
    }

    #[tokio::test]
    async fn test_gather_passes_limit_and_tolerates_short_boards() {
        let source = FakeBoards::default()
            .with("aww", vec![post("aww", "https://i.imgur.com/a.jpg", 1)])
            .with("empty", vec![]);

        let posts = gather_posts(&source, &names(&["aww", "empty"]), 5, 1)
            .await
            .unwrap();
        assert_eq!(posts.len(), 1);
        assert!(source.calls.borrow().iter().all(|(_, limit)| *limit == 5));
    }

    #[tokio::test]
    async fn test_gather_skips_failed_board() {
        let source =
            FakeBoards::default().with("aww", vec![post("aww", "https://i.imgur.com/a.jpg", 1)]);
        let posts = gather_posts(&source, &names(&["missing", "aww"]), 10, 2)
            .await
            .unwrap();
        assert_eq!(posts.len(), 1);
    }

    #[tokio::test]
    async fn test_gather_all_boards_failing_is_fatal() {
        let source = FakeBoards::default();
        let err = gather_posts(&source, &names(&["x", "y"]), 10, 2)
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::ListingUnreachable(2)));
    }

    #[tokio::test]
    async fn test_gather_no_boards() {
        let source = FakeBoards::default();
        let posts = gather_posts(&source, &[], 10, 2).await.unwrap();
        assert!(posts.is_empty());
        assert!(source.calls.borrow().is_empty());
    }
}

//! One delivery run, end to end.
//!
//! ```text
//! recipients due now ─► union of their boards ─► gather ─► dedupe
//!     ─► normalize links ─► dedupe ─► per recipient: filter, sort, render, send
//! ```
//!
//! The post pool is materialized once and shared read-only by every
//! recipient. A failed send is logged and counted; the remaining recipients
//! still get their digests.

use crate::boards::{BoardSource, gather_posts};
use crate::config::Config;
use crate::dedupe::dedupe_posts;
use crate::error::DeliveryError;
use crate::links::{PageFetcher, normalize_posts};
use crate::models::Recipient;
use crate::outputs::digest::{email_body, email_subject};
use crate::outputs::mail::{Mailer, OutgoingDigest};
use crate::roster::RecipientStore;
use crate::router::{pacific_date, pacific_hour, recipients_due, relevant_posts};
use crate::utils::format_hour;
use chrono::{DateTime, Utc};
use tracing::{error, info, instrument};

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Recipients selected for this run.
    pub due: usize,
    /// Distinct boards gathered.
    pub boards: usize,
    /// Posts in the shared pool after normalization.
    pub posts: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Pick this run's recipients.
///
/// A debug address replaces the schedule with a single recipient following
/// every known board.
fn select_recipients<S: RecipientStore>(
    config: &Config,
    store: &S,
    now: DateTime<Utc>,
) -> Vec<Recipient> {
    match &config.debug_addr {
        Some(addr) => vec![Recipient {
            email: addr.clone(),
            send_hour: pacific_hour(now),
            boards: store.all_boards().into_iter().collect(),
        }],
        None => recipients_due(store, now),
    }
}

/// Run a full gather-and-deliver pass for `now`.
///
/// Returns `Err` only when nothing could be delivered at all (the listing
/// source was unreachable). Per-recipient send failures are reported in
/// [`DeliveryReport::failed`].
#[instrument(level = "info", skip_all, fields(hour = pacific_hour(now), debug = config.debug_addr.is_some()))]
pub async fn run<S, B, F, M>(
    config: &Config,
    store: &S,
    source: &B,
    pages: &F,
    mailer: &M,
    now: DateTime<Utc>,
) -> Result<DeliveryReport, DeliveryError>
where
    S: RecipientStore,
    B: BoardSource,
    F: PageFetcher,
    M: Mailer,
{
    let mut report = DeliveryReport::default();

    let recipients = select_recipients(config, store, now);
    if recipients.is_empty() {
        info!(
            hour = %format_hour(pacific_hour(now)),
            "No subscribers want cute delivered at this hour"
        );
        return Ok(report);
    }
    report.due = recipients.len();

    let boards = store.boards_for(&recipients);
    report.boards = boards.len();
    info!(recipients = report.due, boards = report.boards, "Starting delivery");

    let gathered = gather_posts(source, &boards, config.limit, config.fetch_concurrency).await?;
    let unique: Vec<_> = dedupe_posts(gathered).collect();
    let normalized = normalize_posts(unique, pages, config.fetch_concurrency).await;
    // two page links can resolve to the same image
    let pool: Vec<_> = dedupe_posts(normalized).collect();
    report.posts = pool.len();

    let subject = email_subject(pacific_date(now));
    for recipient in &recipients {
        let relevant = relevant_posts(&pool, recipient);
        let digest = OutgoingDigest {
            from_addr: config.username.clone(),
            from_name: config.from_name.clone(),
            to_addr: recipient.email.clone(),
            subject: subject.clone(),
            body: email_body(relevant.iter().copied()),
        };

        match mailer.send(&digest).await {
            Ok(()) => {
                report.delivered += 1;
                info!(to = %recipient.email, posts = relevant.len(), "Delivered digest");
            }
            Err(e) => {
                report.failed += 1;
                error!(to = %recipient.email, error = %e, "Delivery failed; continuing");
            }
        }
    }

    info!(
        due = report.due,
        delivered = report.delivered,
        failed = report.failed,
        posts = report.posts,
        "Delivery run finished"
    );
    Ok(report)
}

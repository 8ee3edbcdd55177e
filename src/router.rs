//! Decides who gets mail now, and what goes in each digest.
//!
//! Delivery hours are interpreted in US/Pacific regardless of the server's
//! own timezone.

use crate::models::{Post, Recipient};
use crate::roster::RecipientStore;
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use chrono_tz::US::Pacific;

/// Timezone all delivery hours refer to.
pub const REFERENCE_TZ: Tz = Pacific;

/// Hour of `now` on the reference clock.
pub fn pacific_hour(now: DateTime<Utc>) -> u8 {
    now.with_timezone(&REFERENCE_TZ).hour() as u8
}

/// Calendar date of `now` on the reference clock.
pub fn pacific_date(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&REFERENCE_TZ).date_naive()
}

/// Recipients whose preferred hour is the current reference hour.
pub fn recipients_due<S: RecipientStore + ?Sized>(store: &S, now: DateTime<Utc>) -> Vec<Recipient> {
    store.recipients_due(pacific_hour(now))
}

/// The posts `recipient` subscribed to, best score first.
///
/// The sort is stable, so equal scores keep their pool order.
pub fn relevant_posts<'a>(posts: &'a [Post], recipient: &Recipient) -> Vec<&'a Post> {
    let mut relevant: Vec<&Post> = posts
        .iter()
        .filter(|p| recipient.subscribes_to(&p.board))
        .collect();
    relevant.sort_by(|a, b| b.score.cmp(&a.score));
    relevant
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boards::tests::post;
    use crate::models::Roster;
    use crate::roster::YamlRoster;
    use chrono::TimeZone;

    fn recipient(email: &str, hour: u8, boards: &[&str]) -> Recipient {
        Recipient {
            email: email.into(),
            send_hour: hour,
            boards: boards.iter().map(|b| b.to_string()).collect(),
        }
    }

    #[test]
    fn test_pacific_hour_standard_time() {
        // 2026-01-15 16:30 UTC is 08:30 PST (UTC-8)
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 16, 30, 0).unwrap();
        assert_eq!(pacific_hour(now), 8);
    }

    #[test]
    fn test_pacific_hour_daylight_time() {
        // 2026-07-15 15:00 UTC is 08:00 PDT (UTC-7)
        let now = Utc.with_ymd_and_hms(2026, 7, 15, 15, 0, 0).unwrap();
        assert_eq!(pacific_hour(now), 8);
    }

    #[test]
    fn test_pacific_date_lags_utc_in_evening() {
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 3, 0, 0).unwrap();
        assert_eq!(pacific_date(now), NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());
    }

    #[test]
    fn test_recipients_due_uses_pacific_hour() {
        let roster = Roster {
            boards: vec!["aww".into()],
            recipients: vec![
                recipient("eight@example.com", 8, &["aww"]),
                recipient("sixteen@example.com", 16, &["aww"]),
            ],
        };
        let store = YamlRoster::new(roster).unwrap();
        // 16:00 UTC: a UTC-based check would pick "sixteen"
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 16, 0, 0).unwrap();
        let due = recipients_due(&store, now);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].email, "eight@example.com");
    }

    #[test]
    fn test_relevant_posts_filters_and_sorts() {
        let pool = vec![
            post("aww", "https://i.imgur.com/a.jpg", 5),
            post("Eyebleach", "https://i.imgur.com/b.jpg", 100),
            post("aww", "https://i.imgur.com/c.jpg", 9),
            post("aww", "https://i.imgur.com/d.jpg", 2),
        ];
        let r = recipient("a@example.com", 8, &["aww"]);
        let scores: Vec<_> = relevant_posts(&pool, &r).iter().map(|p| p.score).collect();
        assert_eq!(scores, vec![9, 5, 2]);
    }

    #[test]
    fn test_relevant_posts_ties_keep_pool_order() {
        let pool = vec![
            post("aww", "https://i.imgur.com/first.jpg", 7),
            post("kittengifs", "https://i.imgur.com/second.jpg", 7),
            post("aww", "https://i.imgur.com/third.jpg", 7),
        ];
        let r = recipient("a@example.com", 8, &["aww", "kittengifs"]);
        let urls: Vec<_> = relevant_posts(&pool, &r)
            .iter()
            .map(|p| p.url.as_str())
            .collect();
        assert_eq!(
            urls,
            vec![
                "https://i.imgur.com/first.jpg",
                "https://i.imgur.com/second.jpg",
                "https://i.imgur.com/third.jpg"
            ]
        );
    }

    #[test]
    fn test_relevant_posts_no_subscriptions() {
        let pool = vec![post("aww", "https://i.imgur.com/a.jpg", 5)];
        let r = recipient("a@example.com", 8, &[]);
        assert!(relevant_posts(&pool, &r).is_empty());
    }
}

//! Data models for posts, recipients and the persisted roster.
//!
//! - [`Post`]: one gathered entry, transient and in-memory only
//! - [`Recipient`]: an email address, a delivery hour and a set of boards
//! - [`Roster`]: the on-disk snapshot of boards and recipients

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Longest board display name the listing source accepts.
pub const MAX_BOARD_NAME_LEN: usize = 21;

/// A single post gathered from a board.
///
/// `url` starts out as whatever the post linked to and is rewritten in place
/// by the link normalizer. Deduplication keys on `url` as it stands at that
/// moment, not on any stable post id.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    /// Display name of the board the post came from.
    pub board: String,
    /// Absolute link to the discussion page on the board host.
    pub permalink: String,
    /// Media link, direct after normalization.
    pub url: String,
    pub title: String,
    pub score: i64,
}

/// A digest subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Recipient {
    pub email: String,
    /// Preferred local delivery hour, 0-23 in US/Pacific.
    #[serde(default = "default_send_hour")]
    pub send_hour: u8,
    /// Subscribed board names. May be empty.
    #[serde(default)]
    pub boards: BTreeSet<String>,
}

fn default_send_hour() -> u8 {
    8
}

impl Recipient {
    pub fn subscribes_to(&self, board: &str) -> bool {
        self.boards.contains(board)
    }
}

/// The persisted recipient/board snapshot.
///
/// Serialized as YAML:
///
/// ```yaml
/// boards:
///   - aww
///   - Eyebleach
/// recipients:
///   - email: someone@example.com
///     send_hour: 8
///     boards: [aww]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Roster {
    #[serde(default)]
    pub boards: Vec<String>,
    #[serde(default)]
    pub recipients: Vec<Recipient>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipient_defaults() {
        let recipient: Recipient = serde_yaml::from_str("email: a@example.com").unwrap();
        assert_eq!(recipient.send_hour, 8);
        assert!(recipient.boards.is_empty());
    }

    #[test]
    fn test_subscribes_to_is_exact_match() {
        let recipient = Recipient {
            email: "a@example.com".into(),
            send_hour: 0,
            boards: ["aww".to_string()].into_iter().collect(),
        };
        assert!(recipient.subscribes_to("aww"));
        assert!(!recipient.subscribes_to("awwgifs"));
        assert!(!recipient.subscribes_to("Aww"));
    }

    #[test]
    fn test_roster_deserialization() {
        let yaml = r#"
boards:
  - aww
  - Eyebleach
recipients:
  - email: a@example.com
    send_hour: 17
    boards: [aww, Eyebleach]
  - email: b@example.com
"#;
        let roster: Roster = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(roster.boards, vec!["aww", "Eyebleach"]);
        assert_eq!(roster.recipients.len(), 2);
        assert_eq!(roster.recipients[0].send_hour, 17);
        assert_eq!(roster.recipients[0].boards.len(), 2);
        assert_eq!(roster.recipients[1].send_hour, 8);
    }

    #[test]
    fn test_empty_roster() {
        let roster: Roster = serde_yaml::from_str("{}").unwrap();
        assert_eq!(roster, Roster::default());
    }
}

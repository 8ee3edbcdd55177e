//! Error types for the delivery pipeline.
//!
//! Three families, matching the three ways a run can go wrong:
//! - [`ConfigError`]: fatal at startup, raised before any I/O happens
//! - [`RosterError`]: the recipient store could not be read, validated or written
//! - [`DeliveryError`]: network and mail failures during a run
//!
//! Expected conditions (no due recipients, duplicate links, pages without a
//! resolvable image) are not errors at all; they are logged and skipped.

/// Startup configuration failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required credential variable is absent or empty.
    #[error("required environment variable {0} is not set")]
    MissingCredential(&'static str),

    /// A numeric option was out of range.
    #[error("invalid value for {option}: {reason}")]
    Invalid {
        option: &'static str,
        reason: String,
    },
}

/// Recipient store failures.
#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("failed to read roster {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write roster {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed roster: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("recipient {email} has send hour {hour}, expected 0-23")]
    InvalidHour { email: String, hour: u8 },

    #[error("board name {0:?} is empty or longer than 21 characters")]
    InvalidBoardName(String),

    #[error("board {0} is listed more than once")]
    DuplicateBoard(String),

    #[error("recipient {email} subscribes to unknown board {board}")]
    UnknownBoard { email: String, board: String },
}

/// Failures raised while gathering posts or delivering digests.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The board listing could not be fetched. `status` is the HTTP status
    /// when the server answered, `None` for timeouts and connection errors.
    #[error("listing for board {board} failed: {reason}")]
    Listing {
        board: String,
        status: Option<u16>,
        reason: String,
    },

    /// The listing was fetched but its body was not a listing.
    #[error("listing for board {board} did not decode: {reason}")]
    ListingDecode { board: String, reason: String },

    /// Every requested board failed; there is nothing to deliver.
    #[error("listing source unreachable: all {0} boards failed")]
    ListingUnreachable(usize),

    /// A linking page could not be fetched.
    #[error("failed to fetch page {url}: {reason}")]
    PageFetch { url: String, reason: String },

    /// Building or sending one recipient's message failed.
    #[error("mail to {to} failed: {reason}")]
    Mail { to: String, reason: String },

    /// The run finished but some recipients did not get their digest.
    #[error("delivered {delivered} digests, {failed} failed")]
    PartialDelivery { delivered: usize, failed: usize },
}

impl DeliveryError {
    /// Whether trying the same request again might succeed.
    ///
    /// Timeouts, connection errors, 429 and 5xx answers are transient. Other
    /// 4xx answers (private, banned or missing boards) and undecodable
    /// bodies are not.
    pub fn is_transient(&self) -> bool {
        match self {
            DeliveryError::Listing { status: None, .. } => true,
            DeliveryError::Listing {
                status: Some(code), ..
            } => *code == 429 || *code >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credential_names_variable() {
        let err = ConfigError::MissingCredential("PASSWORD");
        assert_eq!(
            err.to_string(),
            "required environment variable PASSWORD is not set"
        );
    }

    #[test]
    fn test_partial_delivery_reports_counts() {
        let err = DeliveryError::PartialDelivery {
            delivered: 3,
            failed: 1,
        };
        assert_eq!(err.to_string(), "delivered 3 digests, 1 failed");
    }

    #[test]
    fn test_roster_error_messages() {
        let err = RosterError::InvalidHour {
            email: "a@example.com".into(),
            hour: 24,
        };
        assert_eq!(
            err.to_string(),
            "recipient a@example.com has send hour 24, expected 0-23"
        );
    }

    fn listing(status: Option<u16>) -> DeliveryError {
        DeliveryError::Listing {
            board: "aww".into(),
            status,
            reason: "boom".into(),
        }
    }

    #[test]
    fn test_transient_listing_failures() {
        assert!(listing(None).is_transient());
        assert!(listing(Some(429)).is_transient());
        assert!(listing(Some(503)).is_transient());
        assert!(!listing(Some(403)).is_transient());
        assert!(!listing(Some(404)).is_transient());
        assert!(
            !DeliveryError::ListingDecode {
                board: "aww".into(),
                reason: "expected value".into(),
            }
            .is_transient()
        );
    }
}

//! Recipient/board store.
//!
//! The pipeline only ever reads a snapshot through [`RecipientStore`]. The
//! shipped implementation, [`YamlRoster`], keeps boards and recipients in a
//! single YAML file and validates it on load.

use crate::error::RosterError;
use crate::models::{MAX_BOARD_NAME_LEN, Recipient, Roster};
use crate::utils::ensure_parent_dir;
use itertools::Itertools;
use std::collections::HashSet;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, instrument};

/// Boards every fresh roster starts with.
pub const DEFAULT_BOARDS: [&str; 12] = [
    "StartledCats",
    "kittengifs",
    "gifsofotters",
    "Eyebleach",
    "babyelephantgifs",
    "babybigcatgifs",
    "awwgifs",
    "AnimalsBeingConfused",
    "AnimalsBeingDerps",
    "AnimalsBeingBros",
    "aww",
    "rarepuppers",
];

/// Hour the seeded debug subscriber receives mail.
pub const DEBUG_SEND_HOUR: u8 = 0;

/// Read-only access to recipients and the boards they follow.
pub trait RecipientStore {
    /// All recipients whose preferred hour equals `hour`.
    fn recipients_due(&self, hour: u8) -> Vec<Recipient>;

    /// Union of boards subscribed to by `recipients`, in first-seen order.
    fn boards_for(&self, recipients: &[Recipient]) -> Vec<String> {
        recipients
            .iter()
            .flat_map(|r| r.boards.iter().cloned())
            .unique()
            .collect()
    }

    /// Every board known to the store.
    fn all_boards(&self) -> Vec<String>;
}

/// A validated roster loaded from YAML.
#[derive(Debug, Clone, Default)]
pub struct YamlRoster {
    roster: Roster,
}

impl YamlRoster {
    /// Wrap an in-memory roster after validating it.
    pub fn new(roster: Roster) -> Result<Self, RosterError> {
        validate(&roster)?;
        Ok(Self { roster })
    }

    /// Load and validate the roster at `path`.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Result<Self, RosterError> {
        let text = fs::read_to_string(path)
            .await
            .map_err(|source| RosterError::Read {
                path: path.display().to_string(),
                source,
            })?;
        let roster = Self::new(serde_yaml::from_str(&text)?)?;
        info!(
            boards = roster.roster.boards.len(),
            recipients = roster.roster.recipients.len(),
            "Loaded roster"
        );
        Ok(roster)
    }

    /// Write the roster back to `path`.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn save(&self, path: &Path) -> Result<(), RosterError> {
        let yaml = serde_yaml::to_string(&self.roster)?;
        let write_err = |source| RosterError::Write {
            path: path.display().to_string(),
            source,
        };
        ensure_parent_dir(path).await.map_err(write_err)?;
        fs::write(path, yaml).await.map_err(write_err)?;
        info!("Saved roster");
        Ok(())
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }
}

impl RecipientStore for YamlRoster {
    fn recipients_due(&self, hour: u8) -> Vec<Recipient> {
        self.roster
            .recipients
            .iter()
            .filter(|r| r.send_hour == hour)
            .cloned()
            .collect()
    }

    fn all_boards(&self) -> Vec<String> {
        self.roster.boards.clone()
    }
}

fn validate(roster: &Roster) -> Result<(), RosterError> {
    let mut known = HashSet::new();
    for board in &roster.boards {
        if board.is_empty() || board.chars().count() > MAX_BOARD_NAME_LEN {
            return Err(RosterError::InvalidBoardName(board.clone()));
        }
        if !known.insert(board.as_str()) {
            return Err(RosterError::DuplicateBoard(board.clone()));
        }
    }

    for recipient in &roster.recipients {
        if recipient.send_hour > 23 {
            return Err(RosterError::InvalidHour {
                email: recipient.email.clone(),
                hour: recipient.send_hour,
            });
        }
        if let Some(board) = recipient.boards.iter().find(|b| !known.contains(b.as_str())) {
            return Err(RosterError::UnknownBoard {
                email: recipient.email.clone(),
                board: board.clone(),
            });
        }
    }
    Ok(())
}

/// Add the default boards and a debug subscriber to `roster`.
///
/// Existing boards and an existing subscriber with the same address are left
/// untouched. Returns how many boards were added and whether the debug
/// subscriber was created.
pub fn seed_roster(roster: &mut Roster, debug_email: &str) -> (usize, bool) {
    let mut added = 0;
    for name in DEFAULT_BOARDS {
        if roster.boards.iter().any(|b| b == name) {
            info!(board = name, "Board already in roster");
            continue;
        }
        roster.boards.push(name.to_string());
        added += 1;
    }

    let exists = roster.recipients.iter().any(|r| r.email == debug_email);
    if exists {
        debug!(email = %debug_email, "Debug subscriber already in roster");
    } else {
        roster.recipients.push(Recipient {
            email: debug_email.to_string(),
            send_hour: DEBUG_SEND_HOUR,
            boards: roster.boards.iter().cloned().collect(),
        });
    }
    (added, !exists)
}

/// Seed the roster file at `path`, creating it when missing.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn seed_roster_file(path: &Path, debug_email: &str) -> Result<YamlRoster, RosterError> {
    let exists = fs::try_exists(path)
        .await
        .map_err(|source| RosterError::Read {
            path: path.display().to_string(),
            source,
        })?;
    let mut roster = if exists {
        YamlRoster::load(path).await?.roster
    } else {
        Roster::default()
    };

    let (added, created) = seed_roster(&mut roster, debug_email);
    info!(boards_added = added, debug_subscriber_created = created, "Seeded roster");

    let store = YamlRoster::new(roster)?;
    store.save(path).await?;
    Ok(store)
}

//! Domain records shared by the session coordinator, the reward dispenser
//! and the wire protocol.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest accepted username, in characters.
pub const MAX_USERNAME_LEN: usize = 30;
/// Longest accepted lobby, sound or case name, in characters.
pub const MAX_NAME_LEN: usize = 50;
/// Longest accepted template description, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 200;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub i64);

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SoundId(pub i64);

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CaseId(pub i64);

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SoundTemplateId(pub i64);

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CaseTemplateId(pub i64);

/// Identifier of a lobby, handed out by the coordinator on creation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LobbyId(pub String);

/// Identifier of one live transport connection (one WebSocket).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub String);

impl LobbyId {
    pub fn fresh() -> Self {
        LobbyId(Uuid::new_v4().to_string())
    }
}

impl ConnectionId {
    pub fn fresh() -> Self {
        ConnectionId(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SoundTemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for CaseTemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for LobbyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

/// Drop tiers, ordered from most to least common.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub role: Role,
}

/// Public view of a lobby. `user_count` always equals the size of the
/// membership set held by the directory.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lobby {
    pub id: LobbyId,
    pub name: String,
    pub user_count: u32,
}

/// A playable sound owned by one user.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sound {
    pub id: SoundId,
    pub owner_id: UserId,
    pub name: String,
    pub file_path: String,
    pub rarity: Rarity,
    pub cooldown_secs: u32,
    pub last_used: Option<DateTime<Utc>>,
}

impl Sound {
    /// A sound stays locked while less than `cooldown_secs` has elapsed
    /// since the last play; at exactly `cooldown_secs` it is ready again.
    /// Never-played sounds are always ready.
    pub fn on_cooldown(&self, now: DateTime<Utc>) -> bool {
        match self.last_used {
            Some(last) => last + TimeDelta::seconds(i64::from(self.cooldown_secs)) > now,
            None => false,
        }
    }
}

/// Insertion payload for [`Sound`]; the store assigns the id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewSound {
    pub owner_id: UserId,
    pub name: String,
    pub file_path: String,
    pub rarity: Rarity,
    pub cooldown_secs: u32,
}

/// Blueprint a sound is minted from when a case is opened.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SoundTemplate {
    pub id: SoundTemplateId,
    pub name: String,
    pub description: String,
    pub rarity: Rarity,
    pub file_path: String,
    pub min_cooldown_secs: u32,
    pub max_cooldown_secs: u32,
}

impl SoundTemplate {
    /// Mint a fresh sound for `owner` with a uniformly drawn cooldown in
    /// `[min_cooldown_secs, max_cooldown_secs]` and no play history.
    pub fn mint_for<R: Rng + ?Sized>(&self, owner: UserId, rng: &mut R) -> NewSound {
        let cooldown_secs = rng.random_range(self.min_cooldown_secs..=self.max_cooldown_secs);
        NewSound {
            owner_id: owner,
            name: self.name.clone(),
            file_path: self.file_path.clone(),
            rarity: self.rarity,
            cooldown_secs,
        }
    }
}

/// One weighted entry of a case template's reward pool.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CaseSlot {
    pub sound_template: SoundTemplateId,
    pub weight: f64,
}

/// Blueprint a case is minted from, with its weighted reward pool.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CaseTemplate {
    pub id: CaseTemplateId,
    pub name: String,
    pub description: String,
    pub rarity: Rarity,
    pub slots: Vec<CaseSlot>,
}

impl CaseTemplate {
    pub fn mint_for(&self, owner: UserId) -> NewCase {
        NewCase {
            owner_id: owner,
            name: self.name.clone(),
            template_id: self.id,
        }
    }
}

/// An unopened case owned by one user.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Case {
    pub id: CaseId,
    pub owner_id: UserId,
    pub name: String,
    pub template_id: CaseTemplateId,
}

/// Insertion payload for [`Case`]; the store assigns the id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewCase {
    pub owner_id: UserId,
    pub name: String,
    pub template_id: CaseTemplateId,
}

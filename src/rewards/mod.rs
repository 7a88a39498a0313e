//! Reward flows: cooldown-gated sound plays, surprise case drops and
//! case opening.

pub mod draw;

use std::sync::{Arc, Mutex, MutexGuard};

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;

use crate::clock::Clock;
use crate::error::SessionError;
use crate::lobby::{MemberRef, SharedSessions};
use crate::model::{Case, CaseId, ConnectionId, Sound, SoundId, UserId};
use crate::store::Stores;

/// A sound play to announce: who played what, and the connections of
/// every lobby member including the player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SoundPlayed {
    pub connections: Vec<ConnectionId>,
    pub username: String,
    pub file_path: String,
}

/// A bonus case minted for one lobby member.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MintedCase {
    pub connection: ConnectionId,
    pub case: Case,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PlayOutcome {
    Played(SoundPlayed),
    /// The bonus roll hit: every lobby member received a case.
    CaseObtained {
        played: SoundPlayed,
        minted: Vec<MintedCase>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum OpenOutcome {
    Opened(Sound),
    /// The template's reward pool is empty; the case is kept.
    Empty,
}

/// Applies the reward rules on top of the session state and the stores.
pub struct RewardDispenser {
    sessions: SharedSessions,
    stores: Stores,
    clock: Arc<dyn Clock>,
    rng: Mutex<StdRng>,
    bonus_case_chance: f64,
    starter_cases: usize,
}

impl RewardDispenser {
    pub fn new(
        sessions: SharedSessions,
        stores: Stores,
        clock: Arc<dyn Clock>,
        bonus_case_chance: f64,
        starter_cases: usize,
    ) -> Self {
        Self {
            sessions,
            stores,
            clock,
            rng: Mutex::new(StdRng::from_os_rng()),
            bonus_case_chance,
            starter_cases,
        }
    }

    /// Replace the random source, for deterministic tests.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    fn rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Play a sound for the whole lobby of its owner.
    ///
    /// Fails `NotFound` for an unknown sound or an owner who is not in a
    /// lobby, `NotAllowed` for an active cooldown or a caller who does not
    /// own the sound. On success the cooldown stamp is persisted and, with
    /// `bonus_case_chance`, a surprise case is minted for every member.
    pub async fn play_sound(
        &self,
        sound_id: SoundId,
        caller: &ConnectionId,
    ) -> Result<PlayOutcome, SessionError> {
        let mut sound = match self.stores.sounds.get_by_id(sound_id).await? {
            Some(sound) => sound,
            None => {
                tracing::warn!(sound = %sound_id, "sound not found");
                return Err(SessionError::NotFound);
            }
        };
        let now = self.clock.now();
        if sound.on_cooldown(now) {
            tracing::info!(sound = %sound_id, "sound is on cooldown");
            return Err(SessionError::NotAllowed);
        }

        // Membership, ownership and the notification set must come from
        // one consistent snapshot.
        let members = {
            let state = self.sessions.read().await;
            let lobby_id = match state.lobby_of(sound.owner_id) {
                Some(id) => id.clone(),
                None => {
                    tracing::warn!(user_id = %sound.owner_id, "sound owner is not in any lobby");
                    return Err(SessionError::NotFound);
                }
            };
            if state.connections.user_id_for(caller) != Some(sound.owner_id) {
                tracing::warn!(
                    connection = %caller,
                    sound = %sound_id,
                    "caller does not own the sound"
                );
                return Err(SessionError::NotAllowed);
            }
            state.members_view(&lobby_id)
        };
        let username = match members.iter().find(|m| m.user_id == sound.owner_id) {
            Some(member) => member.username.clone(),
            None => {
                tracing::warn!(
                    user_id = %sound.owner_id,
                    "owner missing from their own lobby, this should never happen"
                );
                return Err(SessionError::NotFound);
            }
        };

        sound.last_used = Some(now);
        self.stores.sounds.save(sound.clone()).await?;

        let played = SoundPlayed {
            connections: members.iter().map(|m| m.connection.clone()).collect(),
            username,
            file_path: sound.file_path.clone(),
        };
        tracing::info!(sound = %sound_id, username = %played.username, "sound played");

        if self.roll_bonus() {
            let minted = self.mint_bonus_cases(&members).await?;
            if !minted.is_empty() {
                return Ok(PlayOutcome::CaseObtained { played, minted });
            }
        }
        Ok(PlayOutcome::Played(played))
    }

    fn roll_bonus(&self) -> bool {
        draw::hit_chance(&mut *self.rng(), self.bonus_case_chance)
    }

    /// Mint one case from a uniformly drawn template for every member.
    /// An empty catalog degrades to no drop.
    async fn mint_bonus_cases(
        &self,
        members: &[MemberRef],
    ) -> Result<Vec<MintedCase>, SessionError> {
        let templates = self.stores.case_templates.list_all().await?;
        let template = {
            let mut rng = self.rng();
            match templates.choose(&mut *rng) {
                Some(template) => template.clone(),
                None => {
                    tracing::warn!("bonus case triggered but the template catalog is empty");
                    return Ok(Vec::new());
                }
            }
        };

        let mut minted = Vec::with_capacity(members.len());
        for member in members {
            let case = self.stores.cases.add(template.mint_for(member.user_id)).await?;
            minted.push(MintedCase {
                connection: member.connection.clone(),
                case,
            });
        }
        tracing::info!(
            template = %template.id,
            count = minted.len(),
            "bonus cases minted for the lobby"
        );
        Ok(minted)
    }

    /// Open an owned case: draw a weighted slot, mint the sound and
    /// consume the case.
    pub async fn open_case(
        &self,
        case_id: CaseId,
        caller: UserId,
    ) -> Result<OpenOutcome, SessionError> {
        let case = match self.stores.cases.get_by_id(case_id).await? {
            Some(case) => case,
            None => {
                tracing::warn!(case = %case_id, "case not found");
                return Err(SessionError::NotFound);
            }
        };
        if case.owner_id != caller {
            tracing::warn!(case = %case_id, user_id = %caller, "caller does not own the case");
            return Err(SessionError::NotAllowed);
        }
        let template = match self.stores.case_templates.get_by_id(case.template_id).await? {
            Some(template) => template,
            None => {
                tracing::warn!(
                    template = %case.template_id,
                    "case template missing, this should never happen"
                );
                return Err(SessionError::NotFound);
            }
        };
        if template.slots.is_empty() {
            tracing::info!(case = %case_id, template = %template.id, "case has an empty reward pool");
            return Ok(OpenOutcome::Empty);
        }

        let slot = {
            let mut rng = self.rng();
            match draw::pick_weighted(&mut *rng, &template.slots, |s| s.weight) {
                Ok(slot) => slot.clone(),
                Err(err) => {
                    tracing::warn!(template = %template.id, error = %err, "reward pool is not drawable");
                    return Err(SessionError::NotFound);
                }
            }
        };
        let sound_template = match self
            .stores
            .sound_templates
            .get_by_id(slot.sound_template)
            .await?
        {
            Some(template) => template,
            None => {
                tracing::warn!(
                    sound_template = %slot.sound_template,
                    "slot references a missing sound template, this should never happen"
                );
                return Err(SessionError::NotFound);
            }
        };

        let minted = {
            let mut rng = self.rng();
            sound_template.mint_for(caller, &mut *rng)
        };
        let sound = self.stores.sounds.add(minted).await?;
        self.stores.cases.remove(case_id).await?;

        tracing::info!(case = %case_id, sound = %sound.id, rarity = ?sound.rarity, "case opened");
        Ok(OpenOutcome::Opened(sound))
    }

    /// Welcome gift for a fresh account: `starter_cases` cases, each from
    /// a uniformly drawn template. An empty catalog grants nothing.
    pub async fn grant_starter_cases(&self, user_id: UserId) -> Result<Vec<Case>, SessionError> {
        let templates = self.stores.case_templates.list_all().await?;
        if templates.is_empty() {
            tracing::warn!("no case templates exist, skipping starter cases");
            return Ok(Vec::new());
        }

        let mut granted = Vec::with_capacity(self.starter_cases);
        for _ in 0..self.starter_cases {
            let template = {
                let mut rng = self.rng();
                templates.choose(&mut *rng).cloned()
            };
            if let Some(template) = template {
                granted.push(self.stores.cases.add(template.mint_for(user_id)).await?);
            }
        }
        tracing::info!(user_id = %user_id, count = granted.len(), "starter cases granted");
        Ok(granted)
    }
}

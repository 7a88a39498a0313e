//! Storage ports for users, sounds, cases and their templates.
//!
//! The coordinator and dispenser only ever talk to these traits; the
//! bundled [`memory`] implementation backs them all in one process.

pub mod memory;

pub use memory::MemoryStore;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::model::{
    Case, CaseId, CaseTemplate, CaseTemplateId, NewCase, NewSound, Role, Sound, SoundId,
    SoundTemplate, SoundTemplateId, User, UserId,
};

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user with a fresh id. Fails if the username is taken.
    async fn add(&self, username: String, role: Role) -> Result<User>;
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>>;
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;
}

#[async_trait]
pub trait SoundStore: Send + Sync {
    async fn add(&self, sound: NewSound) -> Result<Sound>;
    async fn get_by_id(&self, id: SoundId) -> Result<Option<Sound>>;
    async fn list_by_owner(&self, owner: UserId) -> Result<Vec<Sound>>;
    /// Overwrite the stored record with `sound` (matched by id).
    async fn save(&self, sound: Sound) -> Result<()>;
}

#[async_trait]
pub trait SoundTemplateStore: Send + Sync {
    async fn get_by_id(&self, id: SoundTemplateId) -> Result<Option<SoundTemplate>>;
    async fn list_all(&self) -> Result<Vec<SoundTemplate>>;
}

#[async_trait]
pub trait CaseTemplateStore: Send + Sync {
    async fn get_by_id(&self, id: CaseTemplateId) -> Result<Option<CaseTemplate>>;
    async fn list_all(&self) -> Result<Vec<CaseTemplate>>;
}

#[async_trait]
pub trait CaseStore: Send + Sync {
    async fn add(&self, case: NewCase) -> Result<Case>;
    async fn get_by_id(&self, id: CaseId) -> Result<Option<Case>>;
    async fn list_by_owner(&self, owner: UserId) -> Result<Vec<Case>>;
    /// Delete the case; opening one consumes it.
    async fn remove(&self, id: CaseId) -> Result<()>;
}

/// Handles to every store, cheap to clone and hand to the transport layer.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub sounds: Arc<dyn SoundStore>,
    pub sound_templates: Arc<dyn SoundTemplateStore>,
    pub case_templates: Arc<dyn CaseTemplateStore>,
    pub cases: Arc<dyn CaseStore>,
}

impl Stores {
    /// Point every port at one shared in-memory store.
    pub fn from_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            users: store.clone(),
            sounds: store.clone(),
            sound_templates: store.clone(),
            case_templates: store.clone(),
            cases: store,
        }
    }
}

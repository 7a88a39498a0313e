//! Shared application state handed to every handler.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::RwLock;

use crate::clock::SystemClock;
use crate::config::Config;
use crate::lobby::{SessionCoordinator, SessionState, SharedSessions};
use crate::notify::NotificationPort;
use crate::rewards::RewardDispenser;
use crate::server::fanout::Fanout;
use crate::store::{MemoryStore, Stores};

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionCoordinator>,
    pub rewards: Arc<RewardDispenser>,
    pub stores: Stores,
    pub fanout: Fanout,
    pub notify: Arc<dyn NotificationPort>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Build the full state from configuration: validated settings, a
    /// seeded in-memory store, the coordinator and the dispenser, all
    /// sharing one session lock.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let memory = Arc::new(MemoryStore::from_seed(&config)?);
        let stores = Stores::from_memory(memory);

        let shared: SharedSessions = Arc::new(RwLock::new(SessionState::default()));
        let sessions = Arc::new(SessionCoordinator::new(shared.clone(), stores.users.clone()));
        let rewards = Arc::new(RewardDispenser::new(
            shared,
            stores.clone(),
            Arc::new(SystemClock),
            config.bonus_case_chance,
            config.starter_cases,
        ));

        let fanout = Fanout::new();
        let notify: Arc<dyn NotificationPort> = Arc::new(fanout.clone());

        Ok(Self {
            sessions,
            rewards,
            stores,
            fanout,
            notify,
            config: Arc::new(config),
        })
    }
}

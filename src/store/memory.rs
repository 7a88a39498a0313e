//! In-memory store backing every storage port, seeded from configuration.

use std::collections::{BTreeMap, HashMap, HashSet};

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::model::{
    Case, CaseId, CaseSlot, CaseTemplate, CaseTemplateId, NewCase, NewSound, Role, Sound, SoundId,
    SoundTemplate, SoundTemplateId, User, UserId, MAX_DESCRIPTION_LEN, MAX_NAME_LEN,
};
use crate::store::{CaseStore, CaseTemplateStore, SoundStore, SoundTemplateStore, UserStore};

#[derive(Debug)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    users_by_name: HashMap<String, UserId>,
    sounds: HashMap<SoundId, Sound>,
    cases: HashMap<CaseId, Case>,
    // BTreeMaps keep catalog listings in id order.
    sound_templates: BTreeMap<SoundTemplateId, SoundTemplate>,
    case_templates: BTreeMap<CaseTemplateId, CaseTemplate>,
    next_user: i64,
    next_sound: i64,
    next_case: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }

    /// Build a store pre-populated with the configured template catalog and
    /// admin accounts. Fails on duplicate names, unknown slot references,
    /// inverted cooldown ranges and out-of-range weights.
    pub fn from_seed(config: &Config) -> Result<Self> {
        let mut tables = Tables::default();
        let mut sound_template_ids: HashMap<&str, SoundTemplateId> = HashMap::new();

        for (i, seed) in config.sound_templates.iter().enumerate() {
            let id = SoundTemplateId(i as i64 + 1);
            check_catalog_names(&seed.name, &seed.description)?;
            if seed.min_cooldown_secs > seed.max_cooldown_secs {
                bail!(
                    "sound template '{}' has min cooldown above max ({} > {})",
                    seed.name,
                    seed.min_cooldown_secs,
                    seed.max_cooldown_secs
                );
            }
            if sound_template_ids.insert(seed.name.as_str(), id).is_some() {
                bail!("duplicate sound template name '{}'", seed.name);
            }
            tables.sound_templates.insert(
                id,
                SoundTemplate {
                    id,
                    name: seed.name.clone(),
                    description: seed.description.clone(),
                    rarity: seed.rarity,
                    file_path: seed.file.clone(),
                    min_cooldown_secs: seed.min_cooldown_secs,
                    max_cooldown_secs: seed.max_cooldown_secs,
                },
            );
        }

        let mut case_template_names = HashSet::new();
        for (i, seed) in config.case_templates.iter().enumerate() {
            let id = CaseTemplateId(i as i64 + 1);
            check_catalog_names(&seed.name, &seed.description)?;
            if !case_template_names.insert(seed.name.as_str()) {
                bail!("duplicate case template name '{}'", seed.name);
            }
            let mut slots = Vec::with_capacity(seed.slots.len());
            for slot in &seed.slots {
                let sound_template = match sound_template_ids.get(slot.sound_template.as_str()) {
                    Some(id) => *id,
                    None => bail!(
                        "case template '{}' references unknown sound template '{}'",
                        seed.name,
                        slot.sound_template
                    ),
                };
                if !slot.weight.is_finite() || slot.weight < 0.0 {
                    bail!(
                        "case template '{}' has an invalid weight for '{}'",
                        seed.name,
                        slot.sound_template
                    );
                }
                slots.push(CaseSlot {
                    sound_template,
                    weight: slot.weight,
                });
            }
            if !slots.is_empty() && slots.iter().map(|s| s.weight).sum::<f64>() <= 0.0 {
                bail!("case template '{}' has no drawable slot", seed.name);
            }
            tables.case_templates.insert(
                id,
                CaseTemplate {
                    id,
                    name: seed.name.clone(),
                    description: seed.description.clone(),
                    rarity: seed.rarity,
                    slots,
                },
            );
        }

        for username in &config.admin_users {
            let username = username.trim();
            if username.is_empty() || tables.users_by_name.contains_key(username) {
                continue;
            }
            tables.next_user += 1;
            let user = User {
                id: UserId(tables.next_user),
                username: username.to_owned(),
                role: Role::Admin,
            };
            tables.users_by_name.insert(user.username.clone(), user.id);
            tracing::info!(username = %user.username, user_id = %user.id, "admin user seeded");
            tables.users.insert(user.id, user);
        }

        tracing::info!(
            sound_templates = tables.sound_templates.len(),
            case_templates = tables.case_templates.len(),
            "template catalog loaded"
        );
        Ok(Self {
            tables: RwLock::new(tables),
        })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn check_catalog_names(name: &str, description: &str) -> Result<()> {
    if name.trim().is_empty() || name.chars().count() > MAX_NAME_LEN {
        bail!("catalog name '{name}' must be 1..={MAX_NAME_LEN} characters");
    }
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        bail!("description of '{name}' exceeds {MAX_DESCRIPTION_LEN} characters");
    }
    Ok(())
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn add(&self, username: String, role: Role) -> Result<User> {
        let mut tables = self.tables.write().await;
        if tables.users_by_name.contains_key(&username) {
            bail!("username '{username}' is already taken");
        }
        tables.next_user += 1;
        let user = User {
            id: UserId(tables.next_user),
            username,
            role,
        };
        tables.users_by_name.insert(user.username.clone(), user.id);
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users_by_name
            .get(username)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }
}

#[async_trait]
impl SoundStore for MemoryStore {
    async fn add(&self, sound: NewSound) -> Result<Sound> {
        let mut tables = self.tables.write().await;
        tables.next_sound += 1;
        let sound = Sound {
            id: SoundId(tables.next_sound),
            owner_id: sound.owner_id,
            name: sound.name,
            file_path: sound.file_path,
            rarity: sound.rarity,
            cooldown_secs: sound.cooldown_secs,
            last_used: None,
        };
        tables.sounds.insert(sound.id, sound.clone());
        Ok(sound)
    }

    async fn get_by_id(&self, id: SoundId) -> Result<Option<Sound>> {
        Ok(self.tables.read().await.sounds.get(&id).cloned())
    }

    async fn list_by_owner(&self, owner: UserId) -> Result<Vec<Sound>> {
        let tables = self.tables.read().await;
        let mut sounds: Vec<Sound> = tables
            .sounds
            .values()
            .filter(|s| s.owner_id == owner)
            .cloned()
            .collect();
        sounds.sort_by_key(|s| s.id);
        Ok(sounds)
    }

    async fn save(&self, sound: Sound) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.sounds.contains_key(&sound.id) {
            bail!("sound {} does not exist", sound.id);
        }
        tables.sounds.insert(sound.id, sound);
        Ok(())
    }
}

#[async_trait]
impl SoundTemplateStore for MemoryStore {
    async fn get_by_id(&self, id: SoundTemplateId) -> Result<Option<SoundTemplate>> {
        Ok(self.tables.read().await.sound_templates.get(&id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<SoundTemplate>> {
        Ok(self
            .tables
            .read()
            .await
            .sound_templates
            .values()
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CaseTemplateStore for MemoryStore {
    async fn get_by_id(&self, id: CaseTemplateId) -> Result<Option<CaseTemplate>> {
        Ok(self.tables.read().await.case_templates.get(&id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<CaseTemplate>> {
        Ok(self
            .tables
            .read()
            .await
            .case_templates
            .values()
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CaseStore for MemoryStore {
    async fn add(&self, case: NewCase) -> Result<Case> {
        let mut tables = self.tables.write().await;
        tables.next_case += 1;
        let case = Case {
            id: CaseId(tables.next_case),
            owner_id: case.owner_id,
            name: case.name,
            template_id: case.template_id,
        };
        tables.cases.insert(case.id, case.clone());
        Ok(case)
    }

    async fn get_by_id(&self, id: CaseId) -> Result<Option<Case>> {
        Ok(self.tables.read().await.cases.get(&id).cloned())
    }

    async fn list_by_owner(&self, owner: UserId) -> Result<Vec<Case>> {
        let tables = self.tables.read().await;
        let mut cases: Vec<Case> = tables
            .cases
            .values()
            .filter(|c| c.owner_id == owner)
            .cloned()
            .collect();
        cases.sort_by_key(|c| c.id);
        Ok(cases)
    }

    async fn remove(&self, id: CaseId) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.cases.remove(&id).is_none() {
            bail!("case {id} does not exist");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CaseSlotSeed, CaseTemplateSeed, SoundTemplateSeed};
    use crate::model::Rarity;

    fn seed_config() -> Config {
        let mut config = Config::default();
        config.sound_templates = vec![
            SoundTemplateSeed {
                name: "airhorn".into(),
                description: "classic".into(),
                rarity: Rarity::Common,
                file: "airhorn.ogg".into(),
                min_cooldown_secs: 10,
                max_cooldown_secs: 20,
            },
            SoundTemplateSeed {
                name: "fanfare".into(),
                description: "brass".into(),
                rarity: Rarity::Legendary,
                file: "fanfare.ogg".into(),
                min_cooldown_secs: 60,
                max_cooldown_secs: 120,
            },
        ];
        config.case_templates = vec![CaseTemplateSeed {
            name: "starter".into(),
            description: "two slots".into(),
            rarity: Rarity::Common,
            slots: vec![
                CaseSlotSeed {
                    sound_template: "airhorn".into(),
                    weight: 90.0,
                },
                CaseSlotSeed {
                    sound_template: "fanfare".into(),
                    weight: 10.0,
                },
            ],
        }];
        config.admin_users = vec!["admin".into()];
        config
    }

    #[tokio::test]
    async fn seed_resolves_slot_references_in_order() {
        let store = MemoryStore::from_seed(&seed_config()).unwrap();

        let templates = CaseTemplateStore::list_all(&store).await.unwrap();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].slots[0].sound_template, SoundTemplateId(1));
        assert_eq!(templates[0].slots[1].sound_template, SoundTemplateId(2));

        let admin = store.get_by_username("admin").await.unwrap().unwrap();
        assert_eq!(admin.role, Role::Admin);
    }

    #[tokio::test]
    async fn seed_rejects_unknown_slot_reference() {
        let mut config = seed_config();
        config.case_templates[0].slots[0].sound_template = "missing".into();

        let err = MemoryStore::from_seed(&config).unwrap_err();
        assert!(err.to_string().contains("unknown sound template"));
    }

    #[tokio::test]
    async fn seed_rejects_inverted_cooldown_range() {
        let mut config = seed_config();
        config.sound_templates[0].min_cooldown_secs = 30;
        config.sound_templates[0].max_cooldown_secs = 10;

        assert!(MemoryStore::from_seed(&config).is_err());
    }

    #[tokio::test]
    async fn usernames_are_unique() {
        let store = MemoryStore::new();
        UserStore::add(&store, "alice".into(), Role::User)
            .await
            .unwrap();

        assert!(UserStore::add(&store, "alice".into(), Role::User)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn ids_are_assigned_sequentially() {
        let store = MemoryStore::new();
        let alice = UserStore::add(&store, "alice".into(), Role::User)
            .await
            .unwrap();
        let bob = UserStore::add(&store, "bob".into(), Role::User)
            .await
            .unwrap();

        assert_eq!(alice.id, UserId(1));
        assert_eq!(bob.id, UserId(2));
    }

    #[tokio::test]
    async fn opening_flow_removes_cases() {
        let store = MemoryStore::new();
        let case = CaseStore::add(
            &store,
            NewCase {
                owner_id: UserId(1),
                name: "starter".into(),
                template_id: CaseTemplateId(1),
            },
        )
        .await
        .unwrap();

        store.remove(case.id).await.unwrap();
        assert!(CaseStore::get_by_id(&store, case.id)
            .await
            .unwrap()
            .is_none());
        assert!(store.remove(case.id).await.is_err());
    }

    #[tokio::test]
    async fn save_requires_existing_sound() {
        let store = MemoryStore::new();
        let sound = SoundStore::add(
            &store,
            NewSound {
                owner_id: UserId(1),
                name: "airhorn".into(),
                file_path: "airhorn.ogg".into(),
                rarity: Rarity::Common,
                cooldown_secs: 10,
            },
        )
        .await
        .unwrap();

        let mut stamped = sound.clone();
        stamped.last_used = Some(chrono::Utc::now());
        store.save(stamped.clone()).await.unwrap();
        assert_eq!(
            SoundStore::get_by_id(&store, sound.id).await.unwrap(),
            Some(stamped)
        );

        let mut ghost = sound;
        ghost.id = SoundId(99);
        assert!(store.save(ghost).await.is_err());
    }
}

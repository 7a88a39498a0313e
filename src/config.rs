//! Server configuration, persisted as TOML next to the binary.
//!
//! The file doubles as the content catalog: sound and case templates are
//! declared here and loaded into the store at startup. Case slots refer
//! to sound templates by name; references are resolved when the store is
//! seeded.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::Rarity;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Chance in `[0, 1]` that a sound play drops a bonus case for the
    /// whole lobby.
    pub bonus_case_chance: f64,
    /// Cases granted to every freshly registered user.
    pub starter_cases: usize,
    /// Directory served under `/media`; sound file paths are relative
    /// to it.
    pub media_dir: PathBuf,
    /// Usernames seeded as admin accounts at startup.
    pub admin_users: Vec<String>,
    #[serde(default)]
    pub sound_templates: Vec<SoundTemplateSeed>,
    #[serde(default)]
    pub case_templates: Vec<CaseTemplateSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoundTemplateSeed {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub rarity: Rarity,
    /// File name under `media_dir`.
    pub file: String,
    pub min_cooldown_secs: u32,
    pub max_cooldown_secs: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseTemplateSeed {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub rarity: Rarity,
    pub slots: Vec<CaseSlotSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseSlotSeed {
    /// Name of a `[[sound_templates]]` entry.
    pub sound_template: String,
    pub weight: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bonus_case_chance: 0.15,
            starter_cases: 2,
            media_dir: PathBuf::from("media"),
            admin_users: vec!["admin".to_string()],
            sound_templates: vec![
                SoundTemplateSeed {
                    name: "Airhorn".into(),
                    description: "The classic".into(),
                    rarity: Rarity::Common,
                    file: "airhorn.ogg".into(),
                    min_cooldown_secs: 30,
                    max_cooldown_secs: 120,
                },
                SoundTemplateSeed {
                    name: "Sad Trombone".into(),
                    description: "Wah wah wah waaah".into(),
                    rarity: Rarity::Uncommon,
                    file: "sad-trombone.ogg".into(),
                    min_cooldown_secs: 60,
                    max_cooldown_secs: 240,
                },
                SoundTemplateSeed {
                    name: "Fanfare".into(),
                    description: "Full brass, no mercy".into(),
                    rarity: Rarity::Legendary,
                    file: "fanfare.ogg".into(),
                    min_cooldown_secs: 300,
                    max_cooldown_secs: 900,
                },
            ],
            case_templates: vec![CaseTemplateSeed {
                name: "Starter Case".into(),
                description: "A bit of everything".into(),
                rarity: Rarity::Common,
                slots: vec![
                    CaseSlotSeed {
                        sound_template: "Airhorn".into(),
                        weight: 70.0,
                    },
                    CaseSlotSeed {
                        sound_template: "Sad Trombone".into(),
                        weight: 25.0,
                    },
                    CaseSlotSeed {
                        sound_template: "Fanfare".into(),
                        weight: 5.0,
                    },
                ],
            }],
        }
    }
}

impl Config {
    /// Load the config from `path`, or write the defaults there when the
    /// file does not exist yet.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading config file '{}'", path.display()))?;
            let config: Config = toml::from_str(&raw)
                .with_context(|| format!("parsing config file '{}'", path.display()))?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save(path)?;
            tracing::info!(path = %path.display(), "wrote default config");
            Ok(config)
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating config directory '{}'", parent.display()))?;
            }
        }
        let raw = toml::to_string_pretty(self).context("serializing config")?;
        fs::write(path, raw).with_context(|| format!("writing config file '{}'", path.display()))?;
        Ok(())
    }

    /// Reject values the server must not start with.
    pub fn validate(&self) -> Result<()> {
        if !self.bonus_case_chance.is_finite()
            || !(0.0..=1.0).contains(&self.bonus_case_chance)
        {
            bail!(
                "bonus_case_chance must lie in [0, 1], got {}",
                self.bonus_case_chance
            );
        }
        Ok(())
    }
}

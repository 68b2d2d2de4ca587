use crate::config_validators as validators;
use anyhow::Context;
use garde::Validate;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct Config {
    #[garde(dive)]
    pub telegram: Telegram,

    #[garde(dive)]
    pub database: Database,

    #[garde(dive)]
    pub downloads: Downloads,

    #[garde(dive)]
    #[serde(default)]
    pub limits: Limits,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct Telegram {
    #[garde(length(min = 1))]
    pub bot_token: String,

    /// Private channel every gallery artifact is uploaded to first,
    /// solely to obtain a durable file id for the cache.
    #[garde(skip)]
    pub archive_channel_id: i64,

    /// Static image sent in reply to /start, skipped when missing.
    #[garde(skip)]
    pub greeting_image: Option<PathBuf>,

    /// Static image sent when a message mentions the big rat,
    /// skipped when missing.
    #[garde(skip)]
    pub easter_egg_image: Option<PathBuf>,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct Database {
    #[garde(custom(validators::is_file_directory_exists))]
    pub path: PathBuf,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct Downloads {
    /// Root for per-identity artifact directories. Created at
    /// startup if missing.
    #[garde(skip)]
    pub dir: PathBuf,
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(default)]
pub struct Limits {
    /// Sources longer than this are fetched capped at 720p.
    #[garde(range(min = 1))]
    pub best_quality_max_secs: u64,

    /// Sources longer than this are skipped outright, before any
    /// fetch; they can't fit the upload ceiling in any encoding.
    #[garde(range(min = 1))]
    pub max_duration_secs: u64,

    /// Telegram's bot-upload ceiling.
    #[garde(range(min = 1))]
    pub max_upload_bytes: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            best_quality_max_secs: 120,
            max_duration_secs: 420,
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

impl Config {
    pub fn read_from<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
        let path = path.as_ref();

        let raw: String = fs::read_to_string(path)
            .with_context(|| format!("reading file from {}", path.display()))?;

        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("deserializing file from {}", path.display()))?;

        config.validate(&()).map_err(|errors| {
            anyhow::anyhow!(
                "invalid values in config '{path}':\n{errors}",
                path = path.display()
            )
        })?;

        Ok(config)
    }
}

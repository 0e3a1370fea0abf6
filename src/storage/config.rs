use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::calendar::ViewMode;
use crate::grid::GridOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub storage: StorageConfig,
    pub calendar: CalendarConfig,
    pub generation: GenerationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    pub database_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarConfig {
    pub default_view: String,
    pub max_visible_posts: usize,
    pub first_hour: u32,
    pub last_hour: u32,
    pub utc_offset_minutes: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub caption_max_tokens: u32,
    pub caption_temperature: f32,
    pub image_width: u32,
    pub image_height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    pub directory: PathBuf,
    pub level: String,
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::from)
    }

    pub fn load_or_create() -> Result<Self, ConfigError> {
        Self::load_or_create_at(&Self::config_path())
    }

    pub fn load_or_create_at(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml(&content)
        } else {
            let config = Self::default();
            config.save_to(path)?;
            tracing::info!("Wrote default config to {}", path.display());
            Ok(config)
        }
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pagehub")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    pub fn default_view(&self) -> Result<ViewMode, ConfigError> {
        self.calendar
            .default_view
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                field: "calendar.default_view",
                reason: format!("unknown view '{}'", self.calendar.default_view),
            })
    }

    pub fn utc_offset(&self) -> Result<FixedOffset, ConfigError> {
        self.calendar
            .utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "calendar.utc_offset_minutes",
                reason: format!("{} is outside +/-24h", self.calendar.utc_offset_minutes),
            })
    }

    pub fn grid_options(&self) -> Result<GridOptions, ConfigError> {
        GridOptions::new(
            self.calendar.max_visible_posts,
            self.calendar.first_hour,
            self.calendar.last_hour,
            self.utc_offset()?,
        )
        .map_err(|e| ConfigError::InvalidValue {
            field: "calendar",
            reason: e.to_string(),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = Self::config_dir();

        Self {
            storage: StorageConfig {
                database_path: config_dir.join("pagehub.db"),
            },
            calendar: CalendarConfig {
                default_view: "month".to_string(),
                max_visible_posts: 2,
                first_hour: 8,
                last_hour: 19,
                utc_offset_minutes: 0,
            },
            generation: GenerationConfig {
                base_url: "http://localhost:54321/functions/v1".to_string(),
                api_key: None,
                caption_max_tokens: 256,
                caption_temperature: 0.7,
                image_width: 1024,
                image_height: 1024,
            },
            logging: LoggingConfig {
                directory: config_dir,
                level: "info".to_string(),
            },
        }
    }
}

use log::{info, warn};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, ZapError};
use crate::models::ApiSettings;

/// Simulated delays, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    pub session_qr_delay_ms: u64,
    pub session_refresh_delay_ms: u64,
    pub session_test_delay_ms: u64,
    pub delivery_delay_ms: u64,
    pub webhook_test_delay_ms: u64,
    pub connection_test_delay_ms: u64,
    pub group_extraction_delay_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Timing {
            session_qr_delay_ms: 2000,
            session_refresh_delay_ms: 1500,
            session_test_delay_ms: 2000,
            delivery_delay_ms: 1000,
            webhook_test_delay_ms: 2000,
            connection_test_delay_ms: 2000,
            group_extraction_delay_ms: 2000,
        }
    }
}

impl Timing {
    pub fn session_qr_delay(&self) -> Duration {
        Duration::from_millis(self.session_qr_delay_ms)
    }

    pub fn session_refresh_delay(&self) -> Duration {
        Duration::from_millis(self.session_refresh_delay_ms)
    }

    pub fn session_test_delay(&self) -> Duration {
        Duration::from_millis(self.session_test_delay_ms)
    }

    pub fn delivery_delay(&self) -> Duration {
        Duration::from_millis(self.delivery_delay_ms)
    }

    pub fn webhook_test_delay(&self) -> Duration {
        Duration::from_millis(self.webhook_test_delay_ms)
    }

    pub fn connection_test_delay(&self) -> Duration {
        Duration::from_millis(self.connection_test_delay_ms)
    }

    pub fn group_extraction_delay(&self) -> Duration {
        Duration::from_millis(self.group_extraction_delay_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiSettings,
    pub timing: Timing,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

static CONFIG_PATH_OVERRIDE: OnceCell<PathBuf> = OnceCell::new();

/// Point config loading at an explicit file. Only the first call takes effect.
pub fn set_config_path_override(path: PathBuf) {
    if let Err(rejected) = CONFIG_PATH_OVERRIDE.set(path) {
        warn!("Config path already set, ignoring {}", rejected.display());
    }
}

pub fn get_config_dir() -> Result<PathBuf> {
    let dir = dirs::config_dir().ok_or(ZapError::NoConfigDir)?;
    Ok(dir.join("zapboard"))
}

fn get_config_path() -> Result<PathBuf> {
    if let Some(path) = CONFIG_PATH_OVERRIDE.get() {
        return Ok(path.clone());
    }
    Ok(get_config_dir()?.join("config.json"))
}

/// Load the config from the override path or the default location.
/// A missing file yields the defaults; nothing is ever written back.
pub fn load_config() -> Result<AppConfig> {
    let path = get_config_path()?;
    if !path.exists() {
        info!("No config file at {}, using defaults", path.display());
        return Ok(AppConfig::default());
    }
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let contents = fs::read_to_string(path).map_err(|source| ZapError::ConfigIo {
        path: path.to_path_buf(),
        source,
    })?;
    let config: AppConfig = serde_json::from_str(&contents).map_err(|source| ZapError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Loaded config from {} (api_url={})", path.display(), config.api.api_url);
    Ok(config)
}

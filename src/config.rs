// Credential resolution and the persisted config file. The key is
// resolved once at startup and handed to the API client; nothing else
// reads or writes this file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

pub const API_KEY_ENV: &str = "FUSARA_API_KEY";
pub const BASE_URL_ENV: &str = "FUSARA_BASE_URL";
const APP_DIR: &str = "fusara-modify";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct StoredConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Location of the persisted config, under the platform config dir.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(CONFIG_FILE)
}

/// Default output directory: `~/Desktop/fusara_output`.
pub fn default_out_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Desktop")
        .join("fusara_output")
}

pub fn load_config(path: &Path) -> Result<StoredConfig> {
    if !path.exists() {
        return Ok(StoredConfig::default());
    }
    let src = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&src).with_context(|| format!("Invalid config {}", path.display()))
}

pub fn save_config(path: &Path, cfg: &StoredConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create config directory")?;
    }
    fs::write(path, serde_json::to_string_pretty(cfg)?)
        .with_context(|| format!("Failed to write config {}", path.display()))?;
    Ok(())
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(String::from)
}

/// Resolve the API key: explicit value, then environment, then the config
/// file, then `ask`. A key obtained from `ask` is persisted to `path`.
pub fn resolve_api_key(
    cli: Option<&str>,
    env: Option<&str>,
    path: &Path,
    ask: impl FnOnce() -> Result<String>,
) -> Result<String> {
    if let Some(key) = non_empty(cli) {
        debug!("using API key from command line");
        return Ok(key);
    }
    if let Some(key) = non_empty(env) {
        debug!("using API key from {API_KEY_ENV}");
        return Ok(key);
    }

    let mut cfg = load_config(path)?;
    if let Some(key) = non_empty(cfg.api_key.as_deref()) {
        debug!("using API key from {}", path.display());
        return Ok(key);
    }

    let Some(key) = non_empty(Some(ask()?.as_str())) else {
        bail!("API key required.");
    };
    cfg.api_key = Some(key.clone());
    save_config(path, &cfg)?;
    info!("saved API key to {}", path.display());
    println!("  Saved API key to {}", path.display());
    Ok(key)
}

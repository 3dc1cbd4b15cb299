//! Application configuration for WikiTrigger.
//!
//! User config lives at `~/.wikitrigger/wikitrigger.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, WikiTriggerError};
use crate::types::DEFAULT_RESPONSE_LIMIT;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "wikitrigger.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".wikitrigger";

// ---------------------------------------------------------------------------
// Config structs (matching wikitrigger.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Request defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Upstream wiki fetch settings.
    #[serde(default)]
    pub wiki: WikiConfig,

    /// Cursor signing and delivery.
    #[serde(default)]
    pub cursor: CursorConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Wiki language used when a trigger leaves `lang` empty.
    #[serde(default = "default_lang")]
    pub lang: String,

    /// Response limit used when a request omits one.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            lang: default_lang(),
            limit: default_limit(),
        }
    }
}

fn default_lang() -> String {
    "en".into()
}
fn default_limit() -> i64 {
    DEFAULT_RESPONSE_LIMIT
}

/// `[wiki]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikiConfig {
    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// How long a fetched feed body is reused before refetching.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Items requested from the wiki API per fetch.
    ///
    /// Hashtag edits are matched against the wiki's whole recent-changes
    /// stream, so that kind scans at least 500 changes regardless. Tagged
    /// edits older than that window at poll time are not seen.
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: u32,
}

impl Default for WikiConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            cache_ttl_secs: default_cache_ttl(),
            fetch_limit: default_fetch_limit(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}
fn default_cache_ttl() -> u64 {
    5 * 60
}
fn default_fetch_limit() -> u32 {
    50
}

/// How the next cursor reaches the platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CursorDelivery {
    /// Emit an explicit `cursor` token field in every response.
    #[default]
    Token,
    /// Omit the token; the platform deduplicates on `meta.id`.
    Implicit,
}

/// `[cursor]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CursorConfig {
    /// Name of the env var holding the cursor signing key (never store the key itself).
    #[serde(default = "default_secret_env")]
    pub secret_env: String,

    /// Cursor delivery mode.
    #[serde(default)]
    pub delivery: CursorDelivery,
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            secret_env: default_secret_env(),
            delivery: CursorDelivery::default(),
        }
    }
}

fn default_secret_env() -> String {
    "WIKITRIGGER_CURSOR_SECRET".into()
}

// ---------------------------------------------------------------------------
// Feed config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime feed-source configuration.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// HTTP timeout in seconds.
    pub timeout_secs: u64,
    /// Cache refresh window in seconds; 0 disables caching.
    pub cache_ttl_secs: u64,
    /// Upstream page size.
    pub fetch_limit: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for FeedConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            timeout_secs: config.wiki.timeout_secs,
            cache_ttl_secs: config.wiki.cache_ttl_secs,
            fetch_limit: config.wiki.fetch_limit,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.wikitrigger/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| WikiTriggerError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.wikitrigger/wikitrigger.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| WikiTriggerError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        WikiTriggerError::config(format!("failed to parse {}: {e}", path.display()))
    })?;

    if config.defaults.limit <= 0 {
        return Err(WikiTriggerError::config(format!(
            "defaults.limit must be positive, got {}",
            config.defaults.limit
        )));
    }

    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| WikiTriggerError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| WikiTriggerError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| WikiTriggerError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the cursor signing key from the configured env var.
///
/// An unset or empty variable yields an empty key: cursors are still
/// checksummed against corruption but not protected against forgery.
pub fn cursor_secret(config: &AppConfig) -> Vec<u8> {
    let var_name = &config.cursor.secret_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => val.into_bytes(),
        _ => {
            tracing::debug!(var = %var_name, "cursor secret not set, using unkeyed checksums");
            Vec::new()
        }
    }
}

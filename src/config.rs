//! # Configuration Module
//!
//! Runtime configuration for Encore: Last.fm access, which bandit policy new
//! listeners start with, engine tuning and session lifetime.
//!
//! ## Sources
//!
//! Settings are resolved in this order, later sources winning:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. The JSON config file in the platform config directory:
//!    - Linux: `~/.config/encore/config.json`
//!    - macOS: `~/Library/Application Support/encore/config.json`
//!    - Windows: `%APPDATA%\encore\config.json`
//! 3. Environment variables: `LASTFM_API_KEY`, `ENCORE_SEED`
//!
//! Every field is optional in the file; missing fields keep their defaults.

use crate::bandit::{PolicyKind, DEFAULT_EPSILON};
use crate::catalogue::LASTFM_BASE_URL;
use crate::recommender::EngineConfig;
use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable holding the Last.fm API key.
pub const API_KEY_VAR: &str = "LASTFM_API_KEY";

/// Environment variable pinning all random sources to a seed.
pub const SEED_VAR: &str = "ENCORE_SEED";

/// Returns the platform-appropriate config file path.
///
/// The file does not have to exist; [`Config::load`] falls back to defaults.
///
/// # Errors
///
/// Returns an error if the system config directory cannot be determined.
///
/// # Examples
///
/// ```no_run
/// use encore::config::get_config_path;
///
/// let path = get_config_path()?;
/// println!("Config location: {}", path.display());
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn get_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system config directory. Please ensure your platform supports standard config directories."
        )
    })?;

    Ok(config_dir.join("encore").join("config.json"))
}

/// Effective runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Last.fm API key. Required unless an offline catalogue file is used.
    pub lastfm_api_key: Option<String>,
    pub lastfm_base_url: String,
    pub request_timeout_secs: u64,
    /// Policy every new (or reset) listener starts with.
    pub policy: PolicyKind,
    /// Exploration probability for the epsilon-greedy policy.
    pub epsilon: f64,
    pub engine: EngineConfig,
    /// Sessions idle longer than this are evicted.
    pub session_timeout_secs: u64,
    /// Fixed seed for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lastfm_api_key: None,
            lastfm_base_url: LASTFM_BASE_URL.to_string(),
            request_timeout_secs: 10,
            policy: PolicyKind::default(),
            epsilon: DEFAULT_EPSILON,
            engine: EngineConfig::default(),
            session_timeout_secs: 24 * 60 * 60,
            seed: None,
        }
    }
}

impl Config {
    /// Load from the default location, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing config file is unreadable or invalid,
    /// or if `ENCORE_SEED` is not an unsigned integer.
    pub fn load() -> Result<Self> {
        let path = get_config_path()?;
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Load a config file without consulting the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid config JSON.
    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Check numeric settings that would otherwise be clamped silently.
    ///
    /// # Errors
    ///
    /// Returns an error if `epsilon` is outside `[0, 1]` or an engine
    /// setting is out of range.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.epsilon) {
            anyhow::bail!("epsilon must be between 0 and 1, got {}", self.epsilon);
        }
        self.engine.validate()
    }

    /// Apply overrides from an environment lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if the seed variable is set but not a valid `u64`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(key) = lookup(API_KEY_VAR).filter(|key| !key.trim().is_empty()) {
            self.lastfm_api_key = Some(key);
        }
        if let Some(raw) = lookup(SEED_VAR) {
            let seed = raw
                .trim()
                .parse()
                .with_context(|| format!("{SEED_VAR} must be an unsigned integer, got {raw:?}"))?;
            self.seed = Some(seed);
        }
        Ok(())
    }

    /// The Last.fm API key.
    ///
    /// # Errors
    ///
    /// Returns an error explaining how to configure the key when it is missing.
    pub fn api_key(&self) -> Result<&str> {
        self.lastfm_api_key.as_deref().ok_or_else(|| {
            anyhow::anyhow!(
                "No Last.fm API key configured. Set {API_KEY_VAR} or add \"lastfm_api_key\" to the config file."
            )
        })
    }

    /// Copy safe for printing: the API key is masked.
    #[must_use]
    pub fn redacted(&self) -> Self {
        Self {
            lastfm_api_key: self.lastfm_api_key.as_ref().map(|_| "********".to_string()),
            ..self.clone()
        }
    }
}

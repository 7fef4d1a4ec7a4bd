//! Configuration management for lifelined.
//!
//! Loads settings from /etc/lifeline/config.toml or uses defaults.
//! Every field has a default so partial files are fine.

use anyhow::{Context, Result};
use lifeline_shared::EmergencyContacts;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Config file path
pub const CONFIG_PATH: &str = "/etc/lifeline/config.toml";

/// Default config file path for fallback
pub const DEFAULT_CONFIG_PATH: &str = "/var/lib/lifeline/config.toml";

/// Environment variable overriding `llm.api_key`
pub const API_KEY_ENV: &str = "LIFELINE_LLM_API_KEY";

/// Daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Sessions idle longer than this are dropped
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    /// Upper bound on live sessions
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// How often idle sessions are pruned
    #[serde(default = "default_prune_interval")]
    pub prune_interval_secs: u64,

    /// tracing filter used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_listen_addr() -> String {
    "127.0.0.1:7870".to_string()
}

fn default_session_ttl() -> u64 {
    1800
}

fn default_max_sessions() -> usize {
    1000
}

fn default_prune_interval() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            session_ttl_secs: default_session_ttl(),
            max_sessions: default_max_sessions(),
            prune_interval_secs: default_prune_interval(),
            log_level: default_log_level(),
        }
    }
}

impl DaemonConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

/// LLM configuration for guidance enhancement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// When false, only local guidance is produced
    #[serde(default = "default_llm_enabled")]
    pub enabled: bool,

    /// Ollama or OpenAI-compatible base URL
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout; local guidance is already shown while waiting
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_llm_enabled() -> bool {
    true
}

fn default_llm_endpoint() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_llm_model() -> String {
    "qwen2.5:3b-instruct".to_string()
}

fn default_llm_timeout() -> u64 {
    12
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: default_llm_enabled(),
            endpoint: default_llm_endpoint(),
            model: default_llm_model(),
            api_key: None,
            timeout_secs: default_llm_timeout(),
        }
    }
}

/// Nearby facility lookup (OpenStreetMap Overpass)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilitiesConfig {
    #[serde(default = "default_facilities_enabled")]
    pub enabled: bool,

    #[serde(default = "default_overpass_url")]
    pub overpass_url: String,

    /// Search radius around the bystander
    #[serde(default = "default_radius")]
    pub radius_meters: u32,

    /// Places kept per category after sorting by distance
    #[serde(default = "default_per_category")]
    pub per_category: usize,

    #[serde(default = "default_facilities_timeout")]
    pub timeout_secs: u64,
}

fn default_facilities_enabled() -> bool {
    true
}

fn default_overpass_url() -> String {
    "https://overpass-api.de/api/interpreter".to_string()
}

fn default_radius() -> u32 {
    5000
}

fn default_per_category() -> usize {
    lifeline_shared::places::DEFAULT_PLACES_PER_CATEGORY
}

fn default_facilities_timeout() -> u64 {
    25
}

impl Default for FacilitiesConfig {
    fn default() -> Self {
        Self {
            enabled: default_facilities_enabled(),
            overpass_url: default_overpass_url(),
            radius_meters: default_radius(),
            per_category: default_per_category(),
            timeout_secs: default_facilities_timeout(),
        }
    }
}

/// Emergency audit log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyLogConfig {
    /// JSONL file
    #[serde(default = "default_log_path")]
    pub path: PathBuf,

    /// Keep records in memory only, nothing is written to disk
    #[serde(default)]
    pub in_memory: bool,

    /// Rotation threshold
    #[serde(default = "default_log_max_entries")]
    pub max_entries: usize,
}

fn default_log_path() -> PathBuf {
    PathBuf::from("/var/lib/lifeline/emergencies.jsonl")
}

fn default_log_max_entries() -> usize {
    10_000
}

impl Default for EmergencyLogConfig {
    fn default() -> Self {
        Self {
            path: default_log_path(),
            in_memory: false,
            max_entries: default_log_max_entries(),
        }
    }
}

/// Full daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub facilities: FacilitiesConfig,

    #[serde(default)]
    pub emergency_log: EmergencyLogConfig,

    #[serde(default)]
    pub contacts: EmergencyContacts,
}

impl Config {
    /// Load config from the standard locations, or return defaults
    pub fn load() -> Self {
        let mut config = Self::load_from_path(Path::new(CONFIG_PATH))
            .or_else(|_| Self::load_from_path(Path::new(DEFAULT_CONFIG_PATH)))
            .unwrap_or_else(|e| {
                warn!("Config not found, using defaults: {}", e);
                Config::default()
            });
        config.apply_env();
        config
    }

    /// Load config from an explicit path; a missing or broken file is an error
    pub fn load_explicit(path: &Path) -> Result<Self> {
        let mut config = Self::load_from_path(path)?;
        config.apply_env();
        Ok(config)
    }

    fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.llm.api_key = Some(key);
            }
        }
    }

    /// Save default config to path (for init)
    pub fn save_default(path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(&Config::default())?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        info!("Saved default config to {}", path.display());
        Ok(())
    }
}

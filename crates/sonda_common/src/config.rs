//! Sonda configuration.
//!
//! Lives in `$XDG_CONFIG_HOME/sonda/config.toml` with a home-directory
//! fallback. Every field has a default so a missing or partial file still
//! yields a working configuration.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

const CONFIG_FILE: &str = "config.toml";

/// Default port the companion agent listens on.
pub const DEFAULT_AGENT_PORT: u16 = 5001;

/// Static bearer credential the companion agent expects.
pub const DEFAULT_AGENT_TOKEN: &str = "forensic_agent_2024";

/// Default base URL of the case management backend.
pub const DEFAULT_API_BASE: &str = "http://localhost:5000/api";

/// What an unresolved architecture detection reports.
///
/// Both behaviors shipped in the field: the case list page treated an
/// unresolved architecture as unknown, the installer page assumed x64.
/// The policy is an explicit setting instead of a silent pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArchFallback {
    #[default]
    Unknown,
    X64,
}

/// Runtime configuration for detection and backend access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Host the companion agent is probed on.
    #[serde(default = "default_agent_host")]
    pub agent_host: String,

    /// Port of the companion agent status endpoint.
    #[serde(default = "default_agent_port")]
    pub agent_port: u16,

    /// Bearer credential sent to the companion agent.
    #[serde(default = "default_agent_token")]
    pub agent_token: String,

    /// Timeout for the agent liveness probe (seconds, valid: 1-30).
    #[serde(default = "default_agent_timeout")]
    pub agent_timeout_secs: u64,

    /// Base URL for the case management API.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Policy for architecture strings no heuristic resolves.
    #[serde(default)]
    pub unknown_arch_default: ArchFallback,
}

fn default_agent_host() -> String {
    "127.0.0.1".to_string()
}

fn default_agent_port() -> u16 {
    DEFAULT_AGENT_PORT
}

fn default_agent_token() -> String {
    DEFAULT_AGENT_TOKEN.to_string()
}

fn default_agent_timeout() -> u64 {
    3
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            agent_host: default_agent_host(),
            agent_port: default_agent_port(),
            agent_token: default_agent_token(),
            agent_timeout_secs: default_agent_timeout(),
            api_base: default_api_base(),
            unknown_arch_default: ArchFallback::default(),
        }
    }
}

impl ProbeConfig {
    /// Load configuration, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        match fs::read_to_string(&path) {
            Ok(raw) => match toml::from_str(&raw) {
                Ok(config) => config,
                Err(e) => {
                    warn!("ignoring malformed config at {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Persist the configuration, creating the directory if needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path().context("no configuration directory available")?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let raw = toml::to_string_pretty(self)?;
        fs::write(&path, raw).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    /// Discover the config file path.
    ///
    /// Priority:
    /// 1. `$SONDA_CONFIG` (explicit override)
    /// 2. `$XDG_CONFIG_HOME/sonda/config.toml`
    /// 3. `~/.config/sonda/config.toml`
    pub fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("SONDA_CONFIG") {
            return Some(PathBuf::from(path));
        }

        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            return Some(PathBuf::from(xdg).join("sonda").join(CONFIG_FILE));
        }

        if let Ok(home) = std::env::var("HOME") {
            return Some(
                PathBuf::from(home)
                    .join(".config")
                    .join("sonda")
                    .join(CONFIG_FILE),
            );
        }

        None
    }

    /// Clamp the probe timeout to its valid range (1-30 seconds).
    pub fn effective_agent_timeout(&self) -> u64 {
        self.agent_timeout_secs.clamp(1, 30)
    }

    /// Full URL of the agent status endpoint.
    pub fn agent_status_url(&self) -> String {
        format!("http://{}:{}/status", self.agent_host, self.agent_port)
    }
}

/// State directory for scratch data (used by the storage probe).
///
/// Priority: `$XDG_STATE_HOME/sonda`, `~/.local/state/sonda`, then the
/// system temp directory.
pub fn state_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("sonda");
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("state").join("sonda");
    }

    std::env::temp_dir().join("sonda")
}

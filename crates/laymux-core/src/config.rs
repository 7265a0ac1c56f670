//! TOML configuration.
//!
//! ```toml
//! data_dir = "~/.local/share/laymux"
//! workspace_root = "/home/me/src/project"
//! tmux_bin = "tmux"
//! tmux_socket = "/tmp/tmux-1000/default"
//!
//! [settle]
//! initial_ms = 20
//! max_ms = 250
//! timeout_ms = 5000
//!
//! [profiles]
//! zsh = "/bin/zsh -l"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::replay::SettlePolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub data_dir: Option<PathBuf>,
    pub workspace_root: Option<PathBuf>,
    pub tmux_bin: Option<String>,
    pub tmux_socket: Option<PathBuf>,
    pub settle: SettleConfig,
    /// Profile name to shell command.
    pub profiles: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettleConfig {
    pub initial_ms: u64,
    pub max_ms: u64,
    pub timeout_ms: u64,
}

impl Default for SettleConfig {
    fn default() -> Self {
        let policy = SettlePolicy::default();
        Self {
            initial_ms: policy.initial.as_millis() as u64,
            max_ms: policy.max_interval.as_millis() as u64,
            timeout_ms: policy.timeout.as_millis() as u64,
        }
    }
}

impl SettleConfig {
    pub fn policy(&self) -> SettlePolicy {
        SettlePolicy {
            initial: Duration::from_millis(self.initial_ms.max(1)),
            max_interval: Duration::from_millis(self.max_ms.max(self.initial_ms).max(1)),
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

impl Config {
    pub fn from_toml(path: &Path, content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                tracing::debug!(path = %path.display(), "loading config");
                Self::from_toml(path, &content)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Data directory from the file, else the platform default.
    pub fn data_dir_or_default(&self, env: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
        self.data_dir
            .as_deref()
            .map(|dir| expand_home(dir, &env))
            .or_else(|| default_data_dir(&env))
    }
}

/// `$XDG_CONFIG_HOME/laymux/config.toml`, else `~/.config/laymux/config.toml`.
pub fn default_config_path(env: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    xdg_dir(&env, "XDG_CONFIG_HOME", ".config").map(|dir| dir.join("laymux").join("config.toml"))
}

/// `$XDG_DATA_HOME/laymux`, else `~/.local/share/laymux`.
pub fn default_data_dir(env: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    xdg_dir(&env, "XDG_DATA_HOME", ".local/share").map(|dir| dir.join("laymux"))
}

fn xdg_dir(
    env: &impl Fn(&str) -> Option<String>,
    var: &str,
    home_fallback: &str,
) -> Option<PathBuf> {
    if let Some(dir) = env(var).filter(|d| !d.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    env("HOME")
        .filter(|h| !h.is_empty())
        .map(|home| PathBuf::from(home).join(home_fallback))
}

/// Expand a leading `~/`.
pub fn expand_home(path: &Path, env: &impl Fn(&str) -> Option<String>) -> PathBuf {
    match (path.strip_prefix("~"), env("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path.to_path_buf(),
    }
}

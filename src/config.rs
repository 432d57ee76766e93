//! Configuration management for minigreet
//!
//! Looks for configuration in /etc/minigreet/config.toml, then
//! ~/.config/minigreet/config.toml. Every field has a default, so a missing
//! file or a partial one is fine.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::greeter::client::socket_path_from_env;
use crate::session::{WAYLAND_SESSIONS_DIR, X11_SESSIONS_DIR};

/// Configuration file name
const CONFIG_FILE: &str = "config.toml";

/// Application name for config directory
const APP_NAME: &str = "minigreet";

/// System-wide configuration directory
const SYSTEM_CONFIG_DIR: &str = "/etc/minigreet";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Modifier that must be held for hotkeys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModKey {
    Control,
    #[default]
    Alt,
    Super,
}

/// Hotkey letters, pressed together with `mod_key`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeyConfig {
    pub mod_key: ModKey,
    pub shutdown: char,
    pub restart: char,
    pub hibernate: char,
    pub suspend: char,
    /// Cycle to the next session; with Shift, the previous one.
    pub session: char,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            mod_key: ModKey::Alt,
            shutdown: 's',
            restart: 'r',
            hibernate: 'h',
            suspend: 'u',
            session: 'e',
        }
    }
}

/// Commands run for the power hotkeys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerConfig {
    pub shutdown: Vec<String>,
    pub restart: Vec<String>,
    pub suspend: Vec<String>,
    pub hibernate: Vec<String>,
}

fn systemctl(verb: &str) -> Vec<String> {
    vec!["systemctl".to_string(), verb.to_string()]
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            shutdown: systemctl("poweroff"),
            restart: systemctl("reboot"),
            suspend: systemctl("suspend"),
            hibernate: systemctl("hibernate"),
        }
    }
}

/// Where sessions are found and how X11 sessions are launched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    pub wayland_dirs: Vec<PathBuf>,
    pub x11_dirs: Vec<PathBuf>,
    /// Prefix for X11 session commands
    pub x11_wrapper: Vec<String>,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            wayland_dirs: vec![PathBuf::from(WAYLAND_SESSIONS_DIR)],
            x11_dirs: vec![PathBuf::from(X11_SESSIONS_DIR)],
            x11_wrapper: crate::greeter::bridge::default_x11_wrapper(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// User to log in. Required to run the greeter.
    pub user: Option<String>,

    /// Feedback shown after a rejected password. Empty shows nothing.
    pub invalid_password_text: String,

    /// Feedback shown when a session cannot be started
    pub session_failed_text: String,

    /// Character echoed for each typed password character
    pub password_char: char,

    /// Overrides GREETD_SOCK
    pub greetd_socket: Option<PathBuf>,

    /// Session key (desktop file stem) selected at startup
    pub default_session: Option<String>,

    pub log_file: Option<PathBuf>,

    pub sessions: SessionsConfig,
    pub hotkeys: HotkeyConfig,
    pub power: PowerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user: None,
            invalid_password_text: "Invalid Password".to_string(),
            session_failed_text: "Unable to start session".to_string(),
            password_char: '*',
            greetd_socket: None,
            default_session: None,
            log_file: None,
            sessions: SessionsConfig::default(),
            hotkeys: HotkeyConfig::default(),
            power: PowerConfig::default(),
        }
    }
}

impl Config {
    /// Create a configuration with every field at its default
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of the system-wide config file
    pub fn system_config_path() -> PathBuf {
        Path::new(SYSTEM_CONFIG_DIR).join(CONFIG_FILE)
    }

    /// Get the per-user config file path
    ///
    /// Returns ~/.config/minigreet/config.toml on Linux
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Config files checked when no path is given, in priority order
    pub fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = vec![Self::system_config_path()];
        paths.extend(Self::user_config_path());
        paths
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. Otherwise the first existing candidate
    /// is used, falling back to defaults. Returns the path that was read.
    pub fn load(explicit: Option<&Path>) -> ConfigResult<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::load_from(path)?, Some(path.to_path_buf())));
        }
        Self::load_first(&Self::candidate_paths())
    }

    /// Load the first existing file among `candidates`
    pub fn load_first(candidates: &[PathBuf]) -> ConfigResult<(Self, Option<PathBuf>)> {
        match candidates.iter().find(|path| path.exists()) {
            Some(path) => Ok((Self::load_from(path)?, Some(path.clone()))),
            None => Ok((Self::default(), None)),
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The configured user, ignoring blank values
    pub fn default_user(&self) -> Option<&str> {
        self.user
            .as_deref()
            .map(str::trim)
            .filter(|user| !user.is_empty())
    }

    /// Get the effective greetd socket (config value, then GREETD_SOCK)
    pub fn greetd_socket_path(&self) -> Option<PathBuf> {
        self.greetd_socket.clone().or_else(socket_path_from_env)
    }
}

/// Format the configuration for display
pub fn format_config(config: &Config, source: Option<&Path>) -> ConfigResult<String> {
    let mut lines = Vec::new();

    match source {
        Some(path) => lines.push(format!("# Loaded from {}", path.display())),
        None => lines.push("# No config file found, using defaults".to_string()),
    }
    if config.default_user().is_none() {
        lines.push("# user is not set; the greeter will refuse to start".to_string());
    }
    lines.push(String::new());
    lines.push(toml::to_string_pretty(config)?);

    Ok(lines.join("\n"))
}

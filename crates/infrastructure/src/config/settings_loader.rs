//! Settings file and environment overrides.
//!
//! Looks for settings in the platform-specific config directory:
//! - Linux: ~/.config/courier/settings.json
//! - macOS: ~/Library/Application Support/courier/settings.json
//! - Windows: %APPDATA%/courier/settings.json

use std::path::{Path, PathBuf};
use std::str::FromStr;

use courier_domain::EngineSettings;
use tracing::debug;

use crate::serialization::{SerializationError, read_json_file};

const TIMEOUT_MS_VAR: &str = "COURIER_TIMEOUT_MS";
const WITH_CREDENTIALS_VAR: &str = "COURIER_WITH_CREDENTIALS";
const WS_TIMEOUT_MS_VAR: &str = "COURIER_WS_TIMEOUT_MS";
const SSE_TIMEOUT_MS_VAR: &str = "COURIER_SSE_TIMEOUT_MS";
const SSE_MAX_EVENTS_VAR: &str = "COURIER_SSE_MAX_EVENTS";

/// Error type for settings loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The settings file exists but could not be read or parsed.
    #[error("Could not load settings: {0}")]
    Serialization(#[from] SerializationError),

    /// An environment override holds a value of the wrong type.
    #[error("Invalid value for {name}: '{value}'")]
    InvalidOverride {
        /// Variable name.
        name: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// Loads [`EngineSettings`] from a file, then applies `COURIER_*` overrides.
#[derive(Debug, Clone, Default)]
pub struct SettingsLoader {
    path: Option<PathBuf>,
}

impl SettingsLoader {
    /// Creates a loader using the default settings location.
    #[must_use]
    pub const fn new() -> Self {
        Self { path: None }
    }

    /// Creates a loader reading an explicit file.
    #[must_use]
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Returns the path to the default settings file.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("courier").join("settings.json"))
    }

    fn settings_path(&self) -> Option<PathBuf> {
        self.path.clone().or_else(Self::default_path)
    }

    /// Loads settings and applies the process environment overrides.
    ///
    /// Returns defaults if no settings file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or an override is invalid.
    pub async fn load(&self) -> Result<EngineSettings, ConfigError> {
        let settings = self.load_file().await?;
        apply_overrides(settings, |name| std::env::var(name).ok())
    }

    /// Loads only the settings file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub async fn load_file(&self) -> Result<EngineSettings, ConfigError> {
        let Some(path) = self.settings_path() else {
            return Ok(EngineSettings::default());
        };
        if !Path::new(&path).exists() {
            debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(EngineSettings::default());
        }

        let settings = read_json_file(&path).await?;
        debug!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }
}

/// Applies overrides looked up by variable name.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidOverride`] for a value that does not parse.
pub fn apply_overrides(
    mut settings: EngineSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<EngineSettings, ConfigError> {
    if let Some(timeout_ms) = parse_override::<u64>(&lookup, TIMEOUT_MS_VAR)? {
        settings.timeout_ms = timeout_ms;
    }
    if let Some(value) = lookup(WITH_CREDENTIALS_VAR) {
        settings.with_credentials = match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                return Err(ConfigError::InvalidOverride {
                    name: WITH_CREDENTIALS_VAR,
                    value,
                });
            }
        };
    }
    if let Some(timeout_ms) = parse_override::<u64>(&lookup, WS_TIMEOUT_MS_VAR)? {
        settings.websocket_timeout_ms = timeout_ms;
    }
    if let Some(timeout_ms) = parse_override::<u64>(&lookup, SSE_TIMEOUT_MS_VAR)? {
        settings.sse_timeout_ms = timeout_ms;
    }
    if let Some(max_events) = parse_override::<usize>(&lookup, SSE_MAX_EVENTS_VAR)? {
        settings.sse_max_events = max_events;
    }
    Ok(settings)
}

fn parse_override<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    lookup(name)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidOverride { name, value })
        })
        .transpose()
}

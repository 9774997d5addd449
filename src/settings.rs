//! Process-wide fetch settings.
//!
//! Settings are read once when a [`Dispatcher`](crate::download::Dispatcher)
//! is built. They come from a TOML file:
//!
//! ```toml
//! download_timeout_secs = 60
//! connect_timeout_secs = 10
//! tls_enabled = true
//! max_response_bytes = 10485760
//! user_agent = "my-crawler/1.0"
//! ```
//!
//! Every key is optional; missing keys take their defaults and unknown keys
//! are rejected.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::download::FetchRequest;
use crate::download::constants::{CONNECT_TIMEOUT_SECS, DOWNLOAD_TIMEOUT_SECS, MAX_TIMEOUT_SECS};

/// Errors raised while loading or validating settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("cannot read settings file {path}: {source}")]
    Io {
        /// The settings file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid TOML for [`FetchSettings`].
    #[error("invalid settings file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid value for `{field}`: {value}. Expected {expected}")]
    InvalidValue {
        /// The offending key.
        field: &'static str,
        /// The rejected value.
        value: String,
        /// Description of accepted values.
        expected: &'static str,
    },
}

/// Fetch settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchSettings {
    /// Default per-fetch timeout in seconds, overridable per request.
    pub download_timeout_secs: u64,
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Whether the `https` transport is enabled. Has no effect in builds
    /// without the `tls` feature.
    pub tls_enabled: bool,
    /// Optional cap on buffered response bodies.
    pub max_response_bytes: Option<u64>,
    /// Optional User-Agent override.
    pub user_agent: Option<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            download_timeout_secs: DOWNLOAD_TIMEOUT_SECS,
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            tls_enabled: true,
            max_response_bytes: None,
            user_agent: None,
        }
    }
}

impl FetchSettings {
    /// The default download timeout.
    #[must_use]
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    /// The connect timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// The timeout that applies to `request`: its own override, or the
    /// default download timeout.
    #[must_use]
    pub fn effective_timeout(&self, request: &FetchRequest) -> Duration {
        request.timeout().unwrap_or_else(|| self.download_timeout())
    }

    /// Checks every value against its accepted range.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidValue`] for the first bad value.
    pub fn validate(&self) -> Result<(), SettingsError> {
        validate_timeout_secs("download_timeout_secs", self.download_timeout_secs)?;
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        if self.max_response_bytes == Some(0) {
            return Err(SettingsError::InvalidValue {
                field: "max_response_bytes",
                value: "0".to_string(),
                expected: "a positive byte count",
            });
        }
        if let Some(user_agent) = &self.user_agent
            && user_agent.trim().is_empty()
        {
            return Err(SettingsError::InvalidValue {
                field: "user_agent",
                value: format!("{user_agent:?}"),
                expected: "a non-empty string",
            });
        }
        Ok(())
    }

    /// Parses and validates settings from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Parse`] or [`SettingsError::InvalidValue`].
    pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Loads settings from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Io`] if the file cannot be read, otherwise
    /// the errors of [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded settings file");
        Self::from_toml_str(&text)
    }

    /// Loads settings from the default location, or returns defaults when
    /// no file exists there.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`load`](Self::load) when a file exists but is
    /// unreadable or invalid.
    pub fn load_default() -> Result<Self, SettingsError> {
        match default_settings_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

fn validate_timeout_secs(field: &'static str, value: u64) -> Result<(), SettingsError> {
    if (1..=MAX_TIMEOUT_SECS).contains(&value) {
        Ok(())
    } else {
        Err(SettingsError::InvalidValue {
            field,
            value: value.to_string(),
            expected: "range 1..=3600",
        })
    }
}

/// Resolves the default settings path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/fetcher/config.toml`
/// 2. `$HOME/.config/fetcher/config.toml`
#[must_use]
pub fn default_settings_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config_home).join("fetcher").join("config.toml"));
    }
    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("fetcher")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = FetchSettings::default();
        assert_eq!(settings.download_timeout(), Duration::from_secs(180));
        assert_eq!(settings.connect_timeout(), Duration::from_secs(30));
        assert!(settings.tls_enabled);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_from_toml_str_partial_keys_keep_defaults() {
        let settings = FetchSettings::from_toml_str("download_timeout_secs = 5\n").unwrap();
        assert_eq!(settings.download_timeout_secs, 5);
        assert_eq!(settings.connect_timeout_secs, 30);
        assert!(settings.tls_enabled);
    }

    #[test]
    fn test_from_toml_str_rejects_unknown_keys() {
        let error = FetchSettings::from_toml_str("retries = 3\n").unwrap_err();
        assert!(matches!(error, SettingsError::Parse(_)));
    }

    #[test]
    fn test_validate_rejects_out_of_range_timeout() {
        let error = FetchSettings::from_toml_str("download_timeout_secs = 0\n").unwrap_err();
        let msg = error.to_string();
        assert!(msg.contains("download_timeout_secs"), "Expected field in: {msg}");

        let error = FetchSettings::from_toml_str("connect_timeout_secs = 7200\n").unwrap_err();
        assert!(matches!(
            error,
            SettingsError::InvalidValue {
                field: "connect_timeout_secs",
                ..
            }
        ));
    }

    #[test]
    fn test_validate_rejects_zero_max_response_bytes() {
        let error = FetchSettings::from_toml_str("max_response_bytes = 0\n").unwrap_err();
        assert!(error.to_string().contains("max_response_bytes"));
    }

    #[test]
    fn test_effective_timeout_prefers_request_override() {
        let settings = FetchSettings::default();
        let plain = FetchRequest::parse("http://example.com/").unwrap();
        let overridden = plain.clone().with_timeout(Duration::from_millis(250));
        assert_eq!(settings.effective_timeout(&plain), Duration::from_secs(180));
        assert_eq!(settings.effective_timeout(&overridden), Duration::from_millis(250));
    }

    #[test]
    fn test_load_reads_file_and_reports_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "tls_enabled = false\nuser_agent = \"probe/1\"\n").unwrap();

        let settings = FetchSettings::load(&path).unwrap();
        assert!(!settings.tls_enabled);
        assert_eq!(settings.user_agent.as_deref(), Some("probe/1"));

        let missing = FetchSettings::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(missing, SettingsError::Io { .. }));
    }
}

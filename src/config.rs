//! Runtime settings: an optional JSON file overlaid with environment variables.
//!
//! The live configuration is one immutable [`Settings`] snapshot behind a [`ConfigHandle`].
//! Readers clone the `Arc` once per request; reload validates a complete new snapshot
//! before swapping it in, so a failed reload leaves the old one untouched.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Deserialize;
use tracing::{info, warn};

use crate::versioning::ApiVersion;

pub const DEFAULT_SETTINGS_FILE: &str = "appsettings.json";
pub const DEFAULT_API_VERSION: ApiVersion = ApiVersion::new(1, 1);
pub const DEFAULT_HTTP_PORT: u16 = 8088;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSettings {
    pub key: String,
    pub issuer: String,
    pub audience: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub tokens: TokenSettings,
    pub default_version: ApiVersion,
    pub http_port: u16,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("signing configuration missing: {0}")]
    SigningConfigurationMissing(&'static str),
    #[error("invalid default api version '{0}'")]
    InvalidDefaultVersion(String),
    #[error("invalid http port '{0}'")]
    InvalidPort(String),
    #[error("cannot read {path}: {source}")]
    Read { path: PathBuf, #[source] source: std::io::Error },
    #[error("cannot parse {path}: {source}")]
    Parse { path: PathBuf, #[source] source: serde_json::Error },
}

// File shape: {"Tokens": {...}, "Versioning": {...}, "Http": {...}}
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct FileSettings {
    tokens: FileTokens,
    versioning: FileVersioning,
    http: FileHttp,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct FileTokens {
    key: Option<String>,
    issuer: Option<String>,
    audience: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct FileVersioning {
    default_version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct FileHttp {
    port: Option<u16>,
}

/// Where settings come from. Reload re-reads the same source.
#[derive(Debug, Clone)]
pub struct SettingsSource {
    pub path: Option<PathBuf>,
    /// A missing file is an error only when the path was given explicitly.
    pub path_required: bool,
    pub read_env: bool,
}

fn env_nonblank(name: &str) -> Option<String> {
    std::env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn required(value: Option<String>, key: &'static str) -> Result<String, ConfigError> {
    value.filter(|v| !v.trim().is_empty()).ok_or(ConfigError::SigningConfigurationMissing(key))
}

impl SettingsSource {
    /// `CODECAMP_SETTINGS` (or `appsettings.json` in the working directory) plus env overrides.
    pub fn from_env() -> Self {
        match env_nonblank("CODECAMP_SETTINGS") {
            Some(p) => Self { path: Some(PathBuf::from(p)), path_required: true, read_env: true },
            None => Self { path: Some(PathBuf::from(DEFAULT_SETTINGS_FILE)), path_required: false, read_env: true },
        }
    }

    /// Exactly this file, no environment overlay.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self { path: Some(path.into()), path_required: true, read_env: false }
    }

    /// Nothing to reload from; reload always fails.
    pub fn none() -> Self { Self { path: None, path_required: true, read_env: false } }

    fn read_file(path: &Path, required: bool) -> Result<FileSettings, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => return Ok(FileSettings::default()),
            Err(source) => return Err(ConfigError::Read { path: path.to_path_buf(), source }),
        };
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    pub fn load(&self) -> Result<Settings, ConfigError> {
        let mut file = match &self.path {
            Some(p) => Self::read_file(p, self.path_required)?,
            None => return Err(ConfigError::SigningConfigurationMissing("Tokens:Key")),
        };
        if self.read_env {
            let overlay = |slot: &mut Option<String>, name: &str| {
                if let Some(v) = env_nonblank(name) { *slot = Some(v); }
            };
            overlay(&mut file.tokens.key, "TOKENS_KEY");
            overlay(&mut file.tokens.issuer, "TOKENS_ISSUER");
            overlay(&mut file.tokens.audience, "TOKENS_AUDIENCE");
            overlay(&mut file.versioning.default_version, "CODECAMP_DEFAULT_VERSION");
            if let Some(p) = env_nonblank("CODECAMP_HTTP_PORT") {
                file.http.port = Some(p.parse().map_err(|_| ConfigError::InvalidPort(p))?);
            }
        }

        let tokens = TokenSettings {
            key: required(file.tokens.key, "Tokens:Key")?,
            issuer: required(file.tokens.issuer, "Tokens:Issuer")?,
            audience: required(file.tokens.audience, "Tokens:Audience")?,
        };
        let default_version = match file.versioning.default_version {
            Some(s) => s.parse().map_err(|_| ConfigError::InvalidDefaultVersion(s))?,
            None => DEFAULT_API_VERSION,
        };
        Ok(Settings { tokens, default_version, http_port: file.http.port.unwrap_or(DEFAULT_HTTP_PORT) })
    }
}

/// Shared accessor for the current settings snapshot.
#[derive(Clone)]
pub struct ConfigHandle {
    current: Arc<RwLock<Arc<Settings>>>,
    source: Arc<SettingsSource>,
}

impl ConfigHandle {
    pub fn load(source: SettingsSource) -> Result<Self, ConfigError> {
        let settings = source.load()?;
        Ok(Self::with_settings(settings, source))
    }

    pub fn with_settings(settings: Settings, source: SettingsSource) -> Self {
        Self { current: Arc::new(RwLock::new(Arc::new(settings))), source: Arc::new(source) }
    }

    pub fn snapshot(&self) -> Arc<Settings> { self.current.read().clone() }

    pub fn replace(&self, settings: Settings) { *self.current.write() = Arc::new(settings); }

    /// Re-read the source and swap in the result. On error the current snapshot stays.
    pub fn reload(&self) -> Result<Arc<Settings>, ConfigError> {
        match self.source.load() {
            Ok(s) => {
                let next = Arc::new(s);
                *self.current.write() = next.clone();
                info!(target: "config", default_version = %next.default_version, "configuration reloaded");
                Ok(next)
            }
            Err(e) => {
                warn!(target: "config", error = %e, "configuration reload failed; keeping previous settings");
                Err(e)
            }
        }
    }
}

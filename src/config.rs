use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_API_BASE;
use crate::evaluation::{EvaluationTarget, builtin_targets};

pub const API_TOKEN_ENV: &str = "GROUNDLIGHT_API_TOKEN";
pub const API_BASE_ENV: &str = "GROUNDLIGHT_ENDPOINT";
const LEGACY_API_TOKEN_ENV: &str = "GROUNDLIGHT_PPE";
const CONFIG_FILE_NAME: &str = "ppe-monitor.json";

/// On-disk configuration, every field optional.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct MonitorConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    /// API base URL. Falls back to GROUNDLIGHT_ENDPOINT, then the public endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    /// Capture device, e.g. `/dev/video1`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera: Option<String>,
    /// Extra or overriding evaluation targets, keyed by name.
    #[serde(default)]
    pub targets: BTreeMap<String, EvaluationTarget>,
}

impl MonitorConfig {
    /// Reads `explicit`, or the default location when none is given.
    /// Only a missing default file is tolerated.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => read_config(path),
            None => {
                let path = default_config_path()?;
                match read_config(&path) {
                    Ok(config) => Ok(config),
                    Err(ConfigError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                        Ok(MonitorConfig::default())
                    }
                    Err(err) => Err(err),
                }
            }
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    MissingToken,
    EmptyToken(String),
    NoHome,
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: serde_json::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingToken => write!(
                f,
                "No Groundlight API token found. Set {API_TOKEN_ENV} or add `api_token` to {CONFIG_FILE_NAME}."
            ),
            ConfigError::EmptyToken(context) => {
                write!(f, "{context} must provide a non-empty API token")
            }
            ConfigError::NoHome => {
                write!(f, "Unable to locate a home directory for ~/.config/{CONFIG_FILE_NAME}")
            }
            ConfigError::Io { path, source } => {
                write!(f, "Failed to read config {}: {source}", path.display())
            }
            ConfigError::Parse { path, source } => {
                write!(f, "Failed to parse config {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Fully resolved settings, built once at startup and passed down.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_token: String,
    pub api_url: String,
    pub camera: Option<String>,
    pub targets: BTreeMap<String, EvaluationTarget>,
}

impl Settings {
    /// Loads the config file (explicit path or the default location) and the environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(explicit, |key| env::var(key).ok())
    }

    /// [`Settings::load`] with the environment supplied by `lookup`.
    pub fn load_with<F>(explicit: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = MonitorConfig::load(explicit)?;
        Self::resolve(file, lookup)
    }

    /// Token: environment, then file. URL: file, then environment, then default.
    pub fn resolve<F>(file: MonitorConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_token = resolve_token(&file, &lookup)?;

        let api_url = file
            .api_url
            .clone()
            .filter(|url| !url.is_empty())
            .or_else(|| lookup(API_BASE_ENV).filter(|url| !url.is_empty()))
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let mut targets = builtin_targets();
        targets.extend(file.targets);

        Ok(Self {
            api_token,
            api_url,
            camera: file.camera,
            targets,
        })
    }

    pub fn target(&self, name: &str) -> Option<&EvaluationTarget> {
        self.targets.get(name)
    }
}

fn resolve_token<F>(file: &MonitorConfig, lookup: &F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(token) = lookup(API_TOKEN_ENV) {
        return validate_api_token(&token, API_TOKEN_ENV);
    }
    if let Some(token) = lookup(LEGACY_API_TOKEN_ENV) {
        log::warn!("{LEGACY_API_TOKEN_ENV} is deprecated; set {API_TOKEN_ENV} instead");
        return validate_api_token(&token, LEGACY_API_TOKEN_ENV);
    }
    match &file.api_token {
        Some(token) => validate_api_token(token, CONFIG_FILE_NAME),
        None => Err(ConfigError::MissingToken),
    }
}

fn validate_api_token(token: &str, context: &str) -> Result<String, ConfigError> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        Err(ConfigError::EmptyToken(context.to_string()))
    } else {
        Ok(trimmed.to_owned())
    }
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let mut path = dirs::home_dir().ok_or(ConfigError::NoHome)?;
    path.push(".config");
    path.push(CONFIG_FILE_NAME);
    Ok(path)
}

fn read_config(path: &Path) -> Result<MonitorConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

//! Configuration for code-tutor-rs.
//!
//! `AppConfig` comes from a small JSON document naming where the two MP3
//! files are written. Service credentials come from the environment and are
//! read once at startup.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_PATH: &str = "./config.json";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub language_audio_dir: PathBuf,
    pub explanation_audio_dir: PathBuf,
}

impl AppConfig {
    /// Load and validate the config file. There are no defaults: a missing
    /// file, bad JSON, a missing key or an empty path is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: AppConfig =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;

        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.language_audio_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath("language_audio_dir"));
        }
        if self.explanation_audio_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath("explanation_audio_dir"));
        }
        Ok(())
    }
}

fn require_env(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::MissingEnv(name)),
    }
}

#[derive(Clone)]
pub struct OpenAiCredentials {
    pub api_key: String,
}

impl OpenAiCredentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: require_env("OPENAI_API_KEY")?,
        })
    }
}

#[derive(Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl AwsCredentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
        })
    }
}

// Keep secrets out of debug logs.
impl std::fmt::Debug for OpenAiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCredentials").finish_non_exhaustive()
    }
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .finish_non_exhaustive()
    }
}

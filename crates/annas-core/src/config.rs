//! Configuration loaded from the environment
//!
//! Values are read through a lookup function so callers (and tests) decide
//! where they come from; [`ScraperConfig::from_env`] uses the process
//! environment.

use std::path::PathBuf;

use crate::assist::{DEFAULT_GEMINI_MODEL, GeminiConfig, RetryPolicy};
use crate::client::ClientConfig;
use crate::error::{AnnasError, Result};
use crate::url::DEFAULT_BASE_URL;

pub const BASE_URL_VAR: &str = "ANNAS_BASE_URL";
pub const SECRET_KEY_VAR: &str = "ANNAS_SECRET_KEY";
pub const DOWNLOAD_PATH_VAR: &str = "ANNAS_DOWNLOAD_PATH";
pub const GEMINI_API_KEY_VAR: &str = "GEMINI_API_KEY";
pub const GEMINI_MODEL_VAR: &str = "GEMINI_MODEL";

/// Settings for [`AnnasScraper`](crate::AnnasScraper)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScraperConfig {
    /// Mirror root, without trailing slash
    pub base_url: String,
    pub client: ClientConfig,
    pub gemini: GeminiConfig,
    pub retry: RetryPolicy,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            client: ClientConfig::default(),
            gemini: GeminiConfig::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl ScraperConfig {
    /// Loads the configuration from process environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration through `lookup`
    ///
    /// Blank values count as unset. A missing Gemini key is not an error
    /// here; it only fails once the assisted extractor is actually needed.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Self {
            base_url: get(BASE_URL_VAR)
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            gemini: GeminiConfig {
                api_key: get(GEMINI_API_KEY_VAR),
                model: get(GEMINI_MODEL_VAR).unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                ..defaults.gemini
            },
            ..defaults
        }
    }
}

/// Credentials and destination needed for downloads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSettings {
    pub secret_key: String,
    pub download_dir: PathBuf,
}

impl DownloadSettings {
    /// Loads download settings from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads download settings through `lookup`
    ///
    /// # Errors
    /// `ConfigError` naming the first missing variable
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_lookup_with_dir(lookup, None)
    }

    /// Like [`from_lookup`](Self::from_lookup), with `download_dir` taking
    /// the place of `ANNAS_DOWNLOAD_PATH` when given
    ///
    /// # Errors
    /// `ConfigError` if the secret key is missing, or if neither
    /// `download_dir` nor the variable names a directory
    pub fn from_lookup_with_dir<F>(lookup: F, download_dir: Option<PathBuf>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| {
                    AnnasError::ConfigError(format!("{} environment variable not set", key))
                })
        };

        let secret_key = require(SECRET_KEY_VAR)?;
        let download_dir = match download_dir {
            Some(dir) => dir,
            None => PathBuf::from(require(DOWNLOAD_PATH_VAR)?),
        };

        Ok(Self {
            secret_key,
            download_dir,
        })
    }
}

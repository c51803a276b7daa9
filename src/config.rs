use std::{env, path::PathBuf, time::Duration};

use url::Url;

use crate::error::{ClipFetchError, Result};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";
pub const METADATA_PATH: &str = "/youtube-metadata";
pub const DOWNLOAD_PATH: &str = "/download_youtube";
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);
pub const DEFAULT_EXTENSION: &str = "mp4";

/// Runtime settings injected into the session and its network components.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub debounce: Duration,
    pub request_timeout: Duration,
    pub output_dir: PathBuf,
    pub extension: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            debounce: DEFAULT_DEBOUNCE,
            request_timeout: DEFAULT_TIMEOUT,
            output_dir: PathBuf::from("."),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

impl Config {
    /// Defaults overridden by `CLIPFETCH_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(base) = lookup_trimmed("CLIPFETCH_API_BASE_URL", &lookup) {
            config.api_base_url = base;
        }
        if let Some(ms) = lookup_trimmed("CLIPFETCH_DEBOUNCE_MS", &lookup) {
            let ms = ms.parse::<u64>().map_err(|_| {
                ClipFetchError::ConfigError(format!("CLIPFETCH_DEBOUNCE_MS is not a number: {ms}"))
            })?;
            config.debounce = Duration::from_millis(ms);
        }
        if let Some(secs) = lookup_trimmed("CLIPFETCH_TIMEOUT_SECS", &lookup) {
            let secs = secs.parse::<u64>().map_err(|_| {
                ClipFetchError::ConfigError(format!(
                    "CLIPFETCH_TIMEOUT_SECS is not a number: {secs}"
                ))
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(dir) = lookup_trimmed("CLIPFETCH_OUTPUT_DIR", &lookup) {
            config.output_dir = PathBuf::from(dir);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let parsed = Url::parse(&self.api_base_url).map_err(|e| {
            ClipFetchError::ConfigError(format!("invalid API base URL {}: {e}", self.api_base_url))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClipFetchError::ConfigError(format!(
                "API base URL must be http or https: {}",
                self.api_base_url
            )));
        }
        if self.extension.is_empty() || self.extension.contains(['.', '/', '\\']) {
            return Err(ClipFetchError::ConfigError(format!(
                "invalid file extension: {:?}",
                self.extension
            )));
        }
        Ok(())
    }

    pub fn metadata_endpoint(&self) -> String {
        self.endpoint(METADATA_PATH)
    }

    pub fn download_endpoint(&self) -> String {
        self.endpoint(DOWNLOAD_PATH)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url.trim_end_matches('/'), path)
    }
}

fn lookup_trimmed(key: &str, lookup: &impl Fn(&str) -> Option<String>) -> Option<String> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

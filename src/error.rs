use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClipFetchError {
    #[error("{0}")]
    InvalidReference(String),

    #[error("{0}")]
    ValidationFailure(String),

    #[error("{0}")]
    MetadataFetchFailure(String),

    #[error("{0}")]
    DownloadFailure(String),

    #[error("Network request failed: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Request timeout for URL: {0}")]
    RequestTimeout(String),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

impl ClipFetchError {
    /// Message shown next to the control that triggered the failure.
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

pub type Result<T> = std::result::Result<T, ClipFetchError>;

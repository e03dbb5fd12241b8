//! Error types for webprobe

use thiserror::Error;

/// Main error type for webprobe operations
#[derive(Debug, Error)]
pub enum WebProbeError {
    /// Transport failure: connection refused, timeout, DNS. Always recoverable by the caller.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Scanner error: {0}")]
    ScanError(String),

    #[error("Module '{0}' not found")]
    ModuleNotFound(String),
}

/// Result type alias for webprobe operations
pub type Result<T> = std::result::Result<T, WebProbeError>;

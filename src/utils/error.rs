use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Upstream returned {status} for {url}")]
    UpstreamStatus { status: u16, url: String },

    #[error("Parsing error: {message}")]
    Parse { message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("Source {source_name} timed out after {seconds}s")]
    Timeout { source_name: String, seconds: u64 },

    #[error("All requested sources failed: {0}")]
    AllSourcesFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn browser(err: impl std::fmt::Display) -> Self {
        AppError::Browser(err.to_string())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        AppError::Parse {
            message: message.into(),
        }
    }

    /// Failures worth a second attempt: network trouble, timeouts, browser
    /// navigation problems and 5xx answers from the remote side.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            AppError::Browser(_) => true,
            AppError::Timeout { .. } => true,
            AppError::UpstreamStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

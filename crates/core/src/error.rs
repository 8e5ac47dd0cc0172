use thiserror::Error;

/// Errors raised by the interview core and its store-backed services.
#[derive(Debug, Error)]
pub enum ForgeError {
    /// A score outside the inclusive `0..=10` range (or NaN) was submitted.
    #[error("Invalid score {0}: scores must be between 0 and 10")]
    InvalidScore(f64),
    /// The topic was empty, or unknown where a fixed vocabulary is required.
    #[error("Invalid topic: {0:?}")]
    InvalidTopic(String),
    /// Neither recorded levels nor fallback topics were available.
    #[error("No topics available for selection")]
    NoTopicsAvailable,
    /// The key-value store or the language model could not be reached.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("Session not found: {0}")]
    SessionNotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<redis::RedisError> for ForgeError {
    fn from(e: redis::RedisError) -> Self {
        ForgeError::UpstreamUnavailable(format!("redis: {e}"))
    }
}

impl From<reqwest::Error> for ForgeError {
    fn from(e: reqwest::Error) -> Self {
        ForgeError::UpstreamUnavailable(format!("http: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, ForgeError>;

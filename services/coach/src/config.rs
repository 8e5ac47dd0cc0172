use forge_core::interview::DEFAULT_MAX_QUESTIONS;
use secrecy::SecretString;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Configuration for the console coach.
#[derive(Clone)]
pub struct Config {
    pub redis_url: String,
    pub anthropic_api_key: Option<SecretString>,
    pub chat_model: String,
    pub prompts_dir: Option<PathBuf>,
    pub max_questions: usize,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from a `.env` file and the environment.
    ///
    /// Reads `REDIS_URL`, `ANTHROPIC_API_KEY`, `CHAT_MODEL`, `PROMPTS_DIR`,
    /// `MAX_QUESTIONS` and `RUST_LOG` (default "WARN", so logs stay out of the conversation).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

        let max_questions = match var("MAX_QUESTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    ConfigError::InvalidValue(
                        "MAX_QUESTIONS".to_string(),
                        format!("'{}' is not a positive integer", raw),
                    )
                })?,
            None => DEFAULT_MAX_QUESTIONS,
        };

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "WARN".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            redis_url: var("REDIS_URL").unwrap_or_else(|| "redis://localhost:6379".to_string()),
            anthropic_api_key: var("ANTHROPIC_API_KEY").map(SecretString::from),
            chat_model: var("CHAT_MODEL").unwrap_or_else(|| "claude-3-sonnet-20240229".to_string()),
            prompts_dir: var("PROMPTS_DIR").map(PathBuf::from),
            max_questions,
            log_level,
        })
    }
}

use forge_core::interview::DEFAULT_MAX_QUESTIONS;
use forge_core::room::DEFAULT_DAILY_API_URL;
use secrecy::SecretString;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub redis_url: String,
    pub anthropic_api_key: Option<SecretString>,
    pub chat_model: String,
    pub daily_api_key: Option<SecretString>,
    pub daily_api_url: String,
    pub deepgram_api_key: Option<SecretString>,
    pub prompts_dir: Option<PathBuf>,
    pub max_questions: usize,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// This function will look for a `.env` file in the current directory
    /// and load the following variables:
    ///
    /// *   `BIND_ADDRESS`: The address and port to bind the server to. Defaults to "0.0.0.0:8000".
    /// *   `REDIS_URL`: Where sessions and knowledge are stored. Defaults to "redis://localhost:6379".
    /// *   `ANTHROPIC_API_KEY`: (Optional) Enables model-based evaluation; without it answers get neutral scores.
    /// *   `CHAT_MODEL`: (Optional) The evaluation model. Defaults to "claude-3-sonnet-20240229".
    /// *   `DAILY_API_KEY`: (Optional) Enables real Daily rooms.
    /// *   `DAILY_API_URL`: (Optional) Defaults to "https://api.daily.co/v1".
    /// *   `DEEPGRAM_API_KEY`: (Optional) Together with `DAILY_API_KEY`, enables voice mode.
    /// *   `PROMPTS_DIR`: (Optional) Directory of `.md` files overriding the built-in prompts.
    /// *   `MAX_QUESTIONS`: (Optional) Answers per interview. Defaults to 3.
    /// *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Empty values count as unset, the way a blank line in `.env` reads.
        let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());
        let secret = |key: &str| var(key).map(SecretString::from);

        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:8000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let max_questions = match var("MAX_QUESTIONS") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidValue(
                        "MAX_QUESTIONS".to_string(),
                        format!("'{}' is not a positive integer", raw),
                    ));
                }
            },
            None => DEFAULT_MAX_QUESTIONS,
        };

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address,
            redis_url: var("REDIS_URL").unwrap_or_else(|| "redis://localhost:6379".to_string()),
            anthropic_api_key: secret("ANTHROPIC_API_KEY"),
            chat_model: var("CHAT_MODEL").unwrap_or_else(|| "claude-3-sonnet-20240229".to_string()),
            daily_api_key: secret("DAILY_API_KEY"),
            daily_api_url: var("DAILY_API_URL").unwrap_or_else(|| DEFAULT_DAILY_API_URL.to_string()),
            deepgram_api_key: secret("DEEPGRAM_API_KEY"),
            prompts_dir: var("PROMPTS_DIR").map(PathBuf::from),
            max_questions,
            log_level,
        })
    }

    /// Voice sessions need both a media room and speech recognition.
    pub fn voice_enabled(&self) -> bool {
        self.daily_api_key.is_some() && self.deepgram_api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config(&[]).unwrap();
        assert_eq!(config.bind_address.to_string(), "0.0.0.0:8000");
        assert_eq!(config.redis_url, "redis://localhost:6379");
        assert_eq!(config.chat_model, "claude-3-sonnet-20240229");
        assert_eq!(config.daily_api_url, DEFAULT_DAILY_API_URL);
        assert_eq!(config.max_questions, 3);
        assert_eq!(config.log_level, Level::INFO);
        assert!(config.anthropic_api_key.is_none());
        assert!(!config.voice_enabled());
    }

    #[test]
    fn voice_needs_both_keys() {
        assert!(!config(&[("DAILY_API_KEY", "d")]).unwrap().voice_enabled());
        assert!(!config(&[("DEEPGRAM_API_KEY", "g"), ("DAILY_API_KEY", " ")])
            .unwrap()
            .voice_enabled());
        assert!(config(&[("DAILY_API_KEY", "d"), ("DEEPGRAM_API_KEY", "g")])
            .unwrap()
            .voice_enabled());
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(config(&[("BIND_ADDRESS", "not-an-address")]).is_err());
        assert!(config(&[("MAX_QUESTIONS", "0")]).is_err());
        assert!(config(&[("MAX_QUESTIONS", "many")]).is_err());
        assert!(config(&[("RUST_LOG", "loud")]).is_err());
    }
}

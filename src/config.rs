use std::time::Duration;

use thiserror::Error;

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{name} must be a positive number of seconds, got {value:?}")]
    InvalidTimeout { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub chatgpt_api_key: String,
    pub model: String,
    pub timeout: Duration,
}

impl Config {
    /// Reads the configuration from the process environment (after `.env`
    /// has been loaded).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let timeout = match lookup("QUIZ_TIMEOUT_SECS") {
            Some(value) => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidTimeout {
                        name: "QUIZ_TIMEOUT_SECS",
                        value,
                    })
                }
            },
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            bot_token: required("TELOXIDE_TOKEN")?,
            chatgpt_api_key: required("CHATGPT_API_KEY")?,
            model: lookup("QUIZ_MODEL")
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout,
        })
    }
}

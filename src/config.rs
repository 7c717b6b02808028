//! Environment configuration.
//!
//! Two variables are required; the process refuses to start without them.

use std::fmt;

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// A required environment variable is absent or empty.
    MissingVar(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingVar(name) => {
                write!(f, "missing required environment variable {name}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug)]
pub struct Config {
    /// Telegram bot token from @BotFather.
    pub telegram_bot_token: String,
    /// Google AI Studio API key for Gemini and model listing.
    pub google_api_key: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_values(
            std::env::var("TELEGRAM_BOT_TOKEN").ok(),
            std::env::var("GOOGLE_API_KEY").ok(),
        )
    }

    fn from_values(
        telegram_bot_token: Option<String>,
        google_api_key: Option<String>,
    ) -> Result<Self, ConfigError> {
        let telegram_bot_token = telegram_bot_token
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingVar("TELEGRAM_BOT_TOKEN"))?;
        let google_api_key = google_api_key
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingVar("GOOGLE_API_KEY"))?;

        Ok(Self {
            telegram_bot_token,
            google_api_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_values() {
        let config = Config::from_values(
            Some("123456789:ABCdefGHI".to_string()),
            Some("AIzaKey".to_string()),
        )
        .expect("should accept both values");
        assert_eq!(config.telegram_bot_token, "123456789:ABCdefGHI");
        assert_eq!(config.google_api_key, "AIzaKey");
    }

    #[test]
    fn test_missing_token() {
        let err = Config::from_values(None, Some("AIzaKey".to_string())).unwrap_err();
        assert!(err.to_string().contains("TELEGRAM_BOT_TOKEN"));
    }

    #[test]
    fn test_missing_api_key() {
        let err = Config::from_values(Some("123:abc".to_string()), None).unwrap_err();
        assert!(err.to_string().contains("GOOGLE_API_KEY"));
    }

    #[test]
    fn test_empty_string_counts_as_missing() {
        let err =
            Config::from_values(Some(String::new()), Some("AIzaKey".to_string())).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("TELEGRAM_BOT_TOKEN")));
    }
}

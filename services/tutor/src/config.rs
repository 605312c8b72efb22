//! Application configuration.
//!
//! Centralizes everything loaded from the environment so the rest of the
//! service receives one validated struct.

use secrecy::SecretString;
use std::env;
use tracing::Level;

/// Holds all configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: SecretString,
    pub image_model: String,
    pub chat_model: String,
    pub log_level: Level,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `GEMINI_API_KEY`: Your secret key for the Gemini API. Required.
    // *   `IMAGE_MODEL`: (Optional) Model for image generation. Defaults to "gemini-2.5-flash-image".
    // *   `CHAT_MODEL`: (Optional) Model for transcription and evaluation. Defaults to "gemini-2.5-flash".
    // *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file. Useful for local development, ignored if not present.
        dotenvy::dotenv().ok();

        let gemini_api_key = env::var("GEMINI_API_KEY")
            .map_err(|_| ConfigError::MissingVar("GEMINI_API_KEY".to_string()))?;

        let image_model =
            env::var("IMAGE_MODEL").unwrap_or_else(|_| "gemini-2.5-flash-image".to_string());
        let chat_model = env::var("CHAT_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".to_string());

        let log_level_str = env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        Ok(Self {
            gemini_api_key: SecretString::from(gemini_api_key),
            image_model,
            chat_model,
            log_level,
        })
    }
}

use miette::{Diagnostic, Result};
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Discord API error: {0}")]
    #[diagnostic(code(guildbridge::discord_api))]
    DiscordApi(#[from] serenity::Error),

    #[error("Environment error: {0}")]
    #[diagnostic(
        code(guildbridge::environment),
        help("Set the variable in the environment or in a .env file")
    )]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(guildbridge::config))]
    Config(String),

    #[error("Calendar sync error: {0}")]
    #[diagnostic(code(guildbridge::calendar_sync))]
    CalendarSync(String),

    #[error("GroupMe relay error: {0}")]
    #[diagnostic(code(guildbridge::groupme_relay))]
    Relay(String),

    #[error("HTTP client error: {0}")]
    #[diagnostic(code(guildbridge::http))]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    #[diagnostic(code(guildbridge::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(guildbridge::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(guildbridge::other))]
    Other(String),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type BotResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Missing environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create calendar sync errors
pub fn calendar_error(message: &str) -> Error {
    Error::CalendarSync(message.to_string())
}

/// Helper to create relay errors
pub fn relay_error(message: &str) -> Error {
    Error::Relay(message.to_string())
}

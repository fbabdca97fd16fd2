//! Error types

use crate::ingester::parser::ParseError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BotError>;

#[derive(Debug, Error)]
pub enum BotError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Telegram API error: {0}")]
    Telegram(String),

    /// Another consumer is polling the same bot (HTTP 409)
    #[error("Telegram conflict: another getUpdates consumer is active")]
    Conflict,

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Page agent unavailable: {0}")]
    AgentUnavailable(String),

    #[error("Page agent error: {0}")]
    Agent(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BotError {
    /// Errors worth retrying on the next tick instead of surfacing
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BotError::Http(_) | BotError::Telegram(_) | BotError::Conflict | BotError::Timeout(_)
        )
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for BotError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        BotError::Browser(e.to_string())
    }
}

impl From<regex::Error> for BotError {
    fn from(e: regex::Error) -> Self {
        BotError::InvalidConfig(format!("bad pattern: {}", e))
    }
}

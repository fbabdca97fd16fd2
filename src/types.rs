//! Core domain types shared by the pipeline

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bet market category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketType {
    /// Over/Under
    Totals,
    /// Handicap
    Spreads,
    /// Winner
    Moneyline,
}

impl MarketType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketType::Totals => "TOTALS",
            MarketType::Spreads => "SPREADS",
            MarketType::Moneyline => "MONEYLINE",
        }
    }
}

impl fmt::Display for MarketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Sport {
    Football,
    Basketball,
    Tennis,
    Baseball,
    IceHockey,
    AmericanFootball,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TotalSide {
    Over,
    Under,
}

impl TotalSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TotalSide::Over => "OVER",
            TotalSide::Under => "UNDER",
        }
    }
}

/// What the alert tells us to back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Selection {
    Total { side: TotalSide, line: String },
    Spread { team: String, handicap: String },
    Moneyline { team: String },
}

impl Selection {
    /// Flat pick text as it appears in alerts, e.g. `OVER 2.5` or `RED SOX -1.5`
    pub fn pick(&self) -> String {
        match self {
            Selection::Total { side, line } => format!("{} {}", side.as_str(), line),
            Selection::Spread { team, handicap } => format!("{} {}", team, handicap),
            Selection::Moneyline { team } => team.clone(),
        }
    }

    pub fn market_type(&self) -> MarketType {
        match self {
            Selection::Total { .. } => MarketType::Totals,
            Selection::Spread { .. } => MarketType::Spreads,
            Selection::Moneyline { .. } => MarketType::Moneyline,
        }
    }

    pub fn team(&self) -> Option<&str> {
        match self {
            Selection::Total { .. } => None,
            Selection::Spread { team, .. } | Selection::Moneyline { team } => Some(team),
        }
    }
}

/// A channel post or chat message as delivered by the message source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub update_id: i64,
    pub message_id: i64,
    pub chat_id: i64,
    pub text: String,
}

/// Structured bet intent extracted from an alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedBet {
    pub market_type: MarketType,
    pub selection: Selection,
    pub target_odds: Decimal,
    pub link: String,
    pub stake: Decimal,
    pub sport: Sport,
    pub source_message_id: i64,
}

impl ParsedBet {
    pub fn pick(&self) -> String {
        self.selection.pick()
    }

    /// Correlation key used on the message bus
    pub fn job_key(&self) -> String {
        self.source_message_id.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub bet: ParsedBet,
    pub enqueued_at: DateTime<Utc>,
}

impl QueueEntry {
    pub fn new(bet: ParsedBet) -> Self {
        Self {
            bet,
            enqueued_at: Utc::now(),
        }
    }
}

/// Prefix of correlation keys for operator-initiated bets
pub const MANUAL_KEY_PREFIX: &str = "manual_";

/// Completion record for one bet execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    pub message_id: String,
}

impl BetResult {
    pub fn placed(message_id: impl Into<String>, amount: Decimal) -> Self {
        Self {
            success: true,
            error: None,
            amount: Some(amount),
            message_id: message_id.into(),
        }
    }

    pub fn failed(message_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            amount: None,
            message_id: message_id.into(),
        }
    }

    pub fn is_manual(&self) -> bool {
        self.message_id.starts_with(MANUAL_KEY_PREFIX)
    }

    /// Telegram message id to thread the echo under, if any
    pub fn reply_to(&self) -> Option<i64> {
        if self.is_manual() {
            return None;
        }
        self.message_id.parse().ok()
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// Operator-editable bot settings, persisted on every change
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct BotSettings {
    pub bot_token: String,
    pub chat_id: String,
    pub credentials: Credentials,
    pub default_stake: Decimal,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub logged_in: bool,
}

impl BotSettings {
    pub fn has_telegram(&self) -> bool {
        !self.bot_token.is_empty() && !self.chat_id.is_empty()
    }
}

impl fmt::Debug for BotSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotSettings")
            .field("bot_token", &if self.bot_token.is_empty() { "pending" } else { "set" })
            .field("chat_id", &self.chat_id)
            .field("credentials", &self.credentials)
            .field("default_stake", &self.default_stake)
            .field("active", &self.active)
            .field("logged_in", &self.logged_in)
            .finish()
    }
}

/// Partial update of [`BotSettings`] coming from the operator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub default_stake: Option<Decimal>,
}

impl SettingsUpdate {
    pub fn apply(self, settings: &mut BotSettings) {
        if let Some(token) = self.bot_token {
            settings.bot_token = token;
        }
        if let Some(chat_id) = self.chat_id {
            settings.chat_id = chat_id;
        }
        if let Some(email) = self.email {
            settings.credentials.email = email;
        }
        if let Some(password) = self.password {
            settings.credentials.password = password;
        }
        if let Some(stake) = self.default_stake {
            settings.default_stake = stake;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Success,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

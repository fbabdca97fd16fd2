//! Operator notifications
//!
//! Every outcome lands in the rolling [`LogBuffer`]; bet results are also echoed to the
//! alert chat as a reply to the alert that triggered them.

use crate::error::Result;
use crate::monitor::LogBuffer;
use crate::telegram::TelegramClient;
use crate::types::{BetResult, LogLevel};
use std::sync::Arc;
use tokio::sync::RwLock;

struct Channel {
    client: TelegramClient,
    chat_id: String,
}

#[derive(Clone)]
pub struct Notifier {
    channel: Arc<RwLock<Option<Channel>>>,
    log: Arc<LogBuffer>,
}

impl Notifier {
    pub fn new(client: TelegramClient, chat_id: impl Into<String>, log: Arc<LogBuffer>) -> Self {
        Self {
            channel: Arc::new(RwLock::new(Some(Channel {
                client,
                chat_id: chat_id.into(),
            }))),
            log,
        }
    }

    /// Log-only notifier; Telegram messages are dropped
    pub fn disabled(log: Arc<LogBuffer>) -> Self {
        Self {
            channel: Arc::new(RwLock::new(None)),
            log,
        }
    }

    /// Swap the chat channel after the operator changes credentials
    pub async fn reconfigure(&self, channel: Option<(TelegramClient, String)>) {
        *self.channel.write().await = channel.map(|(client, chat_id)| Channel { client, chat_id });
    }

    pub async fn is_enabled(&self) -> bool {
        self.channel.read().await.is_some()
    }

    pub fn log_buffer(&self) -> &Arc<LogBuffer> {
        &self.log
    }

    pub async fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.log.push(level, message).await;
    }

    /// Send a chat message, optionally threaded under `reply_to`
    pub async fn send(&self, text: &str, reply_to: Option<i64>) -> Result<()> {
        let channel = self.channel.read().await;
        let Some(channel) = channel.as_ref() else {
            tracing::debug!("Telegram disabled, not sending: {}", text);
            return Ok(());
        };
        channel.client.send_message(&channel.chat_id, text, reply_to).await
    }

    pub async fn startup(&self) -> Result<()> {
        self.log(LogLevel::Info, "Bot started").await;
        self.send("🤖 Surebet bot started, watching for alerts", None).await
    }

    pub async fn error(&self, context: &str, message: &str) -> Result<()> {
        self.log(LogLevel::Error, format!("{}: {}", context, message)).await;
        self.send(&format!("⚠️ {}: {}", context, message), None).await
    }

    /// Record a bet outcome and echo it under the originating alert
    pub async fn bet_result(&self, result: &BetResult) {
        let text = result_text(result);
        let level = if result.success {
            LogLevel::Success
        } else {
            LogLevel::Error
        };
        self.log(level, text.clone()).await;

        if result.is_manual() {
            return;
        }
        if let Err(e) = self.send(&text, result.reply_to()).await {
            tracing::warn!("Could not echo result for message {}: {}", result.message_id, e);
        }
    }
}

/// Chat text for a bet outcome
pub fn result_text(result: &BetResult) -> String {
    if result.success {
        match result.amount {
            Some(amount) => format!("✅ Arbitrage executed: {}€", amount),
            None => "✅ Arbitrage executed".to_string(),
        }
    } else {
        format!(
            "❌ Arbitrage failed: {}",
            result.error.as_deref().unwrap_or("unknown error")
        )
    }
}

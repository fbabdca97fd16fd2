//! Telegram Bot API client
//!
//! Thin wrapper over the few methods the bot needs: `getUpdates` for the alert
//! channel, `sendMessage` for threaded result echoes and `getMe` for the connection
//! probe.

use crate::config::TelegramConfig;
use crate::error::{BotError, Result};
use crate::types::IncomingMessage;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;


/// Telegram Bot API client bound to one bot token
#[derive(Clone)]
pub struct TelegramClient {
    http: Client,
    api_base: String,
    bot_token: String,
    long_poll_timeout: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TelegramMessage>,
    #[serde(default)]
    pub channel_post: Option<TelegramMessage>,
}

impl TelegramUpdate {
    /// Channel posts take precedence over direct messages
    pub fn into_incoming(self) -> Option<IncomingMessage> {
        let update_id = self.update_id;
        let msg = self.channel_post.or(self.message)?;
        Some(IncomingMessage {
            update_id,
            message_id: msg.message_id,
            chat_id: msg.chat.id,
            text: msg.text.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub chat: TelegramChat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotUser {
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to_message_id: Option<i64>,
}

impl TelegramClient {
    pub fn new(api_base: impl Into<String>, bot_token: impl Into<String>, long_poll_timeout: u64) -> Self {
        // Request timeout must outlive the long poll
        let http = Client::builder()
            .timeout(Duration::from_secs(long_poll_timeout + 10))
            .build()
            .unwrap_or_default();

        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
            long_poll_timeout,
        }
    }

    pub fn from_config(config: &TelegramConfig, bot_token: &str) -> Self {
        Self::new(&config.api_base, bot_token, config.long_poll_timeout_secs)
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }

    async fn call<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::CONFLICT {
            return Err(BotError::Conflict);
        }

        let body: ApiResponse<T> = match response.json().await {
            Ok(body) => body,
            Err(e) if !status.is_success() => {
                return Err(BotError::Telegram(format!("HTTP {}: {}", status.as_u16(), e)));
            }
            Err(e) => return Err(e.into()),
        };

        if !body.ok {
            return Err(BotError::Telegram(
                body.description
                    .unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
            ));
        }

        body.result
            .ok_or_else(|| BotError::Telegram("response without result".into()))
    }

    /// Long-poll for updates after `offset - 1`
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<TelegramUpdate>> {
        let request = self.http.get(self.method_url("getUpdates")).query(&[
            ("offset", offset.to_string()),
            ("timeout", self.long_poll_timeout.to_string()),
        ]);
        self.call(request).await
    }

    /// Id of the newest pending update, if the bot has any
    pub async fn latest_update_id(&self) -> Result<Option<i64>> {
        let request = self
            .http
            .get(self.method_url("getUpdates"))
            .query(&[("offset", "-1"), ("limit", "1")]);
        let updates: Vec<TelegramUpdate> = self.call(request).await?;
        Ok(updates.last().map(|u| u.update_id))
    }

    /// Most recent updates without moving the server-side offset
    pub async fn recent_updates(&self, limit: u32) -> Result<Vec<TelegramUpdate>> {
        let request = self
            .http
            .get(self.method_url("getUpdates"))
            .query(&[("limit", limit.to_string())]);
        self.call(request).await
    }

    pub async fn send_message(&self, chat_id: &str, text: &str, reply_to: Option<i64>) -> Result<()> {
        let request = SendMessageRequest {
            chat_id,
            text,
            reply_to_message_id: reply_to,
        };
        let _: serde_json::Value = self
            .call(self.http.post(self.method_url("sendMessage")).json(&request))
            .await?;
        Ok(())
    }

    pub async fn get_me(&self) -> Result<BotUser> {
        self.call(self.http.get(self.method_url("getMe"))).await
    }
}

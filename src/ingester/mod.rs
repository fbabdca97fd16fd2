//! Alert ingestion
//!
//! The poller pulls updates past the persisted cursor, the classifier drops chatter
//! and the parser turns alerts into [`ParsedBet`](crate::types::ParsedBet)s.

pub mod classifier;
pub mod parser;
mod telegram;

#[cfg(test)]
mod tests;

pub use classifier::{Classification, MessageClassifier};
pub use parser::{BetParser, ParseError};

use crate::error::{BotError, Result};
use crate::storage::StateRepository;
use crate::types::IncomingMessage;
use async_trait::async_trait;
use parking_lot::Mutex;
use regex::Regex;
use std::sync::Arc;

/// Matches an http(s) URL on one of the given hosts or their subdomains
pub(crate) fn site_url_regex(hosts: &[String]) -> Result<Regex> {
    if hosts.is_empty() {
        return Err(BotError::InvalidConfig("no site hosts configured".into()));
    }
    let hosts = hosts
        .iter()
        .map(|h| regex::escape(h))
        .collect::<Vec<_>>()
        .join("|");
    Ok(Regex::new(&format!(
        r#"(?i)https?://(?:[a-z0-9-]+\.)*(?:{})(?:[/?#][^\s()<>\[\]"']*)?"#,
        hosts
    ))?)
}

/// One update from the source; `message` is `None` for update kinds we ignore
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawUpdate {
    pub update_id: i64,
    pub message: Option<IncomingMessage>,
}

/// Where alerts come from
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Updates with `update_id >= offset`
    async fn fetch(&self, offset: i64) -> Result<Vec<RawUpdate>>;

    /// Newest update id currently available, if any
    async fn latest_update_id(&self) -> Result<Option<i64>>;
}

/// Cursor-driven update poller
pub struct UpdatePoller {
    source: Arc<dyn MessageSource>,
    repo: StateRepository,
    cursor: Mutex<i64>,
}

impl UpdatePoller {
    pub async fn new(source: Arc<dyn MessageSource>, repo: StateRepository) -> Result<Self> {
        let cursor = repo.cursor().await?;
        Ok(Self {
            source,
            repo,
            cursor: Mutex::new(cursor),
        })
    }

    pub fn cursor(&self) -> i64 {
        *self.cursor.lock()
    }

    /// Move the cursor forward, never back, and persist it
    async fn advance(&self, to: i64) -> Result<bool> {
        {
            let mut cursor = self.cursor.lock();
            if to <= *cursor {
                return Ok(false);
            }
            *cursor = to;
        }
        self.repo.set_cursor(to).await?;
        Ok(true)
    }

    /// Jump past everything already waiting so only new alerts are handled
    pub async fn skip_backlog(&self) -> Result<()> {
        match self.source.latest_update_id().await? {
            Some(latest) => {
                if self.advance(latest).await? {
                    tracing::info!("Skipped backlog, cursor at {}", latest);
                }
            }
            None => tracing::info!("No pending updates, starting from cursor {}", self.cursor()),
        }
        Ok(())
    }

    /// Fetch one batch. The cursor advances past every update seen, whatever its content.
    pub async fn poll_once(&self) -> Result<Vec<IncomingMessage>> {
        let cursor = self.cursor();
        let updates = self.source.fetch(cursor + 1).await?;

        let Some(max_id) = updates.iter().map(|u| u.update_id).max() else {
            return Ok(Vec::new());
        };

        let messages: Vec<IncomingMessage> = updates
            .into_iter()
            .filter(|u| u.update_id > cursor)
            .filter_map(|u| u.message)
            .collect();

        self.advance(max_id).await?;

        if !messages.is_empty() {
            tracing::debug!("Received {} new messages, cursor at {}", messages.len(), max_id);
        }
        Ok(messages)
    }

    /// [`poll_once`](Self::poll_once) with the error policy applied: conflicts are
    /// silent, everything else is logged and retried on the next tick
    pub async fn tick(&self) -> Vec<IncomingMessage> {
        match self.poll_once().await {
            Ok(messages) => messages,
            Err(BotError::Conflict) => {
                tracing::debug!("Another consumer is polling this bot, backing off");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!("Polling failed, retrying next tick: {}", e);
                Vec::new()
            }
        }
    }
}

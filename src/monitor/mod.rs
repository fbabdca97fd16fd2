//! Operator log and dashboard

pub mod dashboard;

pub use dashboard::{create_router, start_dashboard};

use crate::storage::StateRepository;
use crate::types::{LogEntry, LogLevel};
use chrono::Utc;
use std::collections::VecDeque;
use tokio::sync::RwLock;

/// Longest message kept in the operator log
const MAX_MESSAGE_CHARS: usize = 300;

/// Rolling operator log, persisted after every append
pub struct LogBuffer {
    entries: RwLock<VecDeque<LogEntry>>,
    max_entries: usize,
    repo: StateRepository,
}

impl LogBuffer {
    /// Restore the saved log, keeping only the newest `max_entries`
    pub async fn load(repo: StateRepository, max_entries: usize) -> Self {
        let mut entries: VecDeque<LogEntry> = match repo.log_entries().await {
            Ok(saved) => saved.into(),
            Err(e) => {
                tracing::warn!("Could not restore operator log: {}", e);
                VecDeque::new()
            }
        };
        while entries.len() > max_entries {
            entries.pop_front();
        }

        Self {
            entries: RwLock::new(entries),
            max_entries,
            repo,
        }
    }

    pub async fn push(&self, level: LogLevel, message: impl Into<String>) {
        let mut message: String = message.into();
        if message.chars().count() > MAX_MESSAGE_CHARS {
            message = message.chars().take(MAX_MESSAGE_CHARS).collect::<String>() + "…";
        }

        let snapshot: Vec<LogEntry> = {
            let mut entries = self.entries.write().await;
            if entries.len() >= self.max_entries {
                entries.pop_front();
            }
            entries.push_back(LogEntry {
                timestamp: Utc::now(),
                level,
                message,
            });
            entries.iter().cloned().collect()
        };

        if let Err(e) = self.repo.save_log_entries(&snapshot).await {
            tracing::warn!("Could not persist operator log: {}", e);
        }
    }

    /// Newest `limit` entries, oldest first
    pub async fn recent(&self, limit: usize) -> Vec<LogEntry> {
        let entries = self.entries.read().await;
        let skip = entries.len().saturating_sub(limit);
        entries.iter().skip(skip).cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

//! Single-slot bet queue
//!
//! Bets run strictly one at a time. The slot is a persisted in-flight marker rather than
//! a lock held across the job, so a crash mid-bet leaves the marker behind and nothing
//! runs again until an operator clears it.

#[cfg(test)]
mod tests;

use crate::config::QueueConfig;
use crate::error::Result;
use crate::notify::Notifier;
use crate::storage::StateRepository;
use crate::types::{BetResult, ParsedBet, QueueEntry};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

/// Runs one bet to completion
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BetExecutor: Send + Sync {
    async fn execute(&self, bet: &ParsedBet) -> Result<BetResult>;
}

/// Bounded set of handled message ids; the oldest id is forgotten first
#[derive(Debug, Clone)]
pub struct DedupSet {
    order: VecDeque<String>,
    ids: HashSet<String>,
    capacity: usize,
}

impl DedupSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(capacity),
            ids: HashSet::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn from_ids(ids: Vec<String>, capacity: usize) -> Self {
        let mut set = Self::new(capacity);
        for id in ids {
            set.insert(id);
        }
        set
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Returns false if the id was already present
    pub fn insert(&mut self, id: String) -> bool {
        if self.ids.contains(&id) {
            return false;
        }
        if self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
        self.ids.insert(id.clone());
        self.order.push_back(id);
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.order.iter().cloned().collect()
    }
}

enum Claim {
    Busy,
    Empty,
    Job(QueueEntry),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrainOutcome {
    /// The slot is taken, by another drain or a stale marker
    Busy,
    /// Results of the jobs run by this call, in order
    Processed(Vec<BetResult>),
}

pub struct JobQueue {
    pending: Mutex<VecDeque<QueueEntry>>,
    dedup: Mutex<DedupSet>,
    slot: tokio::sync::Mutex<()>,
    repo: StateRepository,
    executor: Arc<dyn BetExecutor>,
    notifier: Notifier,
    config: QueueConfig,
}

impl JobQueue {
    pub async fn new(
        config: QueueConfig,
        repo: StateRepository,
        executor: Arc<dyn BetExecutor>,
        notifier: Notifier,
    ) -> Result<Self> {
        let dedup = DedupSet::from_ids(repo.dedup_ids().await?, config.dedup_capacity);
        tracing::debug!("Loaded {} processed message ids", dedup.len());

        Ok(Self {
            pending: Mutex::new(VecDeque::new()),
            dedup: Mutex::new(dedup),
            slot: tokio::sync::Mutex::new(()),
            repo,
            executor,
            notifier,
            config,
        })
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Queue a bet unless its message was seen before. Returns whether it was added.
    pub async fn enqueue(&self, bet: ParsedBet) -> Result<bool> {
        let key = bet.job_key();
        let ids = {
            let dedup = self.dedup.lock();
            if dedup.contains(&key) {
                tracing::debug!("Message {} already handled, skipping", key);
                return Ok(false);
            }
            let mut next = dedup.clone();
            next.insert(key.clone());
            next.to_vec()
        };
        // The id counts as seen only once it is persisted
        self.repo.save_dedup_ids(&ids).await?;
        if !self.dedup.lock().insert(key.clone()) {
            return Ok(false);
        }

        let pending = {
            let mut queue = self.pending.lock();
            queue.push_back(QueueEntry::new(bet));
            queue.len()
        };
        tracing::info!("Queued bet for message {} ({} pending)", key, pending);
        Ok(true)
    }

    /// Key of the job holding the slot, if any
    pub async fn in_flight(&self) -> Result<Option<String>> {
        self.repo.marker().await
    }

    /// Take the next entry and claim the slot, or report the slot busy
    async fn claim_next(&self) -> Result<Claim> {
        let _slot = self.slot.lock().await;
        if let Some(key) = self.repo.marker().await? {
            tracing::debug!("Slot held by job {}, not draining", key);
            return Ok(Claim::Busy);
        }

        let Some(entry) = self.pending.lock().pop_front() else {
            return Ok(Claim::Empty);
        };
        self.repo.set_marker(&entry.bet.job_key()).await?;
        Ok(Claim::Job(entry))
    }

    /// Run queued bets one after another until the queue is empty
    pub async fn drain(&self) -> Result<DrainOutcome> {
        let mut results = Vec::new();

        loop {
            let entry = match self.claim_next().await? {
                Claim::Busy if results.is_empty() => return Ok(DrainOutcome::Busy),
                Claim::Busy | Claim::Empty => break,
                Claim::Job(entry) => entry,
            };

            let result = self.run(&entry).await;
            let cleared = self.repo.clear_marker().await;
            self.notifier.bet_result(&result).await;
            if let Err(e) = cleared {
                tracing::error!("Could not release slot after job {}: {}", result.message_id, e);
                return Err(e);
            }
            results.push(result);

            if self.is_empty() {
                break;
            }
            tokio::time::sleep(self.config.inter_job_delay()).await;
        }

        Ok(DrainOutcome::Processed(results))
    }

    async fn run(&self, entry: &QueueEntry) -> BetResult {
        let bet = &entry.bet;
        let key = bet.job_key();
        let waited = chrono::Utc::now() - entry.enqueued_at;
        tracing::info!(
            "Executing {} '{}' for message {} (queued {}ms)",
            bet.market_type,
            bet.pick(),
            key,
            waited.num_milliseconds()
        );

        match tokio::time::timeout(self.config.job_timeout(), self.executor.execute(bet)).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                tracing::warn!("Job {} failed: {}", key, e);
                BetResult::failed(key, e.to_string())
            }
            Err(_) => {
                tracing::warn!("Job {} timed out", key);
                BetResult::failed(
                    key,
                    format!("timed out after {}s", self.config.job_timeout_secs),
                )
            }
        }
    }

    /// Operator recovery: release the slot
    pub async fn clear_marker(&self) -> Result<Option<String>> {
        let _slot = self.slot.lock().await;
        let marker = self.repo.marker().await?;
        if let Some(key) = &marker {
            self.repo.clear_marker().await?;
            tracing::info!("Cleared in-flight marker for job {}", key);
        }
        Ok(marker)
    }

    /// Tell the operator about a marker left by an unclean shutdown. The marker stays
    /// until [`clear_marker`](Self::clear_marker); the abandoned job is never retried.
    pub async fn report_stale_marker(&self) -> Result<Option<String>> {
        let Some(key) = self.repo.marker().await? else {
            return Ok(None);
        };
        tracing::warn!("In-flight marker for job {} found at startup", key);
        let message = format!(
            "job for message {} may have been abandoned; queue paused until the marker is cleared",
            key
        );
        if let Err(e) = self.notifier.error("Recovery", &message).await {
            tracing::warn!("Could not send recovery notice: {}", e);
        }
        Ok(Some(key))
    }

    /// Drop every pending entry; returns how many were dropped
    pub fn clear(&self) -> usize {
        let mut pending = self.pending.lock();
        let dropped = pending.len();
        pending.clear();
        if dropped > 0 {
            tracing::info!("Dropped {} pending bets", dropped);
        }
        dropped
    }
}

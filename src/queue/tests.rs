use super::*;
use crate::error::BotError;
use crate::monitor::LogBuffer;
use crate::storage::{KeyValueStore, MemoryStore};
use crate::types::{MarketType, Selection, Sport, TotalSide};
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

fn bet(message_id: i64) -> ParsedBet {
    ParsedBet {
        market_type: MarketType::Totals,
        selection: Selection::Total {
            side: TotalSide::Over,
            line: "2.5".into(),
        },
        target_odds: dec!(2.05),
        link: "https://www.winamax.es/apuestas-deportivas/match/1".into(),
        stake: dec!(30),
        sport: Sport::Football,
        source_message_id: message_id,
    }
}

fn fast_config() -> QueueConfig {
    QueueConfig {
        inter_job_delay_ms: 0,
        ..Default::default()
    }
}

async fn queue_with(
    executor: impl BetExecutor + 'static,
    repo: StateRepository,
    config: QueueConfig,
) -> JobQueue {
    let log = Arc::new(LogBuffer::load(repo.clone(), 50).await);
    JobQueue::new(config, repo, Arc::new(executor), Notifier::disabled(log))
        .await
        .unwrap()
}

fn placing_executor() -> MockBetExecutor {
    let mut executor = MockBetExecutor::new();
    executor
        .expect_execute()
        .returning(|bet| Ok(BetResult::placed(bet.job_key(), bet.stake)));
    executor
}

#[test]
fn test_dedup_set_evicts_oldest() {
    let mut set = DedupSet::new(2);
    assert!(set.insert("1".into()));
    assert!(set.insert("2".into()));
    assert!(!set.insert("1".into()));
    assert!(set.insert("3".into()));
    assert!(!set.contains("1"));
    assert_eq!(set.to_vec(), vec!["2", "3"]);
}

#[tokio::test]
async fn test_duplicate_enqueue_leaves_length_unchanged() {
    let queue = queue_with(MockBetExecutor::new(), StateRepository::in_memory(), fast_config()).await;

    assert!(queue.enqueue(bet(10)).await.unwrap());
    assert_eq!(queue.len(), 1);
    assert!(!queue.enqueue(bet(10)).await.unwrap());
    assert_eq!(queue.len(), 1);
}

#[tokio::test]
async fn test_dedup_survives_restart() {
    let repo = StateRepository::in_memory();
    let first = queue_with(MockBetExecutor::new(), repo.clone(), fast_config()).await;
    first.enqueue(bet(10)).await.unwrap();

    let second = queue_with(MockBetExecutor::new(), repo, fast_config()).await;
    assert!(!second.enqueue(bet(10)).await.unwrap());
    assert!(second.is_empty());
}

#[tokio::test]
async fn test_drain_runs_in_order_and_clears_marker() {
    let repo = StateRepository::in_memory();
    let queue = queue_with(placing_executor(), repo.clone(), fast_config()).await;
    queue.enqueue(bet(1)).await.unwrap();
    queue.enqueue(bet(2)).await.unwrap();

    match queue.drain().await.unwrap() {
        DrainOutcome::Processed(results) => {
            let ids: Vec<_> = results.iter().map(|r| r.message_id.as_str()).collect();
            assert_eq!(ids, vec!["1", "2"]);
            assert!(results.iter().all(|r| r.success));
        }
        DrainOutcome::Busy => panic!("queue should not be busy"),
    }
    assert!(queue.is_empty());
    assert_eq!(repo.marker().await.unwrap(), None);
}

#[tokio::test]
async fn test_persisted_marker_blocks_until_cleared() {
    let repo = StateRepository::in_memory();
    repo.set_marker("99").await.unwrap();

    let mut executor = MockBetExecutor::new();
    executor
        .expect_execute()
        .times(1)
        .returning(|bet| Ok(BetResult::placed(bet.job_key(), bet.stake)));
    let queue = queue_with(executor, repo.clone(), fast_config()).await;
    queue.enqueue(bet(1)).await.unwrap();

    assert_eq!(queue.report_stale_marker().await.unwrap().as_deref(), Some("99"));
    assert_eq!(queue.drain().await.unwrap(), DrainOutcome::Busy);
    assert_eq!(queue.len(), 1);

    assert_eq!(queue.clear_marker().await.unwrap().as_deref(), Some("99"));
    match queue.drain().await.unwrap() {
        DrainOutcome::Processed(results) => assert_eq!(results.len(), 1),
        DrainOutcome::Busy => panic!("marker was cleared"),
    }
}

#[tokio::test]
async fn test_failures_are_not_retried() {
    let mut executor = MockBetExecutor::new();
    executor
        .expect_execute()
        .times(1)
        .returning(|_| Err(BotError::AgentUnavailable("tab 1".into())));
    let queue = queue_with(executor, StateRepository::in_memory(), fast_config()).await;
    queue.enqueue(bet(5)).await.unwrap();

    let DrainOutcome::Processed(results) = queue.drain().await.unwrap() else {
        panic!("queue should not be busy");
    };
    assert_eq!(results.len(), 1);
    assert!(!results[0].success);
    assert_eq!(results[0].error.as_deref(), Some("Page agent unavailable: tab 1"));

    assert_eq!(queue.drain().await.unwrap(), DrainOutcome::Processed(Vec::new()));
}

struct StuckExecutor;

#[async_trait]
impl BetExecutor for StuckExecutor {
    async fn execute(&self, _bet: &ParsedBet) -> Result<BetResult> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        unreachable!("job should have timed out")
    }
}

#[tokio::test(start_paused = true)]
async fn test_timeout_frees_the_queue() {
    let repo = StateRepository::in_memory();
    let queue = queue_with(StuckExecutor, repo.clone(), fast_config()).await;
    queue.enqueue(bet(7)).await.unwrap();

    let DrainOutcome::Processed(results) = queue.drain().await.unwrap() else {
        panic!("queue should not be busy");
    };
    assert_eq!(results[0].error.as_deref(), Some("timed out after 60s"));
    assert_eq!(repo.marker().await.unwrap(), None);
}

#[tokio::test]
async fn test_clear_drops_pending() {
    let queue = queue_with(MockBetExecutor::new(), StateRepository::in_memory(), fast_config()).await;
    queue.enqueue(bet(1)).await.unwrap();
    queue.enqueue(bet(2)).await.unwrap();
    assert_eq!(queue.clear(), 2);
    assert!(queue.is_empty());
    // Cleared ids stay deduplicated
    assert!(!queue.enqueue(bet(1)).await.unwrap());
}

/// Store whose writes or deletes can be switched to fail
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail_sets: AtomicBool,
    fail_deletes: AtomicBool,
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_sets.load(Ordering::SeqCst) {
            return Err(BotError::Internal("disk full".into()));
        }
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(BotError::Internal("disk full".into()));
        }
        self.inner.delete(key).await
    }
}

#[tokio::test]
async fn test_unsaved_id_can_be_enqueued_again() {
    let store = Arc::new(FlakyStore::default());
    let repo = StateRepository::new(store.clone());
    let queue = queue_with(MockBetExecutor::new(), repo, fast_config()).await;

    store.fail_sets.store(true, Ordering::SeqCst);
    assert!(queue.enqueue(bet(10)).await.is_err());
    assert!(queue.is_empty());

    store.fail_sets.store(false, Ordering::SeqCst);
    assert!(queue.enqueue(bet(10)).await.unwrap());
    assert_eq!(queue.len(), 1);
}

#[tokio::test]
async fn test_result_reported_when_slot_release_fails() {
    let store = Arc::new(FlakyStore::default());
    let repo = StateRepository::new(store.clone());
    let log = Arc::new(LogBuffer::load(StateRepository::in_memory(), 50).await);
    let queue = JobQueue::new(
        fast_config(),
        repo.clone(),
        Arc::new(placing_executor()),
        Notifier::disabled(log.clone()),
    )
    .await
    .unwrap();
    queue.enqueue(bet(3)).await.unwrap();

    store.fail_deletes.store(true, Ordering::SeqCst);
    assert!(queue.drain().await.is_err());

    let entries = log.recent(10).await;
    assert!(entries
        .iter()
        .any(|e| e.message == "✅ Arbitrage executed: 30€"));
    assert_eq!(repo.marker().await.unwrap().as_deref(), Some("3"));
}

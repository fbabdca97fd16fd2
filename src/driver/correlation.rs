//! Pending-result table
//!
//! Results come back on the event channel long after the request was acknowledged.
//! Each caller registers a key before sending, then waits on its [`Waiter`]. A waiter
//! that is dropped (timeout, cancelled job) removes its own entry.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

struct Pending<T> {
    tx: oneshot::Sender<T>,
    deadline: Instant,
    token: u64,
}

struct Inner<T> {
    pending: HashMap<String, Pending<T>>,
    next_token: u64,
}

pub struct CorrelationTable<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for CorrelationTable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for CorrelationTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CorrelationTable<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                pending: HashMap::new(),
                next_token: 0,
            })),
        }
    }

    /// Register `key`; a previous waiter under the same key is replaced
    pub fn register(&self, key: impl Into<String>, ttl: Duration) -> Waiter<T> {
        let key = key.into();
        let (tx, rx) = oneshot::channel();
        let mut inner = self.inner.lock();

        let now = Instant::now();
        inner.pending.retain(|k, p| {
            let live = p.deadline > now;
            if !live {
                tracing::debug!("Dropping expired waiter '{}'", k);
            }
            live
        });

        inner.next_token += 1;
        let token = inner.next_token;
        if inner
            .pending
            .insert(
                key.clone(),
                Pending {
                    tx,
                    deadline: now + ttl,
                    token,
                },
            )
            .is_some()
        {
            tracing::warn!("Replaced pending waiter '{}'", key);
        }

        Waiter {
            key,
            token,
            ttl,
            rx,
            table: Arc::clone(&self.inner),
        }
    }

    /// Hand `value` to the waiter for `key`. Returns false when nobody is waiting.
    pub fn resolve(&self, key: &str, value: T) -> bool {
        let Some(pending) = self.inner.lock().pending.remove(key) else {
            return false;
        };
        pending.tx.send(value).is_ok()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every waiter; their `wait` returns `None`
    pub fn clear(&self) {
        self.inner.lock().pending.clear();
    }
}

pub struct Waiter<T> {
    key: String,
    token: u64,
    ttl: Duration,
    rx: oneshot::Receiver<T>,
    table: Arc<Mutex<Inner<T>>>,
}

impl<T> Waiter<T> {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Value, or `None` on timeout or when the table was cleared
    pub async fn wait(mut self) -> Option<T> {
        tokio::time::timeout(self.ttl, &mut self.rx).await.ok()?.ok()
    }
}

impl<T> Drop for Waiter<T> {
    fn drop(&mut self) {
        let mut inner = self.table.lock();
        if inner.pending.get(&self.key).is_some_and(|p| p.token == self.token) {
            inner.pending.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_delivers_value() {
        let table = CorrelationTable::<u32>::new();
        let waiter = table.register("42", Duration::from_secs(1));
        assert!(table.resolve("42", 7));
        assert_eq!(waiter.wait().await, Some(7));
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_key_is_ignored() {
        let table = CorrelationTable::<u32>::new();
        assert!(!table.resolve("nobody", 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_deregisters() {
        let table = CorrelationTable::<u32>::new();
        let waiter = table.register("42", Duration::from_millis(50));
        assert_eq!(waiter.wait().await, None);
        assert!(table.is_empty());
        assert!(!table.resolve("42", 1));
    }

    #[tokio::test]
    async fn test_drop_deregisters() {
        let table = CorrelationTable::<u32>::new();
        drop(table.register("a", Duration::from_secs(1)));
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_replaced_waiter_keeps_new_entry() {
        let table = CorrelationTable::<u32>::new();
        let old = table.register("a", Duration::from_secs(1));
        let new = table.register("a", Duration::from_secs(1));
        drop(old);
        assert_eq!(table.len(), 1);
        assert!(table.resolve("a", 3));
        assert_eq!(new.wait().await, Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_purged_on_register() {
        let table = CorrelationTable::<u32>::new();
        let stale = table.register("stale", Duration::from_millis(10));
        tokio::time::advance(Duration::from_millis(20)).await;
        let _fresh = table.register("fresh", Duration::from_secs(1));
        assert_eq!(table.len(), 1);
        drop(stale);
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_wakes_waiters() {
        let table = CorrelationTable::<u32>::new();
        let waiter = table.register("a", Duration::from_secs(5));
        table.clear();
        assert_eq!(waiter.wait().await, None);
    }
}

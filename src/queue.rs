// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Deduplicating, rate-limited work queue of object keys.
//!
//! A key is either waiting (`dirty`), being processed, or both. A key that is
//! added while it is being processed is parked until [`WorkQueue::done`] is
//! called for it, so a key is never handed to two workers at once.

use crate::constants::queue::{BASE_DELAY_MS, MAX_DELAY_MS};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::trace;

/// Per-item exponential backoff: `base * 2^failures`, capped at `max`
#[derive(Debug, Clone)]
pub struct ItemExponentialFailureRateLimiter {
    base: Duration,
    max: Duration,
    failures: HashMap<String, u32>,
}

impl ItemExponentialFailureRateLimiter {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            failures: HashMap::new(),
        }
    }

    /// Delay before the next retry of `key`; records one more failure
    pub fn when(&mut self, key: &str) -> Duration {
        let failures = self.failures.entry(key.to_string()).or_insert(0);
        let exp = *failures;
        *failures = failures.saturating_add(1);

        let factor = 2u32.checked_pow(exp).unwrap_or(u32::MAX);
        self.base
            .checked_mul(factor)
            .map_or(self.max, |delay| delay.min(self.max))
    }

    pub fn num_requeues(&self, key: &str) -> u32 {
        self.failures.get(key).copied().unwrap_or(0)
    }

    pub fn forget(&mut self, key: &str) {
        self.failures.remove(key);
    }
}

impl Default for ItemExponentialFailureRateLimiter {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(BASE_DELAY_MS),
            Duration::from_millis(MAX_DELAY_MS),
        )
    }
}

#[derive(Default)]
struct QueueState {
    queue: VecDeque<String>,
    dirty: HashSet<String>,
    processing: HashSet<String>,
    shutting_down: bool,
}

struct Inner {
    name: String,
    state: Mutex<QueueState>,
    notify: Notify,
    limiter: Mutex<ItemExponentialFailureRateLimiter>,
}

#[derive(Clone)]
pub struct WorkQueue {
    inner: Arc<Inner>,
}

impl WorkQueue {
    pub fn new(name: &str) -> Self {
        Self::with_rate_limiter(name, ItemExponentialFailureRateLimiter::default())
    }

    pub fn with_rate_limiter(name: &str, limiter: ItemExponentialFailureRateLimiter) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.to_string(),
                state: Mutex::new(QueueState::default()),
                notify: Notify::new(),
                limiter: Mutex::new(limiter),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    fn state(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn limiter(&self) -> std::sync::MutexGuard<'_, ItemExponentialFailureRateLimiter> {
        self.inner.limiter.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add(&self, key: impl Into<String>) {
        let key = key.into();
        let mut state = self.state();
        if state.shutting_down || state.dirty.contains(&key) {
            return;
        }
        trace!(queue = %self.inner.name, key = %key, "Adding item");
        state.dirty.insert(key.clone());
        if state.processing.contains(&key) {
            return;
        }
        state.queue.push_back(key);
        drop(state);
        self.inner.notify.notify_one();
    }

    /// Wait for the next key. Returns `None` once the queue is shut down.
    pub async fn get(&self) -> Option<String> {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // register interest before checking, so an add in between is not missed
            notified.as_mut().enable();

            {
                let mut state = self.state();
                if state.shutting_down {
                    return None;
                }
                if let Some(key) = state.queue.pop_front() {
                    state.dirty.remove(&key);
                    state.processing.insert(key.clone());
                    return Some(key);
                }
            }

            notified.await;
        }
    }

    /// Mark `key` as processed. A key re-added meanwhile goes back on the queue.
    pub fn done(&self, key: &str) {
        let mut state = self.state();
        state.processing.remove(key);
        if state.dirty.contains(key) {
            state.queue.push_back(key.to_string());
            drop(state);
            self.inner.notify.notify_one();
        }
    }

    pub fn add_after(&self, key: &str, delay: Duration) {
        if self.is_shutting_down() {
            return;
        }
        if delay.is_zero() {
            self.add(key);
            return;
        }
        let queue = self.clone();
        let key = key.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.add(key);
        });
    }

    pub fn add_rate_limited(&self, key: &str) {
        let delay = self.limiter().when(key);
        trace!(queue = %self.inner.name, key = %key, ?delay, "Requeueing with backoff");
        self.add_after(key, delay);
    }

    /// Reset the backoff of `key` after a successful run
    pub fn forget(&self, key: &str) {
        self.limiter().forget(key);
    }

    pub fn num_requeues(&self, key: &str) -> u32 {
        self.limiter().num_requeues(key)
    }

    /// Number of keys waiting to be handed out
    pub fn len(&self) -> usize {
        self.state().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn shutdown(&self) {
        self.state().shutting_down = true;
        self.inner.notify.notify_waiters();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.state().shutting_down
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORT: Duration = Duration::from_millis(50);

    #[tokio::test]
    async fn test_add_deduplicates_waiting_keys() {
        let queue = WorkQueue::new("test");
        queue.add("ns1/web");
        queue.add("ns1/web");
        queue.add("ns1/api");

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.get().await.as_deref(), Some("ns1/web"));
        assert_eq!(queue.get().await.as_deref(), Some("ns1/api"));
    }

    #[tokio::test]
    async fn test_rapid_requeues_during_processing_run_once_more() {
        let queue = WorkQueue::new("test");
        queue.add("ns1/web");
        let key = queue.get().await.unwrap();

        for _ in 0..10 {
            queue.add("ns1/web");
        }
        // parked while in flight
        assert_eq!(queue.len(), 0);
        assert!(tokio::time::timeout(SHORT, queue.get()).await.is_err());

        queue.done(&key);
        assert_eq!(queue.len(), 1);

        let again = queue.get().await.unwrap();
        assert_eq!(again, "ns1/web");
        queue.done(&again);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_get_wakes_up_on_add() {
        let queue = WorkQueue::new("test");
        let worker = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.get().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.add("ns1/web");

        let key = tokio::time::timeout(Duration::from_secs(1), worker)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(key.as_deref(), Some("ns1/web"));
    }

    #[tokio::test]
    async fn test_shutdown_releases_waiting_workers() {
        let queue = WorkQueue::new("test");
        let worker = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.get().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.shutdown();

        let key = tokio::time::timeout(Duration::from_secs(1), worker)
            .await
            .unwrap()
            .unwrap();
        assert!(key.is_none());

        queue.add("ns1/web");
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_add_after_delays_the_item() {
        let queue = WorkQueue::new("test");
        queue.add_after("ns1/web", Duration::from_millis(20));
        assert!(queue.is_empty());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_rate_limited_requeue_counts_and_forget() {
        let limiter = ItemExponentialFailureRateLimiter::new(
            Duration::from_millis(1),
            Duration::from_millis(10),
        );
        let queue = WorkQueue::with_rate_limiter("test", limiter);

        queue.add_rate_limited("ns1/web");
        queue.add_rate_limited("ns1/web");
        assert_eq!(queue.num_requeues("ns1/web"), 2);

        tokio::time::sleep(SHORT).await;
        assert_eq!(queue.len(), 1);

        queue.forget("ns1/web");
        assert_eq!(queue.num_requeues("ns1/web"), 0);
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let mut limiter = ItemExponentialFailureRateLimiter::default();

        assert_eq!(limiter.when("k"), Duration::from_secs(5));
        assert_eq!(limiter.when("k"), Duration::from_secs(10));
        assert_eq!(limiter.when("k"), Duration::from_secs(20));
        for _ in 0..40 {
            limiter.when("k");
        }
        assert_eq!(limiter.when("k"), Duration::from_secs(300));
        // other keys have their own counter
        assert_eq!(limiter.when("other"), Duration::from_secs(5));
    }
}

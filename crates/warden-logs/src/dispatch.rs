//! Persistence queue: a shared FIFO drained by at most `concurrency` workers.
//!
//! Entry lifecycle: queued, in flight, then delivered or (after the retry
//! budget is spent) dropped with a console-only diagnostic. Dropped entries are
//! never re-queued.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Notify;
use warden_core::{elapsed_since_unix_ms, lock_unpoisoned, spawn_background_future};

use crate::config::LogsConfig;
use crate::error::DispatchError;
use crate::level::LogCategory;
use crate::render::pretty_metadata;
use crate::sink::{ConsoleSink, LogStore, QueueEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    pub concurrency: usize,
    pub retry_limit: u32,
    pub retry_delay: Duration,
    pub capacity: Option<usize>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self::from(&LogsConfig::default())
    }
}

impl From<&LogsConfig> for DispatchConfig {
    fn from(config: &LogsConfig) -> Self {
        Self {
            concurrency: config.concurrency.max(1),
            retry_limit: config.retry_limit,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            capacity: config.capacity(),
        }
    }
}

/// Point-in-time counters for operator inspection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub queued: usize,
    pub active_workers: usize,
    pub attempts_total: u64,
    pub delivered_total: u64,
    pub dropped_total: u64,
    pub rejected_total: u64,
}

struct DispatchInner {
    config: DispatchConfig,
    store: Arc<dyn LogStore>,
    console: Arc<dyn ConsoleSink>,
    queue: Mutex<VecDeque<QueueEntry>>,
    active_workers: AtomicUsize,
    attempts_total: AtomicU64,
    delivered_total: AtomicU64,
    dropped_total: AtomicU64,
    rejected_total: AtomicU64,
    idle: Notify,
}

#[derive(Clone)]
pub struct DispatchQueue {
    inner: Arc<DispatchInner>,
}

/// Returns the worker slot when a worker exits, including by panic inside
/// a store call.
struct WorkerSlot {
    queue: DispatchQueue,
}

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        self.queue.release_worker();
    }
}

impl DispatchQueue {
    pub fn new(
        config: DispatchConfig,
        store: Arc<dyn LogStore>,
        console: Arc<dyn ConsoleSink>,
    ) -> Self {
        Self {
            inner: Arc::new(DispatchInner {
                config: DispatchConfig {
                    concurrency: config.concurrency.max(1),
                    ..config
                },
                store,
                console,
                queue: Mutex::new(VecDeque::new()),
                active_workers: AtomicUsize::new(0),
                attempts_total: AtomicU64::new(0),
                delivered_total: AtomicU64::new(0),
                dropped_total: AtomicU64::new(0),
                rejected_total: AtomicU64::new(0),
                idle: Notify::new(),
            }),
        }
    }

    pub fn config(&self) -> DispatchConfig {
        self.inner.config
    }

    /// Appends `entry` and wakes a worker if one is available. Never blocks.
    pub fn enqueue(&self, entry: QueueEntry) -> Result<(), DispatchError> {
        {
            let mut queue = lock_unpoisoned(&self.inner.queue);
            if let Some(capacity) = self.inner.config.capacity {
                if queue.len() >= capacity {
                    self.inner.rejected_total.fetch_add(1, Ordering::SeqCst);
                    return Err(DispatchError::QueueFull { capacity });
                }
            }
            queue.push_back(entry);
        }
        self.schedule_worker();
        Ok(())
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            queued: lock_unpoisoned(&self.inner.queue).len(),
            active_workers: self.inner.active_workers.load(Ordering::SeqCst),
            attempts_total: self.inner.attempts_total.load(Ordering::SeqCst),
            delivered_total: self.inner.delivered_total.load(Ordering::SeqCst),
            dropped_total: self.inner.dropped_total.load(Ordering::SeqCst),
            rejected_total: self.inner.rejected_total.load(Ordering::SeqCst),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.inner.active_workers.load(Ordering::SeqCst) == 0
            && lock_unpoisoned(&self.inner.queue).is_empty()
    }

    /// Waits until every queued entry has been delivered or dropped.
    /// Returns false if `timeout` elapsed first.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let wait = async {
            loop {
                let notified = self.inner.idle.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if self.is_idle() {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }

    fn schedule_worker(&self) {
        let concurrency = self.inner.config.concurrency;
        let admitted = self
            .inner
            .active_workers
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |active| {
                (active < concurrency).then_some(active + 1)
            })
            .is_ok();
        if !admitted {
            return;
        }

        let queue = self.clone();
        spawn_background_future("log dispatch worker", async move {
            queue.worker_loop().await;
        });
    }

    async fn worker_loop(self) {
        tracing::debug!("log dispatch worker started");
        let _slot = WorkerSlot {
            queue: self.clone(),
        };
        loop {
            let next_entry = { lock_unpoisoned(&self.inner.queue).pop_front() };
            let Some(entry) = next_entry else {
                break;
            };
            self.deliver(entry).await;
        }
    }

    fn release_worker(&self) {
        let still_active = self
            .inner
            .active_workers
            .fetch_sub(1, Ordering::SeqCst)
            .saturating_sub(1);
        tracing::debug!(still_active, "log dispatch worker stopped");

        // An enqueue may have been refused a worker slot just before the decrement.
        let has_remaining = { !lock_unpoisoned(&self.inner.queue).is_empty() };
        if has_remaining {
            self.schedule_worker();
        } else if still_active == 0 {
            self.inner.idle.notify_waiters();
        }
    }

    async fn deliver(&self, entry: QueueEntry) {
        let retry_limit = self.inner.config.retry_limit;
        let mut retries_left = retry_limit;
        loop {
            self.inner.attempts_total.fetch_add(1, Ordering::SeqCst);
            let error = match self.inner.store.insert_log(&entry).await {
                Ok(()) => {
                    self.inner.delivered_total.fetch_add(1, Ordering::SeqCst);
                    tracing::debug!(
                        level = entry.level.as_str(),
                        queued_ms = elapsed_since_unix_ms(entry.queued_unix_ms),
                        "log entry persisted"
                    );
                    return;
                }
                Err(error) => error,
            };

            if retries_left == 0 {
                self.inner.dropped_total.fetch_add(1, Ordering::SeqCst);
                let reason = if retry_limit == 0 {
                    format!("Error sending log: {error}")
                } else {
                    format!("Max retry limit reached for log: {error}")
                };
                self.report_fatal(&reason, &entry);
                return;
            }

            retries_left -= 1;
            self.report_fatal(&format!("Error sending log, retrying: {error}"), &entry);
            tokio::time::sleep(self.inner.config.retry_delay).await;
        }
    }

    fn report_fatal(&self, reason: &str, entry: &QueueEntry) {
        let detail = serde_json::to_value(entry)
            .map(|value| pretty_metadata(&value))
            .unwrap_or_else(|_| entry.log.clone());
        self.inner
            .console
            .emit(LogCategory::Fatal, &format!("{reason}\n{detail}"));
    }
}

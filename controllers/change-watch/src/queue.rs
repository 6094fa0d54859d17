//! Change queue with per-key retry scheduling.
//!
//! A deduplicating FIFO of keys, each carrying the newest pending payload.
//! A key is never handed out twice at the same time: a key that changes
//! while it is being processed is marked dirty and re-queued by [`ChangeQueue::done`].
//!
//! Failed keys are re-added after a delay computed by the injected
//! [`BackoffPolicy`] from the key's consecutive failure count. A newer `add`
//! or a `forget` of the key cancels its scheduled retry, so a stale payload
//! never comes back after a newer one.

use crate::backoff::BackoffPolicy;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Retries allowed after the initial attempt before a key is dropped
pub const MAX_RETRIES: u32 = 5;

#[derive(Debug)]
struct QueueState<T> {
    /// Keys ready to be handed out, oldest first
    queue: VecDeque<String>,
    /// Newest payload per queued or dirty key
    pending: HashMap<String, T>,
    /// Keys currently handed out
    processing: HashSet<String>,
    /// Consecutive failures per key
    failures: HashMap<String, u32>,
    /// Generation of the scheduled retry per key; a retry fires only if it
    /// still matches
    retries: HashMap<String, u64>,
    next_retry: u64,
    shutting_down: bool,
}

#[derive(Debug)]
struct Inner<T> {
    state: Mutex<QueueState<T>>,
    notify: Notify,
    backoff: Box<dyn BackoffPolicy>,
    /// Cancels scheduled retries on shutdown
    retries: CancellationToken,
}

/// Per-kind work queue. Cloning yields another handle to the same queue.
#[derive(Debug)]
pub struct ChangeQueue<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for ChangeQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> ChangeQueue<T> {
    pub fn new(backoff: impl BackoffPolicy + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(QueueState {
                    queue: VecDeque::new(),
                    pending: HashMap::new(),
                    processing: HashSet::new(),
                    failures: HashMap::new(),
                    retries: HashMap::new(),
                    next_retry: 0,
                    shutting_down: false,
                }),
                notify: Notify::new(),
                backoff: Box::new(backoff),
                retries: CancellationToken::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, QueueState<T>> {
        // Critical sections never panic; recover the guard if one did.
        self.inner
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Enqueues `item` under `key`. If the key is already pending its payload
    /// is replaced; if it is being processed it is re-queued on `done`.
    /// Ignored after shutdown.
    pub fn add(&self, key: String, item: T) {
        self.insert(key, item, None);
    }

    /// Adds `item` directly, or as the retry of generation `retry`. A retry
    /// never replaces a pending payload and is dropped if superseded.
    fn insert(&self, key: String, item: T, retry: Option<u64>) {
        {
            let mut state = self.state();
            if state.shutting_down {
                debug!(key = %key, "Queue shutting down, ignoring add");
                return;
            }

            let replace = match retry {
                None => {
                    state.retries.remove(&key);
                    true
                }
                Some(generation) => {
                    if state.retries.get(&key) != Some(&generation) {
                        debug!(key = %key, "Dropping superseded retry");
                        return;
                    }
                    state.retries.remove(&key);
                    false
                }
            };

            if let Some(existing) = state.pending.get_mut(&key) {
                if replace {
                    *existing = item;
                }
                return;
            }
            state.pending.insert(key.clone(), item);
            if state.processing.contains(&key) {
                return;
            }
            state.queue.push_back(key);
        }
        self.inner.notify.notify_one();
    }

    /// Waits for the next key. Returns `None` once the queue is shutting down.
    pub async fn get(&self) -> Option<(String, T)> {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register before checking state so a shutdown in between is not missed.
            notified.as_mut().enable();

            {
                let mut state = self.state();
                if state.shutting_down {
                    return None;
                }
                while let Some(key) = state.queue.pop_front() {
                    if let Some(item) = state.pending.remove(&key) {
                        state.processing.insert(key.clone());
                        return Some((key, item));
                    }
                }
            }

            notified.await;
        }
    }

    /// Marks `key` as processed. A dirty key is queued again.
    pub fn done(&self, key: &str) {
        let requeued = {
            let mut state = self.state();
            state.processing.remove(key);
            if !state.shutting_down && state.pending.contains_key(key) {
                state.queue.push_back(key.to_string());
                true
            } else {
                false
            }
        };
        if requeued {
            self.inner.notify.notify_one();
        }
    }

    /// Clears the retry history of `key` and cancels its scheduled retry.
    pub fn forget(&self, key: &str) {
        let mut state = self.state();
        state.failures.remove(key);
        state.retries.remove(key);
    }

    /// Consecutive failures recorded for `key`.
    pub fn num_requeues(&self, key: &str) -> u32 {
        self.state().failures.get(key).copied().unwrap_or(0)
    }

    /// Records a failure of `key` and re-adds `item` after the backoff delay,
    /// unless the key is added again or forgotten in the meantime.
    pub fn add_rate_limited(&self, key: String, item: T) {
        let (delay, generation) = {
            let mut state = self.state();
            if state.shutting_down {
                return;
            }
            let failures = state.failures.entry(key.clone()).or_insert(0);
            *failures += 1;
            let delay = self.inner.backoff.backoff(*failures);

            state.next_retry += 1;
            let generation = state.next_retry;
            state.retries.insert(key.clone(), generation);
            (delay, generation)
        };
        debug!(key = %key, delay_ms = delay.as_millis(), "Scheduling retry");

        let queue = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = queue.inner.retries.cancelled() => {}
                () = tokio::time::sleep(delay) => queue.insert(key, item, Some(generation)),
            }
        });
    }

    /// Stops the queue: waiters return `None`, adds and scheduled retries
    /// are dropped. `done` and `forget` keep working.
    pub fn shut_down(&self) {
        self.state().shutting_down = true;
        self.inner.retries.cancel();
        self.inner.notify.notify_waiters();
    }

    #[cfg(test)]
    pub fn is_shutting_down(&self) -> bool {
        self.state().shutting_down
    }

    /// Number of keys waiting to be handed out
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.state().queue.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

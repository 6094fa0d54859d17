//! Per-kind worker loop.
//!
//! Pulls changes off the kind's queue one at a time and runs them through
//! normalization, diff suppression, classification and dispatch. Failed
//! changes are retried with backoff up to [`MAX_RETRIES`] times.

use crate::cache::WatchCache;
use crate::change::{ChangeType, RawChange};
use crate::classifier::classify;
use crate::diff;
use crate::dispatcher::Dispatcher;
use crate::error::ControllerError;
use crate::normalizer::Normalizer;
use crate::queue::{ChangeQueue, MAX_RETRIES};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use watch_config::WatchedKind;

pub struct KindWorker {
    kind: Arc<WatchedKind>,
    cache: Arc<dyn WatchCache>,
    queue: ChangeQueue<RawChange>,
    dispatcher: Arc<Dispatcher>,
    normalizer: Normalizer,
}

impl KindWorker {
    pub fn new(
        kind: Arc<WatchedKind>,
        cache: Arc<dyn WatchCache>,
        queue: ChangeQueue<RawChange>,
        dispatcher: Arc<Dispatcher>,
        anchor: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            cache,
            queue,
            dispatcher,
            normalizer: Normalizer::new(anchor),
        }
    }

    /// Waits for the cache to sync, then processes changes until the queue
    /// shuts down. Cancelling `cancel` lets the in-flight change finish.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::Sync` if the initial sync fails or the kind
    /// is shut down before it completes; `cancel` is cancelled so the kind's
    /// watch stops too.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), ControllerError> {
        let queue = self.queue.clone();
        let shutdown = cancel.clone();
        tokio::spawn(async move {
            shutdown.cancelled().await;
            queue.shut_down();
        });

        info!("Waiting for cache sync");
        let synced = tokio::select! {
            () = cancel.cancelled() => Err(ControllerError::Sync("shut down before cache synced".to_string())),
            result = self.cache.wait_synced() => result,
        };
        if let Err(e) = synced {
            error!("Failed to sync cache: {}", e);
            cancel.cancel();
            return Err(e);
        }

        info!("Cache synced, processing changes");
        while self.process_next().await {}
        info!("Worker stopped");
        Ok(())
    }

    /// Handles one queued change. Returns false once the queue is shut down.
    pub async fn process_next(&self) -> bool {
        let Some((key, change)) = self.queue.get().await else {
            return false;
        };

        match self.process(&change).await {
            Ok(()) => self.queue.forget(&key),
            Err(e) => self.handle_error(&key, change, &e),
        }
        self.queue.done(&key);
        true
    }

    /// Runs one change through the pipeline.
    ///
    /// # Errors
    ///
    /// Returns the normalizer's lookup error; dispatch failures are only logged.
    pub async fn process(&self, change: &RawChange) -> Result<(), ControllerError> {
        let Some(normalized) = self.normalizer.normalize(change, self.cache.as_ref())? else {
            return Ok(());
        };

        if normalized.change_type == ChangeType::Update
            && diff::is_noise(
                normalized.old_obj.as_ref(),
                normalized.obj.as_ref(),
                &self.kind.ignored_fields,
            )
        {
            info!(key = %change.key, event_type = %change.change_type, "Ignoring update with no relevant changes");
            return Ok(());
        }

        let (status, reason) = classify(normalized.change_type, &normalized.kind);
        let event = normalized.into_event(status, reason);
        self.dispatcher.dispatch(&event, &change.key).await;
        Ok(())
    }

    fn handle_error(&self, key: &str, change: RawChange, err: &ControllerError) {
        let retries = self.queue.num_requeues(key);
        if retries < MAX_RETRIES {
            warn!(
                key,
                event_type = %change.change_type,
                attempt = retries + 1,
                "Error processing change, retrying: {}",
                err
            );
            self.queue.add_rate_limited(key.to_string(), change);
        } else {
            self.queue.forget(key);
            error!(
                key,
                kind = %self.kind.name,
                event_type = %change.change_type,
                "Dropping change after {} retries: {}",
                MAX_RETRIES,
                err
            );
        }
    }
}

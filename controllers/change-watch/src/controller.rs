//! Main controller implementation.
//!
//! Wires one watch task and one worker task per watched kind and owns
//! their handles until shutdown.

use crate::backoff::ExponentialBackoff;
use crate::cache::StoreCache;
use crate::dispatcher::Dispatcher;
use crate::error::ControllerError;
use crate::metrics::ChangeMetrics;
use crate::queue::ChangeQueue;
use crate::watcher::{api_resource, kind_api, watch_kind, ChangeTranslator};
use crate::worker::KindWorker;
use chrono::Utc;
use kube::Client;
use kube_runtime::reflector::store::Writer;
use notify_client::build_sinks;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, Instrument};
use watch_config::{Config, WatchedKind};

/// Tasks of one watched kind
struct KindTasks {
    kind: String,
    watcher: JoinHandle<Result<(), ControllerError>>,
    worker: JoinHandle<Result<(), ControllerError>>,
}

/// Main controller for change notifications.
pub struct Controller {
    kinds: Vec<KindTasks>,
}

impl Controller {
    /// Creates the sinks, then starts the watch and worker tasks of every
    /// enabled kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, a sink cannot be
    /// built or no Kubernetes client can be created.
    pub async fn new(
        config: &Config,
        metrics: Arc<ChangeMetrics>,
        cancel: CancellationToken,
    ) -> Result<Self, ControllerError> {
        info!("Initializing change-watch controller");

        let kinds = config.watched_kinds()?;
        let dispatcher = Arc::new(Dispatcher::new(build_sinks(config)?));
        info!("Sinks: {:?}", dispatcher);

        let client = Client::try_default().await?;
        let sync_timeout = config.sync_timeout_seconds.map(Duration::from_secs);

        // Creates older than this are replays of the initial listing
        let anchor = Utc::now();

        let tasks = kinds
            .into_iter()
            .map(|kind| {
                spawn_kind(
                    client.clone(),
                    kind,
                    Arc::clone(&dispatcher),
                    Arc::clone(&metrics),
                    sync_timeout,
                    anchor,
                    cancel.child_token(),
                )
            })
            .collect();

        Ok(Self { kinds: tasks })
    }

    /// Runs until every kind has stopped. A kind that fails only logs; the
    /// others keep running.
    pub async fn run(self) {
        info!(kinds = self.kinds.len(), "Change-watch controller running");

        for tasks in self.kinds {
            let span = info_span!("kind", kind = %tasks.kind);
            for (task, handle) in [("watcher", tasks.watcher), ("worker", tasks.worker)] {
                match handle.await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => span.in_scope(|| error!("Kind {} halted: {}", task, e)),
                    Err(e) => span.in_scope(|| error!("Kind {} panicked: {}", task, e)),
                }
            }
        }

        info!("Change-watch controller stopped");
    }
}

fn spawn_kind(
    client: Client,
    kind: WatchedKind,
    dispatcher: Arc<Dispatcher>,
    metrics: Arc<ChangeMetrics>,
    sync_timeout: Option<Duration>,
    anchor: chrono::DateTime<Utc>,
    cancel: CancellationToken,
) -> KindTasks {
    let resource = api_resource(&kind);
    let api = kind_api(client, &kind, &resource);
    let writer = Writer::new(resource.clone());
    let cache = Arc::new(StoreCache::new(writer.as_reader(), resource.clone(), sync_timeout));
    let queue = ChangeQueue::new(ExponentialBackoff::default());
    let kind = Arc::new(kind);
    let span = info_span!("kind", kind = %kind.name);

    info!(
        kind = %kind.name,
        api_version = %kind.api_version(),
        namespace = kind.namespace.as_deref().unwrap_or("all namespaces"),
        "Watching kind"
    );

    let translator = ChangeTranslator::new(Arc::clone(&kind), resource);
    let watcher = tokio::spawn(
        watch_kind(api, writer, translator, queue.clone(), metrics, cancel.clone()).instrument(span.clone()),
    );

    let worker = KindWorker::new(Arc::clone(&kind), cache, queue, dispatcher, anchor);
    let worker = tokio::spawn(worker.run(cancel).instrument(span));

    KindTasks {
        kind: kind.name.clone(),
        watcher,
        worker,
    }
}

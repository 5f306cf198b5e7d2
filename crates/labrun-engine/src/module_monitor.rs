//! Per-module hardware polling
//!
//! Each attached module gets one task that reads it at a fixed interval and
//! publishes the reading as an immutable [`ModuleSnapshot`]. Readers clone
//! the latest `Arc` out of a `watch` channel; nothing is shared mutably.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use labrun_core::core_types::ModelUtils;
use serde_json::Value;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Default time between two reads of a module
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// One reading of an attached module
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleSnapshot {
    pub module_id: String,
    pub model: String,
    /// Driver-specific reading, opaque to the engine
    pub data: Value,
    pub read_at: DateTime<Utc>,
}

/// Driver-side access to one attached module
#[async_trait]
pub trait ModuleReader: Send + Sync {
    fn module_id(&self) -> &str;

    fn model(&self) -> &str;

    async fn read(&self) -> anyhow::Result<Value>;
}

/// Handle to a running module poll loop
///
/// Clones share the loop. It stops on [`shutdown`](ModuleMonitor::shutdown)
/// or once every clone is dropped.
#[derive(Debug, Clone)]
pub struct ModuleMonitor {
    module_id: String,
    snapshots: watch::Receiver<Option<Arc<ModuleSnapshot>>>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl ModuleMonitor {
    /// Start polling `reader`; must be called from within a tokio runtime
    ///
    /// The first read happens immediately.
    pub fn spawn(
        reader: Arc<dyn ModuleReader>,
        poll_interval: Duration,
        model_utils: Arc<dyn ModelUtils>,
    ) -> Self {
        let module_id = reader.module_id().to_string();
        let (snapshot_tx, snapshots) = watch::channel(None);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(poll_loop(
            reader,
            poll_interval,
            model_utils,
            snapshot_tx,
            shutdown_rx,
        ));

        Self {
            module_id,
            snapshots,
            shutdown_tx: Arc::new(shutdown_tx),
            task: Arc::new(Mutex::new(Some(task))),
        }
    }

    pub fn module_id(&self) -> &str {
        &self.module_id
    }

    /// Most recent successful reading, if any
    pub fn latest(&self) -> Option<Arc<ModuleSnapshot>> {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<ModuleSnapshot>>> {
        self.snapshots.clone()
    }

    /// Stop polling and wait for the loop to exit
    ///
    /// Safe to call more than once.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let task = self.task.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(module_id = %self.module_id, error = %e, "module monitor task failed");
            }
        }
    }
}

async fn poll_loop(
    reader: Arc<dyn ModuleReader>,
    poll_interval: Duration,
    model_utils: Arc<dyn ModelUtils>,
    snapshot_tx: watch::Sender<Option<Arc<ModuleSnapshot>>>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match reader.read().await {
                    Ok(data) => {
                        let snapshot = ModuleSnapshot {
                            module_id: reader.module_id().to_string(),
                            model: reader.model().to_string(),
                            data,
                            read_at: model_utils.get_timestamp(),
                        };
                        snapshot_tx.send_replace(Some(Arc::new(snapshot)));
                    }
                    Err(e) => {
                        warn!(
                            module_id = reader.module_id(),
                            error = %format!("{:#}", e),
                            "module read failed"
                        );
                    }
                }
            }
            _ = shutdown_rx.changed() => {
                debug!(module_id = reader.module_id(), "module monitor stopping");
                return;
            }
        }
    }
}

//! Run plugins
//!
//! A plugin observes every action after the state store has reduced it. It
//! may read state at any time and may dispatch actions of its own through
//! its [`PluginContext`]. Those actions are queued and forwarded by a
//! background task, so a plugin never re-enters the dispatcher from inside
//! `handle_action`.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use futures::future::join_all;
use labrun_core::Action;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::dispatcher::{ActionDispatcher, ActionSink};
use crate::state_store::StateStore;

#[async_trait]
pub trait Plugin: Send + Sync {
    /// Called once when the plugin is added, before it sees any action
    fn setup(&mut self, _context: PluginContext) {}

    fn handle_action(&self, action: &Action);

    /// Called once when the run finishes
    async fn teardown(&self) {}
}

/// What a plugin may reach
#[derive(Debug, Clone)]
pub struct PluginContext {
    state: Arc<StateStore>,
    sender: mpsc::UnboundedSender<Action>,
}

impl PluginContext {
    pub fn state(&self) -> &StateStore {
        &self.state
    }

    /// Queue an action for dispatch
    ///
    /// Actions are dispatched without validation, in the order queued.
    /// After the run's plugins are stopped this is a no-op.
    pub fn dispatch(&self, action: Action) {
        if self.sender.send(action).is_err() {
            debug!("plugin action dropped, plugins are stopped");
        }
    }
}

/// Owner of a run's plugins and their action forwarder
pub struct PluginStarter {
    state: Arc<StateStore>,
    sender: mpsc::UnboundedSender<Action>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<Action>>>,
    plugins: RwLock<Vec<Arc<dyn Plugin>>>,
    forwarder: Mutex<Option<JoinHandle<()>>>,
}

impl PluginStarter {
    pub fn new(state: Arc<StateStore>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            state,
            sender,
            receiver: Mutex::new(Some(receiver)),
            plugins: RwLock::new(Vec::new()),
            forwarder: Mutex::new(None),
        }
    }

    pub fn add_plugin(&self, mut plugin: Box<dyn Plugin>) {
        plugin.setup(PluginContext {
            state: Arc::clone(&self.state),
            sender: self.sender.clone(),
        });
        self.plugins
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::from(plugin));
    }

    pub fn len(&self) -> usize {
        self.plugins
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start forwarding plugin actions to `dispatcher`
    ///
    /// Only the first call has an effect. Must be called from within a
    /// tokio runtime.
    pub fn start(&self, dispatcher: Arc<ActionDispatcher>) {
        let Some(mut receiver) = self
            .receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return;
        };
        let task = tokio::spawn(async move {
            while let Some(action) = receiver.recv().await {
                dispatcher.dispatch(action);
            }
        });
        *self
            .forwarder
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(task);
    }

    /// Stop the forwarder without tearing plugins down
    ///
    /// The forwarder holds the dispatcher, which holds this starter, so the
    /// owner of both must call this (or [`stop`](Self::stop)) to free them.
    pub fn abort(&self) {
        if let Some(task) = self
            .forwarder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }

    /// Stop forwarding and tear every plugin down
    ///
    /// Plugins are removed, so a second call does nothing.
    pub async fn stop(&self) {
        let forwarder = self
            .forwarder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = forwarder {
            task.abort();
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "plugin forwarder failed");
                }
            }
        }

        let plugins: Vec<_> = self
            .plugins
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        debug!(count = plugins.len(), "tearing down plugins");
        join_all(plugins.iter().map(|plugin| plugin.teardown())).await;
    }
}

impl ActionSink for PluginStarter {
    fn handle_action(&self, action: &Action) {
        let plugins = self
            .plugins
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for plugin in plugins {
            plugin.handle_action(action);
        }
    }
}

impl std::fmt::Debug for PluginStarter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginStarter")
            .field("plugins", &self.len())
            .finish_non_exhaustive()
    }
}

//! Background command execution
//!
//! The worker waits (on state changes, never a timer) for the view to hand
//! out the next queued command, marks it RUNNING, executes it, and reports
//! the outcome as an action. It exits cleanly once the run has a result.
//!
//! Marking RUNNING re-checks, under the dispatch lock, that the command is
//! still the next one queued, so a stop that lands after the pick is never
//! followed by execution.

use std::sync::Arc;

use labrun_core::core_types::ModelUtils;
use labrun_core::{Action, ProtocolEngineError, Result};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::dispatcher::ActionDispatcher;
use crate::executor::{to_error_info, CommandExecutor};

pub struct QueueWorker {
    dispatcher: Arc<ActionDispatcher>,
    executor: Arc<dyn CommandExecutor>,
    model_utils: Arc<dyn ModelUtils>,
    task: Option<JoinHandle<Result<()>>>,
}

impl QueueWorker {
    pub fn new(
        dispatcher: Arc<ActionDispatcher>,
        executor: Arc<dyn CommandExecutor>,
        model_utils: Arc<dyn ModelUtils>,
    ) -> Self {
        Self {
            dispatcher,
            executor,
            model_utils,
            task: None,
        }
    }

    /// Spawn the worker task; a second call is a no-op
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        if self.task.is_some() {
            return;
        }
        let dispatcher = Arc::clone(&self.dispatcher);
        let executor = Arc::clone(&self.executor);
        let model_utils = Arc::clone(&self.model_utils);
        self.task = Some(tokio::spawn(run_queue(dispatcher, executor, model_utils)));
    }

    /// Abort the worker without waiting for it
    ///
    /// A command that was mid-execution stays RUNNING in state.
    pub fn cancel(&self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }

    /// Wait for the worker to exit
    ///
    /// A worker that was never started, or was cancelled, joins cleanly.
    ///
    /// # Errors
    ///
    /// `QueueWorkerFailed` if the worker panicked or hit an internal error.
    pub async fn join(&mut self) -> Result<()> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        match task.await {
            Ok(result) => result.map_err(|e| ProtocolEngineError::QueueWorkerFailed {
                message: e.to_string(),
            }),
            Err(join_err) if join_err.is_cancelled() => Ok(()),
            Err(join_err) => Err(ProtocolEngineError::QueueWorkerFailed {
                message: join_err.to_string(),
            }),
        }
    }
}

impl Drop for QueueWorker {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for QueueWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueWorker")
            .field("started", &self.task.is_some())
            .finish_non_exhaustive()
    }
}

async fn run_queue(
    dispatcher: Arc<ActionDispatcher>,
    executor: Arc<dyn CommandExecutor>,
    model_utils: Arc<dyn ModelUtils>,
) -> Result<()> {
    let state = Arc::clone(dispatcher.state());
    loop {
        let next = state
            .wait_for(|view| match view.get_next_queued() {
                Ok(Some(id)) => Ok(Some(Some(view.get(id)?.clone()))),
                Ok(None) => Ok(None),
                Err(ProtocolEngineError::RunStopped) => Ok(Some(None)),
                Err(e) => Err(e),
            })
            .await?;
        let Some(command) = next else {
            debug!("run stopped, queue worker exiting");
            return Ok(());
        };

        // A stop or pause may have landed since the command was picked.
        let running = command.started(model_utils.get_timestamp());
        let claimed = dispatcher.dispatch_if(
            Action::UpdateCommand {
                command: running.clone(),
            },
            |view| {
                view.get_run_result().is_none()
                    && matches!(view.get_next_queued(), Ok(Some(id)) if id == running.id)
            },
        );
        if !claimed {
            debug!(command_id = %running.id, "command no longer next, not starting it");
            continue;
        }
        debug!(command_id = %running.id, command_type = running.command_type(), "executing");

        match executor.execute(&running).await {
            Ok(result) => {
                let done = running.succeeded(model_utils.get_timestamp(), result);
                dispatcher.dispatch(Action::UpdateCommand { command: done });
            }
            Err(err) => {
                warn!(command_id = %running.id, error = %format!("{:#}", err), "command failed");
                dispatcher.dispatch(Action::FailCommand {
                    command_id: running.id.clone(),
                    error_id: model_utils.generate_id(),
                    error: to_error_info(&err),
                    failed_at: model_utils.get_timestamp(),
                });
            }
        }
    }
}

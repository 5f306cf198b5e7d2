//! Protocol engine facade
//!
//! Turns run-control intents into validated actions, dispatches them, and
//! coordinates the background queue worker with the hardware controller.
//!
//! ## Logging Ownership
//!
//! The engine owns lifecycle logging for every facade operation:
//! - `log_op_start!` at entry
//! - `log_op_end!` on success
//! - `log_op_error!` on failure
//!
//! Lower layers (state store, worker, core reducer) use only
//! `tracing::debug!()` and `trace!()` for internal details.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use labrun_core::core_types::{ModelUtils, SystemModelUtils};
use labrun_core::{
    log_op_end, log_op_error, log_op_start, Action, Command, CommandCreate, CommandSlice,
    Config, EngineStatus, ErrorInfo, ErrorOccurrence, FinishErrorDetails, PauseSource,
    ProtocolEngineError, Result,
};
use tokio::sync::Mutex as AsyncMutex;

use crate::dispatcher::ActionDispatcher;
use crate::door_watcher::{DoorFeed, DoorSensor, DoorWatcher};
use crate::executor::CommandExecutor;
use crate::hardware::{HardwareApi, HardwareControl, PauseType};
use crate::hardware_stopper::HardwareStopper;
use crate::module_monitor::{ModuleMonitor, ModuleReader, ModuleSnapshot, DEFAULT_POLL_INTERVAL};
use crate::plugins::{Plugin, PluginStarter};
use crate::queue_worker::QueueWorker;
use crate::state_store::StateStore;

/// How a run should be finished
#[derive(Debug, Clone, PartialEq)]
pub struct FinishOptions {
    /// The error that ended the run, if any
    pub error: Option<ErrorInfo>,
    pub drop_tips_and_home: bool,
    /// When false the run ends as STOPPED regardless of `error`
    pub set_run_status: bool,
}

impl Default for FinishOptions {
    fn default() -> Self {
        Self {
            error: None,
            drop_tips_and_home: true,
            set_run_status: true,
        }
    }
}

impl FinishOptions {
    pub fn with_error(error: ErrorInfo) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }
}

/// Wiring for a [`ProtocolEngine`]
pub struct ProtocolEngineBuilder {
    hardware: Arc<dyn HardwareControl>,
    executor: Arc<dyn CommandExecutor>,
    config: Config,
    door_sensor: Option<Arc<dyn DoorSensor>>,
    model_utils: Arc<dyn ModelUtils>,
    plugins: Vec<Box<dyn Plugin>>,
    modules: Vec<Arc<dyn ModuleReader>>,
    module_poll_interval: Duration,
}

impl ProtocolEngineBuilder {
    pub fn new(hardware: Arc<dyn HardwareControl>, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            hardware,
            executor,
            config: Config::default(),
            door_sensor: None,
            model_utils: Arc::new(SystemModelUtils),
            plugins: Vec::new(),
            modules: Vec::new(),
            module_poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Door sensor to watch; defaults to a [`DoorFeed`] that stays closed
    pub fn door_sensor(mut self, door_sensor: Arc<dyn DoorSensor>) -> Self {
        self.door_sensor = Some(door_sensor);
        self
    }

    pub fn model_utils(mut self, model_utils: Arc<dyn ModelUtils>) -> Self {
        self.model_utils = model_utils;
        self
    }

    pub fn plugin(mut self, plugin: Box<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Attach a module to poll for the lifetime of the run
    pub fn module(mut self, reader: Arc<dyn ModuleReader>) -> Self {
        self.modules.push(reader);
        self
    }

    pub fn module_poll_interval(mut self, interval: Duration) -> Self {
        self.module_poll_interval = interval;
        self
    }

    /// Create the engine and start its background tasks
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> ProtocolEngine {
        let door_sensor = self
            .door_sensor
            .unwrap_or_else(|| Arc::new(DoorFeed::closed()));
        let mut door_changes = door_sensor.subscribe();
        let door_state = *door_changes.borrow_and_update();
        let state = Arc::new(StateStore::new(self.config, door_state));
        let dispatcher = Arc::new(ActionDispatcher::new(Arc::clone(&state)));
        let hardware = HardwareApi::new(self.hardware);

        let plugins = Arc::new(PluginStarter::new(Arc::clone(&state)));
        for plugin in self.plugins {
            plugins.add_plugin(plugin);
        }
        dispatcher.add_sink(plugins.clone());
        plugins.start(Arc::clone(&dispatcher));

        let mut worker = QueueWorker::new(
            Arc::clone(&dispatcher),
            self.executor,
            Arc::clone(&self.model_utils),
        );
        worker.start();

        let door_watcher =
            DoorWatcher::start(door_changes, Arc::clone(&dispatcher), hardware.clone());

        let monitors = self
            .modules
            .into_iter()
            .map(|reader| {
                ModuleMonitor::spawn(
                    reader,
                    self.module_poll_interval,
                    Arc::clone(&self.model_utils),
                )
            })
            .collect();

        ProtocolEngine {
            state,
            dispatcher,
            stopper: HardwareStopper::new(hardware.clone()),
            hardware,
            model_utils: self.model_utils,
            worker: AsyncMutex::new(worker),
            door_watcher: Mutex::new(door_watcher),
            plugins,
            monitors,
        }
    }
}

/// The run-control facade
pub struct ProtocolEngine {
    state: Arc<StateStore>,
    dispatcher: Arc<ActionDispatcher>,
    hardware: HardwareApi,
    stopper: HardwareStopper,
    model_utils: Arc<dyn ModelUtils>,
    worker: AsyncMutex<QueueWorker>,
    door_watcher: Mutex<DoorWatcher>,
    plugins: Arc<PluginStarter>,
    monitors: Vec<ModuleMonitor>,
}

impl ProtocolEngine {
    pub fn builder(
        hardware: Arc<dyn HardwareControl>,
        executor: Arc<dyn CommandExecutor>,
    ) -> ProtocolEngineBuilder {
        ProtocolEngineBuilder::new(hardware, executor)
    }

    /// Read-only access to run state
    pub fn state(&self) -> &StateStore {
        &self.state
    }

    pub fn status(&self) -> EngineStatus {
        self.state.with_view(|view| view.get_status())
    }

    pub fn get_slice(&self, cursor: Option<i64>, length: usize) -> CommandSlice {
        self.state.with_view(|view| view.get_slice(cursor, length))
    }

    /// Run-level errors in the order they occurred
    pub fn errors(&self) -> Vec<ErrorOccurrence> {
        self.state
            .with_view(|view| view.get_all_errors().into_iter().cloned().collect())
    }

    /// Latest reading of an attached module
    pub fn module_snapshot(&self, module_id: &str) -> Option<Arc<ModuleSnapshot>> {
        self.monitors
            .iter()
            .find(|monitor| monitor.module_id() == module_id)
            .and_then(ModuleMonitor::latest)
    }

    /// Add a plugin that sees every action dispatched from now on
    pub fn add_plugin(&self, plugin: Box<dyn Plugin>) {
        self.plugins.add_plugin(plugin);
    }

    /// Queue a command for execution
    ///
    /// ## Returns
    ///
    /// The command as stored, in QUEUED status.
    ///
    /// ## Errors
    ///
    /// - `RunStopped`: the run already has a result
    /// - `SetupCommandNotAllowed`: a setup command after the run left setup
    pub fn add_command(&self, request: CommandCreate) -> Result<Command> {
        log_op_start!("add_command", command_type = request.params.command_type());
        let start = Instant::now();

        let result = self.add_command_impl(request).map_err(|e| {
            log_op_error!(
                "add_command",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            e
        })?;

        log_op_end!(
            "add_command",
            duration_ms = start.elapsed().as_millis() as u64,
            command_id = %result.id
        );
        Ok(result)
    }

    fn add_command_impl(&self, request: CommandCreate) -> Result<Command> {
        let command_id = self.model_utils.generate_id();
        self.dispatcher.validate_and_dispatch(Action::QueueCommand {
            request,
            command_id: command_id.clone(),
            created_at: self.model_utils.get_timestamp(),
        })?;
        self.state
            .with_view(|view| view.get(&command_id).cloned())
    }

    /// Queue a command and wait until it succeeds or fails
    ///
    /// ## Errors
    ///
    /// - Any error of [`add_command`](Self::add_command)
    /// - `RunStopped`: the run ended while the command was still queued
    pub async fn add_and_execute_command(&self, request: CommandCreate) -> Result<Command> {
        log_op_start!(
            "add_and_execute_command",
            command_type = request.params.command_type()
        );
        let start = Instant::now();

        let result = self
            .add_and_execute_command_impl(request)
            .await
            .map_err(|e| {
                log_op_error!(
                    "add_and_execute_command",
                    e.clone(),
                    duration_ms = start.elapsed().as_millis() as u64
                );
                e
            })?;

        log_op_end!(
            "add_and_execute_command",
            duration_ms = start.elapsed().as_millis() as u64,
            command_id = %result.id,
            status = ?result.status
        );
        Ok(result)
    }

    async fn add_and_execute_command_impl(&self, request: CommandCreate) -> Result<Command> {
        let queued = self.add_command_impl(request)?;
        self.state
            .wait_for(|view| {
                let command = view.get(&queued.id)?;
                if command.status.is_terminal() {
                    return Ok(Some(command.clone()));
                }
                // Queues are cleared when the run ends, and nothing moves
                // once the hardware has stopped.
                let stranded = view.get_running() != Some(command.id.as_str());
                if (view.get_stop_requested() && stranded) || view.get_is_stopped() {
                    return Err(ProtocolEngineError::RunStopped);
                }
                Ok(None)
            })
            .await
    }

    /// Start or resume the run
    ///
    /// The hardware is resumed, unless an open door blocks the run, in which
    /// case it is kept paused.
    ///
    /// ## Errors
    ///
    /// - `RunStopped`, `RobotDoorOpen`: rejected, nothing changes
    /// - `Hardware`: the action was applied but the controller failed
    pub async fn play(&self) -> Result<()> {
        log_op_start!("play");
        let start = Instant::now();

        let result = self.play_impl().await;
        log_outcome("play", start, result)
    }

    async fn play_impl(&self) -> Result<()> {
        self.dispatcher.validate_and_dispatch(Action::Play {
            requested_at: self.model_utils.get_timestamp(),
        })?;
        if self.state.with_view(|view| view.get_is_door_blocking()) {
            self.hardware.pause(PauseType::Pause).await
        } else {
            self.hardware.resume().await
        }
    }

    /// Pause the run after the current command
    ///
    /// ## Errors
    ///
    /// - `RunStopped`, `PauseNotAllowed`: rejected, nothing changes
    /// - `Hardware`: the action was applied but the controller failed
    pub async fn pause(&self) -> Result<()> {
        log_op_start!("pause");
        let start = Instant::now();

        let result = self.pause_impl().await;
        log_outcome("pause", start, result)
    }

    async fn pause_impl(&self) -> Result<()> {
        self.dispatcher.validate_and_dispatch(Action::Pause {
            source: PauseSource::Client,
        })?;
        self.hardware.pause(PauseType::Pause).await
    }

    /// Stop the run now: cancel the worker and halt the hardware
    ///
    /// A command that was executing is left RUNNING. Call
    /// [`finish`](Self::finish) afterwards to recover the hardware.
    ///
    /// ## Errors
    ///
    /// - `RunStopped`: the run already has a result
    /// - `Hardware`: the halt failed
    pub async fn stop(&self) -> Result<()> {
        log_op_start!("stop");
        let start = Instant::now();

        let result = self.stop_impl().await;
        log_outcome("stop", start, result)
    }

    async fn stop_impl(&self) -> Result<()> {
        self.dispatcher.validate_and_dispatch(Action::Stop)?;
        self.worker.lock().await.cancel();
        self.stopper.do_halt().await
    }

    /// End the run gracefully
    ///
    /// Dispatches Finish, waits for the worker to exit, then recovers the
    /// hardware, records that it has stopped, and tears down plugins and
    /// module monitors. The cleanup steps run even if the worker failed.
    ///
    /// ## Errors
    ///
    /// - `QueueWorkerFailed`: the worker crashed (reported after cleanup)
    /// - `Hardware`: recovery failed
    pub async fn finish(&self, options: FinishOptions) -> Result<()> {
        log_op_start!(
            "finish",
            drop_tips_and_home = options.drop_tips_and_home,
            set_run_status = options.set_run_status,
            has_error = options.error.is_some()
        );
        let start = Instant::now();

        let result = self.finish_impl(options).await;
        log_outcome("finish", start, result)
    }

    async fn finish_impl(&self, options: FinishOptions) -> Result<()> {
        let error_details = options.error.map(|error| FinishErrorDetails {
            error_id: self.model_utils.generate_id(),
            created_at: self.model_utils.get_timestamp(),
            error,
        });
        self.dispatcher.dispatch(Action::Finish {
            error_details,
            set_run_status: options.set_run_status,
        });

        let joined = self.worker.lock().await.join().await;

        self.door_watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stop_soon();
        let recovered = self
            .stopper
            .do_stop_and_recover(options.drop_tips_and_home)
            .await;
        self.dispatcher.dispatch(Action::HardwareStopped {
            completed_at: self.model_utils.get_timestamp(),
        });
        self.plugins.stop().await;
        for monitor in &self.monitors {
            monitor.shutdown().await;
        }

        joined.and(recovered)
    }

    /// Wait until every queued command has run
    ///
    /// ## Errors
    ///
    /// `ProtocolCommandFailed` as soon as any protocol command fails.
    pub async fn wait_until_complete(&self) -> Result<()> {
        log_op_start!("wait_until_complete");
        let start = Instant::now();

        let result = self
            .state
            .wait_for(|view| Ok(view.get_all_complete()?.then_some(())))
            .await;
        log_outcome("wait_until_complete", start, result)
    }
}

impl Drop for ProtocolEngine {
    fn drop(&mut self) {
        self.plugins.abort();
    }
}

impl std::fmt::Debug for ProtocolEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolEngine")
            .field("state", &self.state)
            .field("plugins", &self.plugins)
            .field("monitors", &self.monitors.len())
            .finish_non_exhaustive()
    }
}

fn log_outcome(op: &'static str, start: Instant, result: Result<()>) -> Result<()> {
    let duration_ms = start.elapsed().as_millis() as u64;
    match result {
        Ok(()) => {
            log_op_end!(op, duration_ms = duration_ms);
            Ok(())
        }
        Err(e) => {
            log_op_error!(op, e.clone(), duration_ms = duration_ms);
            Err(e)
        }
    }
}

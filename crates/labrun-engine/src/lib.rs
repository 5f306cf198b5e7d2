//! Labrun Engine - run orchestration
//!
//! Wraps the deterministic kernel in `labrun-core` with everything that
//! needs a runtime:
//! - [`StateStore`]: the run's state behind a lock, with change notification
//!   for condition-waits
//! - [`ActionDispatcher`]: serialized fan-out of actions to the store and
//!   plugins
//! - [`QueueWorker`]: background execution of queued commands
//! - [`DoorWatcher`], [`HardwareStopper`], [`ModuleMonitor`]
//! - [`ProtocolEngine`]: the run-control facade
//!
//! Hardware, command execution, the door sensor and module drivers are
//! capabilities supplied by the host ([`HardwareControl`],
//! [`CommandExecutor`], [`DoorSensor`], [`ModuleReader`]).

pub mod dispatcher;
pub mod door_watcher;
pub mod engine;
pub mod executor;
pub mod hardware;
pub mod hardware_stopper;
pub mod module_monitor;
pub mod plugins;
pub mod queue_worker;
pub mod state_store;

pub use dispatcher::{ActionDispatcher, ActionSink};
pub use door_watcher::{DoorFeed, DoorSensor, DoorWatcher};
pub use engine::{FinishOptions, ProtocolEngine, ProtocolEngineBuilder};
pub use executor::CommandExecutor;
pub use hardware::{HardwareApi, HardwareControl, PauseType};
pub use hardware_stopper::HardwareStopper;
pub use module_monitor::{ModuleMonitor, ModuleReader, ModuleSnapshot};
pub use plugins::{Plugin, PluginContext, PluginStarter};
pub use queue_worker::QueueWorker;
pub use state_store::StateStore;

//! Fakes for the capabilities the engine consumes

#![allow(dead_code)]

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use labrun_core::core_types::ModelUtils;
use labrun_core::model::params::HomeParams;
use labrun_core::{Command, CommandCreate, CommandIntent, CommandParams, Config, ErrorInfo};
use labrun_engine::{
    CommandExecutor, DoorFeed, HardwareControl, PauseType, ProtocolEngine, ProtocolEngineBuilder,
};
use serde_json::{json, Value};
use tokio::sync::Semaphore;

/// Fail the test instead of hanging if `future` does not finish promptly
pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("timed out")
}

/// Yield until `condition` holds, for effects that are not state changes
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    within(async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
}

pub fn home(key: &str) -> CommandCreate {
    CommandCreate::new(CommandParams::Home(HomeParams::default())).with_key(key)
}

pub fn setup_home(key: &str) -> CommandCreate {
    home(key).with_intent(CommandIntent::Setup)
}

/// Hardware controller that records every call in order
#[derive(Default)]
pub struct FakeHardware {
    calls: Mutex<Vec<String>>,
    fail_recovery: AtomicBool,
}

impl FakeHardware {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_recovery(&self) {
        self.fail_recovery.store(true, Ordering::SeqCst);
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

#[async_trait]
impl HardwareControl for FakeHardware {
    async fn pause(&self, pause_type: PauseType) -> anyhow::Result<()> {
        self.record(format!("pause:{:?}", pause_type));
        Ok(())
    }

    async fn resume(&self) -> anyhow::Result<()> {
        self.record("resume");
        Ok(())
    }

    async fn halt(&self) -> anyhow::Result<()> {
        self.record("halt");
        Ok(())
    }

    async fn stop_and_recover(&self, drop_tips_and_home: bool) -> anyhow::Result<()> {
        self.record(format!("stop_and_recover:{}", drop_tips_and_home));
        if self.fail_recovery.load(Ordering::SeqCst) {
            anyhow::bail!("gantry did not home");
        }
        Ok(())
    }
}

/// Executor that succeeds unless the command key starts with `fail`, and
/// panics on keys starting with `panic`
///
/// When gated, each execution waits for one permit from [`release`].
///
/// [`release`]: ScriptedExecutor::release
pub struct ScriptedExecutor {
    executed: Mutex<Vec<String>>,
    gate: Option<Semaphore>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self {
            executed: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub fn gated() -> Self {
        Self {
            executed: Mutex::new(Vec::new()),
            gate: Some(Semaphore::new(0)),
        }
    }

    pub fn release(&self, count: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(count);
        }
    }

    /// Keys of the commands that started executing, in order
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn execute(&self, command: &Command) -> anyhow::Result<Option<Value>> {
        self.executed.lock().unwrap().push(command.key.clone());
        if let Some(gate) = &self.gate {
            gate.acquire().await?.forget();
        }
        if command.key.starts_with("panic") {
            panic!("executor crashed on {}", command.key);
        }
        if command.key.starts_with("fail") {
            return Err(ErrorInfo::new("PipetteNotAttachedError", "no pipette on left mount").into());
        }
        Ok(Some(json!({ "key": command.key })))
    }
}

/// Deterministic ids (`id-0`, `id-1`, ...) and a clock that ticks one
/// second per reading
#[derive(Default)]
pub struct SequentialModelUtils {
    next_id: AtomicU64,
    next_tick: AtomicI64,
}

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::seconds(secs)
}

impl ModelUtils for SequentialModelUtils {
    fn generate_id(&self) -> String {
        format!("id-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn get_timestamp(&self) -> DateTime<Utc> {
        at(self.next_tick.fetch_add(1, Ordering::SeqCst))
    }
}

/// An engine wired to fakes, with handles to all of them
pub struct Harness {
    pub engine: ProtocolEngine,
    pub hardware: Arc<FakeHardware>,
    pub executor: Arc<ScriptedExecutor>,
    pub door: DoorFeed,
}

pub fn harness_with(
    executor: ScriptedExecutor,
    config: Config,
    door: DoorFeed,
    customize: impl FnOnce(ProtocolEngineBuilder) -> ProtocolEngineBuilder,
) -> Harness {
    let hardware = Arc::new(FakeHardware::default());
    let executor = Arc::new(executor);
    let builder = ProtocolEngine::builder(hardware.clone(), executor.clone())
        .config(config)
        .door_sensor(Arc::new(door.clone()))
        .model_utils(Arc::new(SequentialModelUtils::default()));
    Harness {
        engine: customize(builder).build(),
        hardware,
        executor,
        door,
    }
}

pub fn harness() -> Harness {
    harness_with(
        ScriptedExecutor::new(),
        Config::default(),
        DoorFeed::closed(),
        |builder| builder,
    )
}

pub fn gated_harness() -> Harness {
    harness_with(
        ScriptedExecutor::gated(),
        Config::default(),
        DoorFeed::closed(),
        |builder| builder,
    )
}

pub fn door_harness(door: DoorFeed, executor: ScriptedExecutor) -> Harness {
    harness_with(
        executor,
        Config {
            block_on_door_open: true,
        },
        door,
        |builder| builder,
    )
}

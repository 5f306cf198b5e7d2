//! The queue worker driven directly through a dispatcher, on a
//! multi-threaded runtime so that control actions race the worker.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::{Arc, Mutex};

use common::*;
use labrun_core::{Action, CommandStatus, Config, DoorState};
use labrun_engine::{ActionDispatcher, ActionSink, QueueWorker, StateStore};

/// Records every action as `name` or `update_command:<status>`
#[derive(Default)]
struct ActionLog {
    entries: Mutex<Vec<String>>,
}

impl ActionLog {
    fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }
}

impl ActionSink for ActionLog {
    fn handle_action(&self, action: &Action) {
        let entry = match action {
            Action::UpdateCommand { command } => {
                format!("update_command:{:?}", command.status)
            }
            other => other.name().to_string(),
        };
        self.entries.lock().unwrap().push(entry);
    }
}

fn queue(dispatcher: &ActionDispatcher, key: &str) {
    dispatcher
        .validate_and_dispatch(Action::QueueCommand {
            request: home(key),
            command_id: key.to_string(),
            created_at: at(0),
        })
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_no_command_starts_after_stop() {
    for _ in 0..200 {
        let state = Arc::new(StateStore::new(Config::default(), DoorState::Closed));
        let dispatcher = Arc::new(ActionDispatcher::new(state.clone()));
        let log = Arc::new(ActionLog::default());
        dispatcher.add_sink(log.clone());
        let executor = Arc::new(ScriptedExecutor::new());

        for index in 0..20 {
            queue(&dispatcher, &format!("c{index}"));
        }
        let mut worker = QueueWorker::new(
            dispatcher.clone(),
            executor.clone(),
            Arc::new(SequentialModelUtils::default()),
        );
        worker.start();

        dispatcher
            .validate_and_dispatch(Action::Play {
                requested_at: at(1),
            })
            .unwrap();
        tokio::task::yield_now().await;
        dispatcher.validate_and_dispatch(Action::Stop).unwrap();
        within(worker.join()).await.unwrap();

        let entries = log.entries();
        let stop = entries.iter().position(|e| e == "stop").unwrap();
        let started_after_stop = entries[stop..]
            .iter()
            .filter(|e| e.as_str() == "update_command:Running")
            .count();
        assert_eq!(started_after_stop, 0, "{entries:?}");

        // everything the executor saw was marked RUNNING before the stop
        let started_before_stop = entries[..stop]
            .iter()
            .filter(|e| e.as_str() == "update_command:Running")
            .count();
        assert_eq!(executor.executed().len(), started_before_stop);
        state.with_view(|view| {
            for command in view.get_all() {
                if command.status == CommandStatus::Running {
                    assert_eq!(view.get_running(), Some(command.id.as_str()));
                }
            }
        });
    }
}

#[tokio::test]
async fn test_pause_before_claim_leaves_command_queued() {
    let state = Arc::new(StateStore::new(Config::default(), DoorState::Closed));
    let dispatcher = Arc::new(ActionDispatcher::new(state.clone()));
    let executor = Arc::new(ScriptedExecutor::new());
    queue(&dispatcher, "a");

    // paused before the worker ever runs, so nothing may be claimed
    dispatcher
        .validate_and_dispatch(Action::Play {
            requested_at: at(1),
        })
        .unwrap();
    dispatcher
        .validate_and_dispatch(Action::Pause {
            source: labrun_core::PauseSource::Client,
        })
        .unwrap();
    let mut worker = QueueWorker::new(
        dispatcher.clone(),
        executor.clone(),
        Arc::new(SequentialModelUtils::default()),
    );
    worker.start();
    tokio::task::yield_now().await;

    assert!(executor.executed().is_empty());
    assert_eq!(
        state.with_view(|view| view.get("a").unwrap().status),
        CommandStatus::Queued
    );

    dispatcher.dispatch(Action::Stop);
    within(worker.join()).await.unwrap();
    assert!(executor.executed().is_empty());
}

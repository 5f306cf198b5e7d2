#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{TimeZone, Utc};
use labrun_core::core_types::schema::{
    EVENT_END, EVENT_END_ERROR, EVENT_START, FIELD_ACTION, FIELD_COMMAND_ID, FIELD_ERROR_ID,
    FIELD_ERR_CODE, FIELD_ERR_KIND, FIELD_QUEUE_STATUS, FIELD_RUN_RESULT,
};
use labrun_core::errors::ProtocolEngineError;
use labrun_core::logging_facility::test_capture::init_test_capture;
use labrun_core::model::params::HomeParams;
use labrun_core::{
    log_op_end, log_op_error, log_op_start, Action, CommandCreate, CommandParams, CommandStore,
    Config, DoorState, ErrorInfo,
};

#[test]
fn test_log_op_start_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_start_unique_1";

    log_op_start!(op_name);

    let starts = capture.count_events(|e| {
        e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_START)
    });
    assert_eq!(starts, 1);
}

#[test]
fn test_log_op_end_records_duration() {
    let capture = init_test_capture();
    let op_name = "test_log_op_end_unique_2";

    log_op_end!(op_name, duration_ms = 42);

    let events = capture.events_for_op(op_name);
    assert_eq!(events.len(), 1, "Should have exactly one end event");
    assert_eq!(events[0].event.as_deref(), Some(EVENT_END));
    assert_eq!(events[0].field("duration_ms"), Some("42"));
}

#[test]
fn test_log_op_error_includes_kind_and_code() {
    let capture = init_test_capture();
    let op_name = "test_log_op_error_unique_3";

    log_op_error!(op_name, ProtocolEngineError::PauseNotAllowed, duration_ms = 10);

    let events = capture.events_for_op(op_name);
    let error_event = events
        .iter()
        .find(|e| e.event.as_deref() == Some(EVENT_END_ERROR))
        .expect("Should have error event");
    assert_eq!(error_event.field(FIELD_ERR_CODE), Some("ERR_PAUSE_NOT_ALLOWED"));
    assert_eq!(error_event.field(FIELD_ERR_KIND), Some("PauseNotAllowed"));
}

#[test]
fn test_log_op_error_with_extra_fields() {
    let capture = init_test_capture();
    let op_name = "test_log_op_error_fields_unique_4";

    log_op_error!(
        op_name,
        ProtocolEngineError::not_found("cmd-1"),
        duration_ms = 1,
        command_id = "cmd-1"
    );

    let events = capture.events_for_op(op_name);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].field(FIELD_ERR_CODE), Some("ERR_NOT_FOUND"));
    assert_eq!(events[0].command_id(), Some("cmd-1"));
}

#[test]
fn test_boundary_single_start_end() {
    let capture = init_test_capture();
    let op_name = "test_boundary_unique_5";

    log_op_start!(op_name, command_type = "aspirate");
    log_op_end!(op_name, duration_ms = 7, command_id = "c1");

    let events = capture.events_for_op(op_name);
    let kinds: Vec<_> = events.iter().map(|e| e.event.as_deref()).collect();
    assert_eq!(kinds, vec![Some(EVENT_START), Some(EVENT_END)]);
    assert_eq!(events[0].field("command_type"), Some("aspirate"));
    assert_eq!(events[1].command_id(), Some("c1"));
}

#[test]
fn test_component_is_module_path() {
    let capture = init_test_capture();
    let op_name = "test_component_unique_6";

    log_op_start!(op_name);

    let events = capture.events_for_op(op_name);
    assert_eq!(
        events[0].component.as_deref(),
        Some("logging_facility_tests")
    );
}

#[test]
#[should_panic(expected = "Expected event")]
fn test_capture_assert_event_exists_fails() {
    let capture = init_test_capture();

    capture.assert_event_exists("nonexistent_op_truly_unique_999", EVENT_START);
}

#[test]
fn test_reducer_logs_use_schema_fields() {
    let capture = init_test_capture();
    let at = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
    let mut store = CommandStore::new(Config::default(), DoorState::Closed);

    store.handle_action(&Action::QueueCommand {
        request: CommandCreate::new(CommandParams::Home(HomeParams::default())),
        command_id: "reducer-log-cmd".to_string(),
        created_at: at,
    });
    store.handle_action(&Action::Play { requested_at: at });
    store.handle_action(&Action::FailCommand {
        command_id: "reducer-log-cmd".to_string(),
        error_id: "reducer-log-err".to_string(),
        error: ErrorInfo::new("PrettyBadError", "Oh no"),
        failed_at: at,
    });
    store.handle_action(&Action::Stop);

    let events = capture.events();
    assert!(events
        .iter()
        .any(|e| e.field(FIELD_ACTION) == Some("queue_command")));
    assert!(events
        .iter()
        .any(|e| e.field(FIELD_QUEUE_STATUS) == Some("Running")));
    assert!(events.iter().any(|e| {
        e.field(FIELD_COMMAND_ID) == Some("reducer-log-cmd")
            && e.field(FIELD_ERROR_ID) == Some("reducer-log-err")
    }));
    assert!(events
        .iter()
        .any(|e| e.field(FIELD_RUN_RESULT) == Some("Stopped")));
}

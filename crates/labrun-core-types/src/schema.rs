//! Canonical schema constants for structured logging and events
//!
//! These constants ensure consistency across all logging and error reporting.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";

// Entity identifiers
pub const FIELD_COMMAND_ID: &str = "command_id";
pub const FIELD_COMMAND_TYPE: &str = "command_type";
pub const FIELD_ERROR_ID: &str = "error_id";
pub const FIELD_MODULE_ID: &str = "module_id";

// Run state
pub const FIELD_QUEUE_STATUS: &str = "queue_status";
pub const FIELD_RUN_RESULT: &str = "run_result";
pub const FIELD_DOOR_STATE: &str = "door_state";
pub const FIELD_ACTION: &str = "action";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_accessibility() {
        assert!(!FIELD_COMPONENT.is_empty());
        assert!(!FIELD_OP.is_empty());
        assert!(!FIELD_COMMAND_ID.is_empty());
        assert!(!EVENT_START.is_empty());
        assert!(!EVENT_END.is_empty());
        assert!(!EVENT_END_ERROR.is_empty());
    }

    #[test]
    fn test_entity_and_state_fields_are_distinct() {
        let fields = [
            FIELD_COMMAND_ID,
            FIELD_COMMAND_TYPE,
            FIELD_ERROR_ID,
            FIELD_MODULE_ID,
            FIELD_QUEUE_STATUS,
            FIELD_RUN_RESULT,
            FIELD_DOOR_STATE,
            FIELD_ACTION,
        ];
        for (i, a) in fields.iter().enumerate() {
            for b in &fields[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_event_names_are_distinct() {
        assert_ne!(EVENT_START, EVENT_END);
        assert_ne!(EVENT_START, EVENT_END_ERROR);
        assert_ne!(EVENT_END, EVENT_END_ERROR);
    }
}

#![allow(clippy::unwrap_used, clippy::expect_used)]

use strata_core::errors::StrataError;
use strata_core::logging_facility::test_capture::init_test_capture;
use strata_core::{log_op_end, log_op_error, log_op_start, log_structural_note};
use strata_core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START, EVENT_STRUCTURAL_NOTE};

#[test]
fn test_start_and_end_pair() {
    let capture = init_test_capture();
    let op_name = "strata_test_start_end_1";

    log_op_start!(op_name, entity_name = "index");
    log_op_end!(op_name, duration_ms = 7);

    capture.assert_event_exists(op_name, EVENT_START);
    let end = capture
        .events()
        .into_iter()
        .find(|e| e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_END))
        .expect("end event");
    assert_eq!(end.fields.get("duration_ms"), Some(&"7".to_string()));
}

#[test]
fn test_error_event_carries_code() {
    let capture = init_test_capture();
    let op_name = "strata_test_error_2";

    let err = StrataError::ConflictingInheritance {
        type_name: "C".to_string(),
        member: "x".to_string(),
        first: "A".to_string(),
        second: "B".to_string(),
    };
    log_op_error!(op_name, err, duration_ms = 3);

    let event = capture
        .events()
        .into_iter()
        .find(|e| e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_END_ERROR))
        .expect("error event");
    assert_eq!(
        event.fields.get("err_code"),
        Some(&"ERR_CONFLICTING_INHERITANCE".to_string())
    );
}

#[test]
fn test_structural_note_is_warning() {
    let capture = init_test_capture();
    let op_name = "strata_test_note_3";

    log_structural_note!(op_name, "component cycle", cycle = "A -> B -> A");

    let event = capture
        .events()
        .into_iter()
        .find(|e| e.op.as_deref() == Some(op_name))
        .expect("note event");
    assert_eq!(event.event.as_deref(), Some(EVENT_STRUCTURAL_NOTE));
    assert_eq!(event.level, tracing::Level::WARN);
    assert_eq!(event.fields.get("cycle"), Some(&"A -> B -> A".to_string()));
}

#[test]
#[should_panic(expected = "Expected event")]
fn test_assert_event_exists_fails_for_missing_event() {
    let capture = init_test_capture();
    capture.assert_event_exists("strata_never_logged_999", EVENT_START);
}

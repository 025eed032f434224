//! Canonical schema constants for structured logging and events
//!
//! Every log line emitted by the deployment engine uses these keys so that
//! captured events can be asserted on and filtered consistently.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_RUN_ID: &str = "run_id";

// Entity identifiers
pub const FIELD_ENTITY_KIND: &str = "entity_kind";
pub const FIELD_RECONCILIATION_KEY: &str = "reconciliation_key";
pub const FIELD_ENTITY_NAME: &str = "entity_name";
pub const FIELD_PATH: &str = "path";

// Collection sizes
pub const FIELD_PAGE_COUNT: &str = "page_count";
pub const FIELD_COMPONENT_COUNT: &str = "component_count";
pub const FIELD_ISSUE_COUNT: &str = "issue_count";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
pub const EVENT_STRUCTURAL_NOTE: &str = "structural_note";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_accessibility() {
        assert!(!FIELD_COMPONENT.is_empty());
        assert!(!FIELD_OP.is_empty());
        assert!(!FIELD_RECONCILIATION_KEY.is_empty());
        assert!(!EVENT_START.is_empty());
        assert!(!EVENT_STRUCTURAL_NOTE.is_empty());
    }

    #[test]
    fn test_event_names_are_distinct() {
        let events = [EVENT_START, EVENT_END, EVENT_END_ERROR, EVENT_STRUCTURAL_NOTE];
        for (i, a) in events.iter().enumerate() {
            for b in &events[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}

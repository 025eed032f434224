//! Canonical logging macros

/// Log the start of an operation
///
/// ```
/// # use strata_core::log_op_start;
/// log_op_start!("export");
/// log_op_start!("import_page", entity_name = "index");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = strata_core_types::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = strata_core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the successful end of an operation
///
/// ```
/// # use strata_core::log_op_end;
/// log_op_end!("export", duration_ms = 42);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = strata_core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = strata_core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Log an operation error
///
/// Accepts anything convertible into `ExError` and records its kind and code.
///
/// ```
/// # use strata_core::log_op_error;
/// use strata_core::errors::StrataError;
/// let err = StrataError::PageNotFound { page_id: "p1".to_string() };
/// log_op_error!("read_page", err, duration_ms = 10);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = strata_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = strata_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
            $($field)*
        );
    }};
}

/// Log a structural note (warn level)
///
/// ```
/// # use strata_core::log_structural_note;
/// log_structural_note!("export_components", "component cycle", cycle = "A -> B -> A");
/// ```
#[macro_export]
macro_rules! log_structural_note {
    ($op:expr, $note:expr) => {
        tracing::warn!(
            component = module_path!(),
            op = $op,
            event = strata_core_types::schema::EVENT_STRUCTURAL_NOTE,
            note = $note,
        );
    };
    ($op:expr, $note:expr, $($field:tt)*) => {
        tracing::warn!(
            component = module_path!(),
            op = $op,
            event = strata_core_types::schema::EVENT_STRUCTURAL_NOTE,
            note = $note,
            $($field)*
        );
    };
}

//! Schema type flattening and view projection

pub mod inheritance;
pub mod views;

pub use inheritance::{flatten, subtypes_of, EffectiveType};
pub use views::{
    project_record, query_records, record_to_json, render_record, view_columns, ProjectedRecord,
    DEFAULT_VIEW,
};

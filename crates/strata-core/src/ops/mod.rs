pub mod content_ops;
pub mod file_ops;
pub mod principal_ops;
pub mod record_ops;
pub mod schema_ops;
pub mod store;

pub use content_ops::ContentRoot;
pub use store::Store;

//! On-disk deployment format
//!
//! ```text
//! <dir>/
//!   deploy.json
//!   pages.json            pages/<slug>-<key>.html
//!   components.json       components/<slug>-<key>.html
//!   files.json            files/<path...>
//!   schema/<TypeName>.json
//!   mail-templates.json
//!   localizations.json
//! ```

pub mod atomic;
pub mod layout;
pub mod manifest;
pub mod markup;

pub use atomic::atomic_write;

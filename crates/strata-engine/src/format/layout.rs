//! Artifact names and paths inside an export directory

use std::fs;
use std::path::Path;

use crate::errors::{io_error, Result};

/// Version written to and required in `deploy.json`
pub const FORMAT_VERSION: u32 = 1;

pub const DEPLOY_FILE: &str = "deploy.json";
pub const PAGES_FILE: &str = "pages.json";
pub const PAGES_DIR: &str = "pages";
pub const COMPONENTS_FILE: &str = "components.json";
pub const COMPONENTS_DIR: &str = "components";
pub const FILES_FILE: &str = "files.json";
pub const FILES_DIR: &str = "files";
pub const SCHEMA_DIR: &str = "schema";
pub const MAIL_TEMPLATES_FILE: &str = "mail-templates.json";
pub const LOCALIZATIONS_FILE: &str = "localizations.json";

const ARTIFACT_FILES: [&str; 6] = [
    DEPLOY_FILE,
    PAGES_FILE,
    COMPONENTS_FILE,
    FILES_FILE,
    MAIL_TEMPLATES_FILE,
    LOCALIZATIONS_FILE,
];
const ARTIFACT_DIRS: [&str; 4] = [PAGES_DIR, COMPONENTS_DIR, FILES_DIR, SCHEMA_DIR];

/// File-name-safe form of a display name
///
/// Lowercase ASCII alphanumerics, runs of anything else collapsed into a
/// single `-`, at most 40 characters.
pub fn slug(name: &str) -> String {
    let mut out = String::new();
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
        if out.len() >= 40 {
            break;
        }
    }
    let trimmed = out.trim_end_matches('-');
    if trimmed.is_empty() {
        "item".to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn page_file_name(name: &str, key: &str) -> String {
    format!("{}-{}.html", slug(name), key)
}

pub fn component_file_name(name: Option<&str>, key: &str) -> String {
    format!("{}-{}.html", slug(name.unwrap_or("component")), key)
}

pub fn schema_file_name(type_name: &str) -> String {
    format!("{}.json", type_name)
}

/// True for a single plain file name (no separators, not `.` or `..`)
pub fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

/// True for a relative `/`-separated path whose every segment is a plain name
pub fn is_safe_relative_path(path: &str) -> bool {
    !path.is_empty() && path.split('/').all(is_plain_file_name)
}

/// Remove every artifact a previous export left in `dir`
///
/// Files the format does not own are left alone.
pub fn clear_artifacts(dir: &Path) -> Result<()> {
    for name in ARTIFACT_FILES {
        let path = dir.join(name);
        if path.is_file() {
            fs::remove_file(&path).map_err(|e| io_error("clear_export", &path, e))?;
        }
    }
    for name in ARTIFACT_DIRS {
        let path = dir.join(name);
        if path.is_dir() {
            fs::remove_dir_all(&path).map_err(|e| io_error("clear_export", &path, e))?;
        }
    }
    Ok(())
}

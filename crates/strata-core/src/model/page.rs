use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::security::AccessControl;
use crate::errors::{Result, StrataError};

/// Positional parameter of a path template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathParameter {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

/// URL path template such as `/blog/{slug}/{page=1}`
///
/// `path` holds the template with defaults stripped (`/blog/{slug}/{page}`);
/// `parameters` lists the placeholders in positional order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathTemplate {
    pub path: String,
    #[serde(default)]
    pub parameters: Vec<PathParameter>,
}

impl PathTemplate {
    /// Parse a template, extracting `{name}` and `{name=default}` placeholders
    ///
    /// # Errors
    ///
    /// Returns `InvalidName` for unbalanced braces, empty or repeated names.
    pub fn parse(template: &str) -> Result<Self> {
        let mut path = String::with_capacity(template.len());
        let mut parameters: Vec<PathParameter> = Vec::new();
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            path.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| StrataError::InvalidName {
                reason: format!("unterminated placeholder in path template '{}'", template),
            })?;
            let body = &after[..close];
            let (name, default_value) = match body.split_once('=') {
                Some((n, d)) => (n.trim(), Some(d.to_string())),
                None => (body.trim(), None),
            };
            if name.is_empty() || name.contains('{') {
                return Err(StrataError::InvalidName {
                    reason: format!("invalid placeholder '{{{}}}' in '{}'", body, template),
                });
            }
            if parameters.iter().any(|p| p.name == name) {
                return Err(StrataError::InvalidName {
                    reason: format!("parameter '{}' repeated in '{}'", name, template),
                });
            }
            path.push('{');
            path.push_str(name);
            path.push('}');
            parameters.push(PathParameter {
                name: name.to_string(),
                default_value,
            });
            rest = &after[close + 1..];
        }
        if rest.contains('}') {
            return Err(StrataError::InvalidName {
                reason: format!("unbalanced '}}' in path template '{}'", template),
            });
        }
        path.push_str(rest);

        Ok(Self { path, parameters })
    }

    /// Substitute parameter values, falling back to defaults
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` when a parameter has neither a value nor a default.
    pub fn resolve(&self, values: &BTreeMap<String, String>) -> Result<String> {
        let mut out = self.path.clone();
        for param in &self.parameters {
            let value = values
                .get(&param.name)
                .or(param.default_value.as_ref())
                .ok_or_else(|| StrataError::InvalidOperation {
                    reason: format!("no value for path parameter '{}'", param.name),
                })?;
            out = out.replace(&format!("{{{}}}", param.name), value);
        }
        Ok(out)
    }

    /// Source form of the template, defaults written back inline
    pub fn template(&self) -> String {
        let mut out = self.path.clone();
        for param in &self.parameters {
            if let Some(default) = &param.default_value {
                out = out.replace(
                    &format!("{{{}}}", param.name),
                    &format!("{{{}={}}}", param.name, default),
                );
            }
        }
        out
    }
}

/// Root container of a markup tree plus page-level metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    pub key: String,
    pub name: String,
    pub custom_type: Option<String>,

    /// Ordered top-level node ids
    pub children: Vec<String>,

    pub content_type: Option<String>,
    pub cache_for_seconds: Option<u32>,
    pub dont_cache: bool,

    /// HTTP status codes for which this page is served as the error page
    pub show_on_error_codes: Vec<u16>,

    pub path_templates: Vec<PathTemplate>,
    pub position: i64,
    pub access: AccessControl,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Page {
    pub fn new(id: String, key: String, name: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            key,
            name,
            custom_type: None,
            children: Vec::new(),
            content_type: None,
            cache_for_seconds: None,
            dont_cache: false,
            show_on_error_codes: Vec::new(),
            path_templates: Vec::new(),
            position: 0,
            access: AccessControl::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

//! Auxiliary deployment artifacts travelling alongside content

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mail template, identified by `(name, locale)` on first import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MailTemplate {
    pub id: String,
    pub key: String,
    pub name: String,
    pub locale: String,
    pub text: String,
    pub updated_at: DateTime<Utc>,
}

impl MailTemplate {
    pub fn new(id: String, key: String, name: String, locale: String, text: String) -> Self {
        Self {
            id,
            key,
            name,
            locale,
            text,
            updated_at: Utc::now(),
        }
    }
}

/// Localized string, identified by `(name, domain, locale)` on first import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Localization {
    pub id: String,
    pub key: String,
    pub name: String,
    pub domain: Option<String>,
    pub locale: String,
    pub text: String,
    pub updated_at: DateTime<Utc>,
}

impl Localization {
    pub fn new(id: String, key: String, name: String, locale: String, text: String) -> Self {
        Self {
            id,
            key,
            name,
            domain: None,
            locale,
            text,
            updated_at: Utc::now(),
        }
    }
}

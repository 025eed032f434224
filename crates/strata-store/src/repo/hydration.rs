//! Hydration layer - loads the whole Store from SQLite
//!
//! Rows are read in id order so the rebuilt key index and shadow list do not
//! depend on SQLite's row order.

use rusqlite::Connection;
use serde::de::DeserializeOwned;
use strata_core::model::{
    ContentNode, File, Folder, Localization, MailTemplate, Page, Principal, Record, SchemaType,
};
use strata_core::Store;

use crate::errors::{corrupt_payload, from_rusqlite, Result};

fn load_payloads<T: DeserializeOwned>(conn: &Connection, table: &str) -> Result<Vec<T>> {
    let mut stmt = conn
        .prepare(&format!("SELECT id, payload FROM {} ORDER BY id", table))
        .map_err(from_rusqlite)?;

    let rows: Vec<(String, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;

    rows.into_iter()
        .map(|(id, json)| serde_json::from_str(&json).map_err(|e| corrupt_payload(table, &id, e)))
        .collect()
}

/// Load every persisted entity into a fresh Store
pub fn load_store(conn: &Connection) -> Result<Store> {
    let mut store = Store::new();

    for page in load_payloads::<Page>(conn, "pages")? {
        store.insert_page(page)?;
    }
    for node in load_payloads::<ContentNode>(conn, "nodes")? {
        store.insert_node(node)?;
    }
    for folder in load_payloads::<Folder>(conn, "folders")? {
        store.insert_folder(folder)?;
    }

    let mut files = load_payloads::<File>(conn, "files")?;
    let mut stmt = conn
        .prepare("SELECT content FROM files WHERE id = ?1")
        .map_err(from_rusqlite)?;
    for file in files.iter_mut() {
        file.content = stmt
            .query_row([&file.id], |row| row.get(0))
            .map_err(from_rusqlite)?;
    }
    for file in files {
        store.insert_file(file)?;
    }

    for principal in load_payloads::<Principal>(conn, "principals")? {
        store.insert_principal(principal)?;
    }
    for schema_type in load_payloads::<SchemaType>(conn, "schema_types")? {
        store.insert_type(schema_type)?;
    }
    for record in load_payloads::<Record>(conn, "records")? {
        store.insert_record(record)?;
    }
    for template in load_payloads::<MailTemplate>(conn, "mail_templates")? {
        store.insert_mail_template(template)?;
    }
    for localization in load_payloads::<Localization>(conn, "localizations")? {
        store.insert_localization(localization)?;
    }

    let mut stmt = conn
        .prepare("SELECT node_id FROM shadow_components ORDER BY ordinal")
        .map_err(from_rusqlite)?;
    let shadow: Vec<String> = stmt
        .query_map([], |row| row.get(0))
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;
    for node_id in shadow {
        store.add_to_shadow(&node_id)?;
    }

    Ok(store)
}

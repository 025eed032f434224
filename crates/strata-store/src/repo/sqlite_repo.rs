//! SQLite repository - saves the whole in-memory Store
//!
//! Each entity table holds a JSON payload plus the identity columns used for
//! lookups. `save_store` writes a full image of the store in one transaction:
//! rows whose id is gone from the store are deleted, the rest upserted.

use std::collections::HashSet;

use rusqlite::{params, Connection, Transaction};
use serde::Serialize;
use strata_core::errors::{ExError, ExErrorKind};
use strata_core::Store;

use crate::errors::{from_rusqlite, Result};

/// SQLite repository for the content store
pub struct SqliteRepo;

/// Tables holding one row per store entity, keyed by `id`
const ENTITY_TABLES: &[&str] = &[
    "pages",
    "nodes",
    "folders",
    "files",
    "principals",
    "schema_types",
    "records",
    "mail_templates",
    "localizations",
];

impl SqliteRepo {
    /// Persist the full store image atomically
    pub fn save_store(conn: &mut Connection, store: &Store) -> Result<()> {
        let tx = conn.transaction().map_err(from_rusqlite)?;
        Self::save_store_tx(&tx, store)?;
        tx.commit().map_err(from_rusqlite)?;
        tracing::debug!(
            pages = store.list_pages().len(),
            nodes = store.node_count(),
            "store saved"
        );
        Ok(())
    }

    /// Persist the full store image inside an existing transaction
    pub fn save_store_tx(tx: &Transaction, store: &Store) -> Result<()> {
        for table in ENTITY_TABLES {
            let live = live_ids(store, table);
            prune_table(tx, table, &live)?;
        }

        for page in store.list_pages() {
            tx.execute(
                "INSERT INTO pages (id, key, name, payload, updated_at) VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET key = excluded.key, name = excluded.name,
                   payload = excluded.payload, updated_at = excluded.updated_at",
                params![
                    page.id,
                    page.key,
                    page.name,
                    payload(&page.id, page)?,
                    page.updated_at.timestamp()
                ],
            )
            .map_err(from_rusqlite)?;
        }

        for node in store.list_nodes() {
            let parent_id = node.parent.as_ref().map(|p| p.id().to_string());
            tx.execute(
                "INSERT INTO nodes (id, key, name, parent_id, payload, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET key = excluded.key, name = excluded.name,
                   parent_id = excluded.parent_id, payload = excluded.payload, updated_at = excluded.updated_at",
                params![
                    node.id,
                    node.key,
                    node.name,
                    parent_id,
                    payload(&node.id, node)?,
                    node.updated_at.timestamp()
                ],
            )
            .map_err(from_rusqlite)?;
        }

        // Shadow membership is positional; rewrite it whole.
        tx.execute("DELETE FROM shadow_components", [])
            .map_err(from_rusqlite)?;
        for (ordinal, node_id) in store.shadow_components().iter().enumerate() {
            tx.execute(
                "INSERT INTO shadow_components (node_id, ordinal) VALUES (?1, ?2)",
                params![node_id, ordinal as i64],
            )
            .map_err(from_rusqlite)?;
        }

        for folder in store.list_folders() {
            tx.execute(
                "INSERT INTO folders (id, key, name, parent_id, payload, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET key = excluded.key, name = excluded.name,
                   parent_id = excluded.parent_id, payload = excluded.payload, updated_at = excluded.updated_at",
                params![
                    folder.id,
                    folder.key,
                    folder.name,
                    folder.parent_id,
                    payload(&folder.id, folder)?,
                    folder.updated_at.timestamp()
                ],
            )
            .map_err(from_rusqlite)?;
        }

        for file in store.list_files() {
            tx.execute(
                "INSERT INTO files (id, key, name, parent_id, payload, content, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id) DO UPDATE SET key = excluded.key, name = excluded.name,
                   parent_id = excluded.parent_id, payload = excluded.payload,
                   content = excluded.content, updated_at = excluded.updated_at",
                params![
                    file.id,
                    file.key,
                    file.name,
                    file.parent_id,
                    payload(&file.id, file)?,
                    file.content,
                    file.updated_at.timestamp()
                ],
            )
            .map_err(from_rusqlite)?;
        }

        for principal in store.list_principals() {
            tx.execute(
                "INSERT INTO principals (id, key, name, payload) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET key = excluded.key, name = excluded.name,
                   payload = excluded.payload",
                params![
                    principal.id,
                    principal.key,
                    principal.name,
                    payload(&principal.id, principal)?
                ],
            )
            .map_err(from_rusqlite)?;
        }

        for schema_type in store.list_types() {
            tx.execute(
                "INSERT INTO schema_types (id, key, name, payload, updated_at) VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET key = excluded.key, name = excluded.name,
                   payload = excluded.payload, updated_at = excluded.updated_at",
                params![
                    schema_type.id,
                    schema_type.key,
                    schema_type.name,
                    payload(&schema_type.id, schema_type)?,
                    schema_type.updated_at.timestamp()
                ],
            )
            .map_err(from_rusqlite)?;
        }

        for record in store.list_records() {
            tx.execute(
                "INSERT INTO records (id, key, type_name, payload, updated_at) VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET key = excluded.key, type_name = excluded.type_name,
                   payload = excluded.payload, updated_at = excluded.updated_at",
                params![
                    record.id,
                    record.key,
                    record.type_name,
                    payload(&record.id, record)?,
                    record.updated_at.timestamp()
                ],
            )
            .map_err(from_rusqlite)?;
        }

        for template in store.list_mail_templates() {
            tx.execute(
                "INSERT INTO mail_templates (id, key, name, payload) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET key = excluded.key, name = excluded.name,
                   payload = excluded.payload",
                params![template.id, template.key, template.name, payload(&template.id, template)?],
            )
            .map_err(from_rusqlite)?;
        }

        for localization in store.list_localizations() {
            tx.execute(
                "INSERT INTO localizations (id, key, name, payload) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET key = excluded.key, name = excluded.name,
                   payload = excluded.payload",
                params![
                    localization.id,
                    localization.key,
                    localization.name,
                    payload(&localization.id, localization)?
                ],
            )
            .map_err(from_rusqlite)?;
        }

        Ok(())
    }
}

fn payload<T: Serialize>(id: &str, value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| {
        ExError::new(ExErrorKind::Serialization)
            .with_op("save_store")
            .with_entity_id(id)
            .with_message(e.to_string())
    })
}

fn live_ids(store: &Store, table: &str) -> HashSet<String> {
    let ids: Vec<&str> = match table {
        "pages" => store.list_pages().into_iter().map(|e| e.id.as_str()).collect(),
        "nodes" => store.list_nodes().into_iter().map(|e| e.id.as_str()).collect(),
        "folders" => store.list_folders().into_iter().map(|e| e.id.as_str()).collect(),
        "files" => store.list_files().into_iter().map(|e| e.id.as_str()).collect(),
        "principals" => store
            .list_principals()
            .into_iter()
            .map(|e| e.id.as_str())
            .collect(),
        "schema_types" => store.list_types().into_iter().map(|e| e.id.as_str()).collect(),
        "records" => store.list_records().into_iter().map(|e| e.id.as_str()).collect(),
        "mail_templates" => store
            .list_mail_templates()
            .into_iter()
            .map(|e| e.id.as_str())
            .collect(),
        "localizations" => store
            .list_localizations()
            .into_iter()
            .map(|e| e.id.as_str())
            .collect(),
        _ => Vec::new(),
    };
    ids.into_iter().map(str::to_string).collect()
}

fn prune_table(tx: &Transaction, table: &str, live: &HashSet<String>) -> Result<()> {
    let stored: Vec<String> = {
        let mut stmt = tx
            .prepare(&format!("SELECT id FROM {}", table))
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([], |row| row.get(0))
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<String>, _>>()
            .map_err(from_rusqlite)?;
        rows
    };

    for id in stored.iter().filter(|id| !live.contains(*id)) {
        tx.execute(&format!("DELETE FROM {} WHERE id = ?1", table), [id])
            .map_err(from_rusqlite)?;
    }
    Ok(())
}

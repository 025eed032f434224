//! Folders and files
//!
//! Entries are applied parents first. A folder or file is matched by key,
//! then by path; a match is moved and renamed into place. The opt-in flag
//! is written on roots only.
//!
//! When the destination name is held by another local entry, a holder that
//! is in the export is parked under a temporary name until its own entry
//! moves it, and any other holder is renamed aside and reported. Parked
//! entries whose own entry failed get their old name back at the end.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use strata_core::errors::{ExError, ExErrorKind};
use strata_core::hash::hash_bytes;
use strata_core::model::{EntityKind, EntityRef};
use strata_core::ops::file_ops;
use strata_core::Store;

use super::ImportContext;
use crate::errors::{io_error, Result};
use crate::format::layout;
use crate::format::manifest::{FileEntry, FileEntryKind};
use crate::reconcile::{reconcile, Match};
use crate::report::Issue;

pub(crate) fn import_files(
    store: &mut Store,
    ctx: &mut ImportContext,
    dir: &Path,
    entries: &[FileEntry],
) {
    let mut ordered: Vec<&FileEntry> = entries.iter().collect();
    ordered.sort_by(|a, b| {
        (a.path.matches('/').count(), &a.path).cmp(&(b.path.matches('/').count(), &b.path))
    });

    // Folder path to store id, for folders placed by this import
    let mut placed: HashMap<String, String> = HashMap::new();
    let mut parked: Vec<Parked> = Vec::new();
    let mut applied: HashSet<String> = HashSet::new();

    for entry in ordered {
        let label = match entry.kind {
            FileEntryKind::Folder => "folder",
            FileEntryKind::File => "file",
        };
        let mut moves = Moves::default();
        let outcome = ctx.atomically(store, |s, c| match entry.kind {
            FileEntryKind::Folder => apply_folder(s, c, &placed, entry, &mut moves),
            FileEntryKind::File => apply_file(s, c, dir, &placed, entry, &mut moves),
        });
        match outcome {
            Ok(id) => {
                applied.insert(id.clone());
                if entry.kind == FileEntryKind::Folder {
                    placed.insert(entry.path.clone(), id);
                }
                parked.extend(moves.parked);
                for issue in moves.displaced {
                    ctx.report.warn(issue);
                }
            }
            Err(err) => {
                if let Some(id) = candidate(store, ctx, entry) {
                    ctx.claimed.insert(id);
                }
                ctx.report.issue(
                    Issue::from_error(label, &err)
                        .with_key(entry.key.clone())
                        .with_name(entry.path.clone()),
                );
            }
        }
    }

    unpark(store, ctx, &applied, parked);
}

/// Entry moved off a destination for an exported entry that had not been
/// applied yet
struct Parked {
    entity: EntityRef,
    name: String,
    parent_id: Option<String>,
}

/// Side moves made while applying one entry, kept only if it commits
#[derive(Default)]
struct Moves {
    parked: Vec<Parked>,
    displaced: Vec<Issue>,
}

fn name_and_parent(store: &Store, entity: &EntityRef) -> Result<(String, Option<String>)> {
    Ok(match entity.kind {
        EntityKind::Folder => {
            let f = store.get_folder(&entity.id)?;
            (f.name.clone(), f.parent_id.clone())
        }
        _ => {
            let f = store.get_file(&entity.id)?;
            (f.name.clone(), f.parent_id.clone())
        }
    })
}

fn rename_in_place(store: &mut Store, entity: &EntityRef, name: &str) -> Result<()> {
    let (_, parent) = name_and_parent(store, entity)?;
    match entity.kind {
        EntityKind::Folder => file_ops::move_folder(store, &entity.id, name, parent.as_deref())?,
        _ => file_ops::move_file(store, &entity.id, name, parent.as_deref())?,
    }
    Ok(())
}

/// Make `name` under `parent` free for `owner` (a new entry when `None`)
fn clear_destination(
    store: &mut Store,
    ctx: &ImportContext,
    name: &str,
    parent: Option<&str>,
    owner: Option<&str>,
    moves: &mut Moves,
) -> Result<()> {
    let Some(holder) = file_ops::entry_named(store, name, parent) else {
        return Ok(());
    };
    if Some(holder.id.as_str()) == owner {
        return Ok(());
    }
    let key = store.key_of(&holder)?.to_string();

    if ctx.incoming_keys.contains(&key) && !ctx.claimed.contains(&holder.id) {
        let temporary = file_ops::free_name(store, &format!("{}.renaming", name), parent);
        rename_in_place(store, &holder, &temporary)?;
        moves.parked.push(Parked {
            entity: holder,
            name: name.to_string(),
            parent_id: parent.map(str::to_string),
        });
        return Ok(());
    }

    let displaced = file_ops::free_name(store, &format!("{} (local)", name), parent);
    rename_in_place(store, &holder, &displaced)?;
    let label = if holder.kind == EntityKind::Folder {
        "folder"
    } else {
        "file"
    };
    moves.displaced.push(
        Issue::new(
            ExErrorKind::StructuralMismatch,
            label,
            format!(
                "local entry {} is not in the export and was renamed to {}",
                name, displaced
            ),
        )
        .with_key(key)
        .with_name(displaced),
    );
    Ok(())
}

/// Give parked entries their old name back when nothing took it meanwhile
fn unpark(
    store: &mut Store,
    ctx: &mut ImportContext,
    applied: &HashSet<String>,
    parked: Vec<Parked>,
) {
    for p in parked {
        if applied.contains(&p.entity.id) {
            continue;
        }
        let Ok(key) = store.key_of(&p.entity).map(str::to_string) else {
            continue;
        };
        let restored = if file_ops::entry_named(store, &p.name, p.parent_id.as_deref()).is_none()
        {
            rename_in_place(store, &p.entity, &p.name).is_ok()
        } else {
            false
        };
        if !restored {
            let current = name_and_parent(store, &p.entity)
                .map(|(name, _)| name)
                .unwrap_or_default();
            ctx.report.warn(
                Issue::new(
                    ExErrorKind::StructuralMismatch,
                    if p.entity.kind == EntityKind::Folder {
                        "folder"
                    } else {
                        "file"
                    },
                    format!("{} could not take back its name {}", current, p.name),
                )
                .with_key(key),
            );
        }
    }
}

fn entity_kind(entry: &FileEntry) -> EntityKind {
    match entry.kind {
        FileEntryKind::Folder => EntityKind::Folder,
        FileEntryKind::File => EntityKind::File,
    }
}

/// Existing entity at the entry's path whose key is not in the export
fn by_path(store: &Store, ctx: &ImportContext, entry: &FileEntry) -> Option<String> {
    let id = match entry.kind {
        FileEntryKind::Folder => file_ops::resolve_folder_path(store, &entry.path),
        FileEntryKind::File => file_ops::resolve_file_path(store, &entry.path),
    }?;
    let key = store.key_of(&EntityRef::new(entity_kind(entry), &id)).ok()?;
    (!ctx.incoming_keys.contains(key) && !ctx.claimed.contains(&id)).then_some(id)
}

fn candidate(store: &Store, ctx: &ImportContext, entry: &FileEntry) -> Option<String> {
    match store.find_by_key(&entry.key) {
        Some(found) if found.kind == entity_kind(entry) => Some(found.id.clone()),
        Some(_) => None,
        None => by_path(store, ctx, entry),
    }
}

fn parent_id(
    store: &Store,
    placed: &HashMap<String, String>,
    entry: &FileEntry,
) -> Result<Option<String>> {
    let Some(parent) = entry.parent_path() else {
        return Ok(None);
    };
    placed
        .get(parent)
        .cloned()
        .or_else(|| file_ops::resolve_folder_path(store, parent))
        .map(Some)
        .ok_or_else(|| {
            ExError::new(ExErrorKind::StructuralMismatch)
                .with_key(entry.key.clone())
                .with_path(entry.path.clone())
                .with_message(format!("parent folder {} is not in the target", parent))
        })
}

fn check_entry(store: &Store, entry: &FileEntry) -> Result<()> {
    if !layout::is_safe_relative_path(&entry.path) {
        return Err(ExError::new(ExErrorKind::StructuralMismatch)
            .with_key(entry.key.clone())
            .with_message(format!("'{}' is not a relative path", entry.path)));
    }
    if let Some(t) = &entry.custom_type {
        if store.type_by_name(t).is_none() {
            return Err(ExError::new(ExErrorKind::UnresolvedSchemaDependency)
                .with_key(entry.key.clone())
                .with_message(format!("type {} is not defined", t)));
        }
    }
    Ok(())
}

fn apply_folder(
    store: &mut Store,
    ctx: &mut ImportContext,
    placed: &HashMap<String, String>,
    entry: &FileEntry,
    moves: &mut Moves,
) -> Result<String> {
    check_entry(store, entry)?;
    let parent = parent_id(store, placed, entry)?;
    let matched = reconcile(store, EntityKind::Folder, &entry.key, |s| by_path(s, ctx, entry))?;

    let id = match matched {
        Match::Matched { id, .. } => {
            let folder = store.get_folder(&id)?;
            if folder.name != entry.name() || folder.parent_id != parent {
                clear_destination(store, ctx, entry.name(), parent.as_deref(), Some(&id), moves)?;
                file_ops::move_folder(store, &id, entry.name(), parent.as_deref())?;
            }
            ctx.report.tally("folder").updated += 1;
            id
        }
        Match::NotFound => {
            clear_destination(store, ctx, entry.name(), parent.as_deref(), None, moves)?;
            let id = file_ops::create_folder(store, entry.name(), parent.as_deref())?;
            store.rekey(&EntityRef::folder(&id), &entry.key)?;
            ctx.report.tally("folder").created += 1;
            id
        }
    };

    let folder = store.get_folder_mut(&id)?;
    if folder.parent_id.is_none() {
        folder.include_in_export = entry.included;
    }
    folder.custom_type = entry.custom_type.clone();
    ctx.claimed.insert(id.clone());
    ctx.defer_acl(EntityRef::folder(&id), &entry.key, &entry.acl);
    Ok(id)
}

fn apply_file(
    store: &mut Store,
    ctx: &mut ImportContext,
    dir: &Path,
    placed: &HashMap<String, String>,
    entry: &FileEntry,
    moves: &mut Moves,
) -> Result<String> {
    check_entry(store, entry)?;
    let source = dir.join(layout::FILES_DIR).join(&entry.path);
    let content = std::fs::read(&source).map_err(|e| {
        let err = io_error("read_file", &source, e);
        ExError::new(ExErrorKind::UnreadableEntity)
            .with_path(entry.path.clone())
            .with_message(err.message().to_string())
    })?;
    if let Some(expected) = &entry.sha256 {
        let actual = hash_bytes(&content);
        if &actual != expected {
            return Err(ExError::new(ExErrorKind::StructuralMismatch)
                .with_key(entry.key.clone())
                .with_path(entry.path.clone())
                .with_message(format!(
                    "content digest {} does not match manifest {}",
                    actual, expected
                )));
        }
    }
    let parent = parent_id(store, placed, entry)?;
    let matched = reconcile(store, EntityKind::File, &entry.key, |s| by_path(s, ctx, entry))?;

    let id = match matched {
        Match::Matched { id, .. } => {
            let file = store.get_file(&id)?;
            if file.name != entry.name() || file.parent_id != parent {
                clear_destination(store, ctx, entry.name(), parent.as_deref(), Some(&id), moves)?;
                file_ops::move_file(store, &id, entry.name(), parent.as_deref())?;
            }
            ctx.report.tally("file").updated += 1;
            id
        }
        Match::NotFound => {
            clear_destination(store, ctx, entry.name(), parent.as_deref(), None, moves)?;
            let id = file_ops::create_file(store, entry.name(), parent.as_deref(), Vec::new())?;
            store.rekey(&EntityRef::file(&id), &entry.key)?;
            ctx.report.tally("file").created += 1;
            id
        }
    };

    let file = store.get_file_mut(&id)?;
    file.content = content;
    file.content_type = entry.content_type.clone();
    file.custom_type = entry.custom_type.clone();
    if file.parent_id.is_none() {
        file.include_in_export = entry.included;
    }
    ctx.claimed.insert(id.clone());
    ctx.defer_acl(EntityRef::file(&id), &entry.key, &entry.acl);
    Ok(id)
}

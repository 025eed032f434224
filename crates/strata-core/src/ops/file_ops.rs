//! Folder and file hierarchy operations
//!
//! Export participation is decided by the root of the parent chain only:
//! the `include_in_export` flag on intermediate folders is ignored.

use super::content_ops::validate_entity_name;
use super::store::Store;
use crate::errors::{Result, StrataError};
use crate::model::{new_id, new_key, EntityRef, File, Folder};

/// Create a folder under `parent_id` (or at the root)
///
/// # Errors
/// * `InvalidName` - If the name is empty or contains a separator
/// * `FolderNotFound` - If the parent does not exist
/// * `DuplicateName` - If the parent already holds an entry with that name
pub fn create_folder(store: &mut Store, name: &str, parent_id: Option<&str>) -> Result<String> {
    validate_entity_name(name)?;
    check_free_name(store, name, parent_id, None)?;
    let id = new_id();
    let folder = Folder::new(
        id.clone(),
        new_key(),
        name.to_string(),
        parent_id.map(str::to_string),
    );
    store.insert_folder(folder)?;
    Ok(id)
}

/// Create a file with its content under `parent_id` (or at the root)
///
/// # Errors
/// Same as [`create_folder`].
pub fn create_file(
    store: &mut Store,
    name: &str,
    parent_id: Option<&str>,
    content: Vec<u8>,
) -> Result<String> {
    validate_entity_name(name)?;
    check_free_name(store, name, parent_id, None)?;
    let id = new_id();
    let mut file = File::new(
        id.clone(),
        new_key(),
        name.to_string(),
        parent_id.map(str::to_string),
    );
    file.content = content;
    store.insert_file(file)?;
    Ok(id)
}

/// Set the opt-in flag on a folder
///
/// # Errors
/// * `FolderNotFound` - If the folder does not exist
pub fn set_folder_included(store: &mut Store, folder_id: &str, included: bool) -> Result<()> {
    store.get_folder_mut(folder_id)?.include_in_export = included;
    Ok(())
}

/// Set the opt-in flag on a root-level file
///
/// # Errors
/// * `FileNotFound` - If the file does not exist
pub fn set_file_included(store: &mut Store, file_id: &str, included: bool) -> Result<()> {
    store.get_file_mut(file_id)?.include_in_export = included;
    Ok(())
}

/// Root folder id of a folder's chain (the folder itself when it is a root)
///
/// # Errors
/// * `FolderNotFound` - If the chain is broken
/// * `CycleDetected` - If the parent chain loops
pub fn root_folder(store: &Store, folder_id: &str) -> Result<String> {
    let mut current = folder_id.to_string();
    let mut steps = 0usize;
    loop {
        let folder = store.get_folder(&current)?;
        match &folder.parent_id {
            None => return Ok(current),
            Some(parent) => current = parent.clone(),
        }
        steps += 1;
        if steps > store.folders.len() {
            return Err(StrataError::CycleDetected {
                node_id: folder_id.to_string(),
            });
        }
    }
}

/// Whether a folder participates in export
///
/// # Errors
/// Same as [`root_folder`].
pub fn is_folder_included(store: &Store, folder_id: &str) -> Result<bool> {
    let root = root_folder(store, folder_id)?;
    Ok(store.get_folder(&root)?.include_in_export)
}

/// Whether a file participates in export
///
/// Root-level files carry their own flag; other files follow their root folder.
///
/// # Errors
/// Same as [`root_folder`].
pub fn is_file_included(store: &Store, file_id: &str) -> Result<bool> {
    let file = store.get_file(file_id)?;
    match &file.parent_id {
        None => Ok(file.include_in_export),
        Some(parent) => is_folder_included(store, parent),
    }
}

/// Slash-separated path of a folder, e.g. `assets/img`
///
/// # Errors
/// Same as [`root_folder`].
pub fn folder_path(store: &Store, folder_id: &str) -> Result<String> {
    let mut segments = Vec::new();
    let mut current = Some(folder_id.to_string());
    while let Some(id) = current {
        let folder = store.get_folder(&id)?;
        segments.push(folder.name.clone());
        if segments.len() > store.folders.len() {
            return Err(StrataError::CycleDetected { node_id: id });
        }
        current = folder.parent_id.clone();
    }
    segments.reverse();
    Ok(segments.join("/"))
}

/// Slash-separated path of a file
///
/// # Errors
/// Same as [`root_folder`].
pub fn file_path(store: &Store, file_id: &str) -> Result<String> {
    let file = store.get_file(file_id)?;
    match &file.parent_id {
        None => Ok(file.name.clone()),
        Some(parent) => Ok(format!("{}/{}", folder_path(store, parent)?, file.name)),
    }
}

/// Find a folder by slash-separated path
pub fn resolve_folder_path(store: &Store, path: &str) -> Option<String> {
    let mut parent: Option<String> = None;
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        let found = store
            .folders
            .values()
            .find(|f| f.name == segment && f.parent_id == parent)?;
        parent = Some(found.id.clone());
    }
    parent
}

/// Find a file by slash-separated path
pub fn resolve_file_path(store: &Store, path: &str) -> Option<String> {
    let (dir, name) = match path.rsplit_once('/') {
        Some((dir, name)) => (Some(dir), name),
        None => (None, path),
    };
    let parent = match dir {
        Some(dir) => Some(resolve_folder_path(store, dir)?),
        None => None,
    };
    store
        .files
        .values()
        .find(|f| f.name == name && f.parent_id == parent)
        .map(|f| f.id.clone())
}

/// Move or rename a folder
///
/// # Errors
/// * `DuplicateName` - If the destination already holds that name
/// * `CycleDetected` - If the folder would become its own ancestor
pub fn move_folder(
    store: &mut Store,
    folder_id: &str,
    name: &str,
    parent_id: Option<&str>,
) -> Result<()> {
    validate_entity_name(name)?;
    check_free_name(store, name, parent_id, Some(folder_id))?;
    if let Some(parent) = parent_id {
        let mut current = Some(parent.to_string());
        while let Some(id) = current {
            if id == folder_id {
                return Err(StrataError::CycleDetected {
                    node_id: folder_id.to_string(),
                });
            }
            current = store.get_folder(&id)?.parent_id.clone();
        }
    }
    let folder = store.get_folder_mut(folder_id)?;
    folder.name = name.to_string();
    folder.parent_id = parent_id.map(str::to_string);
    Ok(())
}

/// Move or rename a file
///
/// # Errors
/// * `DuplicateName` - If the destination already holds that name
pub fn move_file(
    store: &mut Store,
    file_id: &str,
    name: &str,
    parent_id: Option<&str>,
) -> Result<()> {
    validate_entity_name(name)?;
    check_free_name(store, name, parent_id, Some(file_id))?;
    if let Some(parent) = parent_id {
        store.get_folder(parent)?;
    }
    let file = store.get_file_mut(file_id)?;
    file.name = name.to_string();
    file.parent_id = parent_id.map(str::to_string);
    Ok(())
}

/// Delete a folder with everything below it
///
/// # Errors
/// * `FolderNotFound` - If the folder does not exist
pub fn delete_folder(store: &mut Store, folder_id: &str) -> Result<()> {
    store.get_folder(folder_id)?;
    let mut pending = vec![folder_id.to_string()];
    let mut doomed = Vec::new();
    while let Some(id) = pending.pop() {
        pending.extend(
            store
                .folders
                .values()
                .filter(|f| f.parent_id.as_deref() == Some(id.as_str()))
                .map(|f| f.id.clone()),
        );
        doomed.push(id);
    }
    let files: Vec<String> = store
        .files
        .values()
        .filter(|f| {
            f.parent_id
                .as_ref()
                .map(|p| doomed.contains(p))
                .unwrap_or(false)
        })
        .map(|f| f.id.clone())
        .collect();
    for id in files {
        store.remove_file_entry(&id);
    }
    for id in doomed {
        store.remove_folder_entry(&id);
    }
    Ok(())
}

/// # Errors
/// * `FileNotFound` - If the file does not exist
pub fn delete_file(store: &mut Store, file_id: &str) -> Result<()> {
    store
        .remove_file_entry(file_id)
        .map(|_| ())
        .ok_or_else(|| StrataError::FileNotFound {
            file_id: file_id.to_string(),
        })
}

/// Folder or file named `name` directly under `parent_id` (or at the root)
pub fn entry_named(store: &Store, name: &str, parent_id: Option<&str>) -> Option<EntityRef> {
    store
        .folders
        .values()
        .find(|f| f.name == name && f.parent_id.as_deref() == parent_id)
        .map(|f| EntityRef::folder(&f.id))
        .or_else(|| {
            store
                .files
                .values()
                .find(|f| f.name == name && f.parent_id.as_deref() == parent_id)
                .map(|f| EntityRef::file(&f.id))
        })
}

/// First of `stem`, `stem 2`, `stem 3`, ... that is free under `parent_id`
pub fn free_name(store: &Store, stem: &str, parent_id: Option<&str>) -> String {
    let mut candidate = stem.to_string();
    let mut n = 2;
    while entry_named(store, &candidate, parent_id).is_some() {
        candidate = format!("{} {}", stem, n);
        n += 1;
    }
    candidate
}

fn check_free_name(
    store: &Store,
    name: &str,
    parent_id: Option<&str>,
    except: Option<&str>,
) -> Result<()> {
    if let Some(parent) = parent_id {
        store.get_folder(parent)?;
    }
    let taken = store
        .folders
        .values()
        .map(|f| (&f.id, &f.name, &f.parent_id))
        .chain(store.files.values().map(|f| (&f.id, &f.name, &f.parent_id)))
        .any(|(id, n, p)| {
            n == name && p.as_deref() == parent_id && Some(id.as_str()) != except
        });
    if taken {
        return Err(StrataError::DuplicateName {
            name: name.to_string(),
            scope: parent_id.unwrap_or("/").to_string(),
        });
    }
    Ok(())
}

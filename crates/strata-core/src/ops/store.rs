use std::collections::HashMap;

use crate::errors::{Result, StrataError};
use crate::model::{
    AccessControl, ContentNode, EntityKind, EntityRef, File, Folder, Localization, MailTemplate,
    Page, Principal, Record, SchemaType,
};

/// In-memory content store
///
/// HashMap-backed, single-threaded. Every exportable entity is also indexed by
/// its reconciliation key so the importer can find it independently of the
/// store-assigned id. Shared component roots are listed in `shadow`, the
/// reserved container that is never exported as a page.
#[derive(Debug, Clone, Default)]
pub struct Store {
    pub(crate) pages: HashMap<String, Page>,
    pub(crate) nodes: HashMap<String, ContentNode>,
    pub(crate) shadow: Vec<String>,
    pub(crate) folders: HashMap<String, Folder>,
    pub(crate) files: HashMap<String, File>,
    pub(crate) principals: HashMap<String, Principal>,
    pub(crate) types: HashMap<String, SchemaType>,
    pub(crate) records: HashMap<String, Record>,
    pub(crate) mail_templates: HashMap<String, MailTemplate>,
    pub(crate) localizations: HashMap<String, Localization>,
    pub(crate) key_index: HashMap<String, EntityRef>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    // ===== Key index =====

    /// Look up the entity carrying a reconciliation key
    pub fn find_by_key(&self, key: &str) -> Option<&EntityRef> {
        self.key_index.get(key)
    }

    fn claim_key(&mut self, key: &str, entity: EntityRef) -> Result<()> {
        if let Some(existing) = self.key_index.get(key) {
            if existing != &entity {
                return Err(StrataError::DuplicateKey {
                    key: key.to_string(),
                    existing: existing.to_string(),
                });
            }
        }
        self.key_index.insert(key.to_string(), entity);
        Ok(())
    }

    /// Replace the reconciliation key of an entity
    ///
    /// # Errors
    ///
    /// Returns `DuplicateKey` if `new_key` is bound to another entity, or a
    /// not-found error if the entity does not exist.
    pub fn rekey(&mut self, entity: &EntityRef, new_key: &str) -> Result<()> {
        let old_key = self.key_of(entity)?.to_string();
        if old_key == new_key {
            return Ok(());
        }
        self.claim_key(new_key, entity.clone())?;
        self.key_index.remove(&old_key);
        let slot = match entity.kind {
            EntityKind::Node => self.nodes.get_mut(&entity.id).map(|e| &mut e.key),
            EntityKind::Page => self.pages.get_mut(&entity.id).map(|e| &mut e.key),
            EntityKind::Folder => self.folders.get_mut(&entity.id).map(|e| &mut e.key),
            EntityKind::File => self.files.get_mut(&entity.id).map(|e| &mut e.key),
            EntityKind::SchemaType => self.types.get_mut(&entity.id).map(|e| &mut e.key),
            EntityKind::Record => self.records.get_mut(&entity.id).map(|e| &mut e.key),
            EntityKind::MailTemplate => self.mail_templates.get_mut(&entity.id).map(|e| &mut e.key),
            EntityKind::Localization => self.localizations.get_mut(&entity.id).map(|e| &mut e.key),
            EntityKind::Principal => self.principals.get_mut(&entity.id).map(|e| &mut e.key),
        };
        match slot {
            Some(key) => {
                *key = new_key.to_string();
                Ok(())
            }
            None => Err(not_found(entity)),
        }
    }

    /// Reconciliation key of an entity
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the entity does not exist.
    pub fn key_of(&self, entity: &EntityRef) -> Result<&str> {
        let key = match entity.kind {
            EntityKind::Node => self.nodes.get(&entity.id).map(|e| e.key.as_str()),
            EntityKind::Page => self.pages.get(&entity.id).map(|e| e.key.as_str()),
            EntityKind::Folder => self.folders.get(&entity.id).map(|e| e.key.as_str()),
            EntityKind::File => self.files.get(&entity.id).map(|e| e.key.as_str()),
            EntityKind::SchemaType => self.types.get(&entity.id).map(|e| e.key.as_str()),
            EntityKind::Record => self.records.get(&entity.id).map(|e| e.key.as_str()),
            EntityKind::MailTemplate => self.mail_templates.get(&entity.id).map(|e| e.key.as_str()),
            EntityKind::Localization => self.localizations.get(&entity.id).map(|e| e.key.as_str()),
            EntityKind::Principal => self.principals.get(&entity.id).map(|e| e.key.as_str()),
        };
        key.ok_or_else(|| not_found(entity))
    }

    // ===== Access control =====

    /// Access-control block of a securable entity
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` for kinds without access control and a
    /// not-found error for missing entities.
    pub fn access(&self, entity: &EntityRef) -> Result<&AccessControl> {
        let acl = match entity.kind {
            EntityKind::Node => self.nodes.get(&entity.id).map(|e| &e.access),
            EntityKind::Page => self.pages.get(&entity.id).map(|e| &e.access),
            EntityKind::Folder => self.folders.get(&entity.id).map(|e| &e.access),
            EntityKind::File => self.files.get(&entity.id).map(|e| &e.access),
            EntityKind::Record => self.records.get(&entity.id).map(|e| &e.access),
            _ => return Err(not_securable(entity)),
        };
        acl.ok_or_else(|| not_found(entity))
    }

    /// Mutable access-control block of a securable entity
    ///
    /// # Errors
    ///
    /// Same as [`Store::access`].
    pub fn access_mut(&mut self, entity: &EntityRef) -> Result<&mut AccessControl> {
        let acl = match entity.kind {
            EntityKind::Node => self.nodes.get_mut(&entity.id).map(|e| &mut e.access),
            EntityKind::Page => self.pages.get_mut(&entity.id).map(|e| &mut e.access),
            EntityKind::Folder => self.folders.get_mut(&entity.id).map(|e| &mut e.access),
            EntityKind::File => self.files.get_mut(&entity.id).map(|e| &mut e.access),
            EntityKind::Record => self.records.get_mut(&entity.id).map(|e| &mut e.access),
            _ => return Err(not_securable(entity)),
        };
        acl.ok_or_else(|| not_found(entity))
    }

    /// Every securable entity, sorted for deterministic iteration
    pub fn securables(&self) -> Vec<EntityRef> {
        let mut out: Vec<EntityRef> = self
            .nodes
            .keys()
            .map(EntityRef::node)
            .chain(self.pages.keys().map(EntityRef::page))
            .chain(self.folders.keys().map(EntityRef::folder))
            .chain(self.files.keys().map(EntityRef::file))
            .chain(self.records.keys().map(EntityRef::record))
            .collect();
        out.sort();
        out
    }

    // ===== Pages =====

    /// # Errors
    ///
    /// Returns `PageNotFound` if no page has this id.
    pub fn get_page(&self, id: &str) -> Result<&Page> {
        self.pages.get(id).ok_or_else(|| StrataError::PageNotFound {
            page_id: id.to_string(),
        })
    }

    /// # Errors
    ///
    /// Returns `PageNotFound` if no page has this id.
    pub fn get_page_mut(&mut self, id: &str) -> Result<&mut Page> {
        self.pages
            .get_mut(id)
            .ok_or_else(|| StrataError::PageNotFound {
                page_id: id.to_string(),
            })
    }

    pub fn page_by_name(&self, name: &str) -> Option<&Page> {
        self.pages.values().find(|p| p.name == name)
    }

    /// Pages sorted by `(position, name, key)`
    pub fn list_pages(&self) -> Vec<&Page> {
        let mut pages: Vec<&Page> = self.pages.values().collect();
        pages.sort_by(|a, b| {
            (a.position, &a.name, &a.key).cmp(&(b.position, &b.name, &b.key))
        });
        pages
    }

    /// # Errors
    ///
    /// Returns `DuplicateKey` if the page's key is already bound.
    pub fn insert_page(&mut self, page: Page) -> Result<()> {
        self.claim_key(&page.key, EntityRef::page(&page.id))?;
        self.pages.insert(page.id.clone(), page);
        Ok(())
    }

    pub(crate) fn remove_page_entry(&mut self, id: &str) -> Option<Page> {
        let page = self.pages.remove(id)?;
        self.key_index.remove(&page.key);
        Some(page)
    }

    // ===== Content nodes =====

    /// # Errors
    ///
    /// Returns `NodeNotFound` if no node has this id.
    pub fn get_node(&self, id: &str) -> Result<&ContentNode> {
        self.nodes.get(id).ok_or_else(|| StrataError::NodeNotFound {
            node_id: id.to_string(),
        })
    }

    /// # Errors
    ///
    /// Returns `NodeNotFound` if no node has this id.
    pub fn get_node_mut(&mut self, id: &str) -> Result<&mut ContentNode> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| StrataError::NodeNotFound {
                node_id: id.to_string(),
            })
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// All nodes, sorted by id
    pub fn list_nodes(&self) -> Vec<&ContentNode> {
        let mut nodes: Vec<&ContentNode> = self.nodes.values().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        nodes
    }

    /// # Errors
    ///
    /// Returns `DuplicateKey` if the node's key is already bound.
    pub fn insert_node(&mut self, node: ContentNode) -> Result<()> {
        self.claim_key(&node.key, EntityRef::node(&node.id))?;
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    pub(crate) fn remove_node_entry(&mut self, id: &str) -> Option<ContentNode> {
        let node = self.nodes.remove(id)?;
        self.key_index.remove(&node.key);
        Some(node)
    }

    // ===== Shadow container =====

    /// Shared component root ids in shadow order
    pub fn shadow_components(&self) -> &[String] {
        &self.shadow
    }

    pub fn is_shared_component(&self, node_id: &str) -> bool {
        self.shadow.iter().any(|id| id == node_id)
    }

    /// Register an existing node as a shadow root
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` for unknown nodes and `InvalidOperation` for
    /// nodes that still have a parent.
    pub fn add_to_shadow(&mut self, node_id: &str) -> Result<()> {
        let node = self.get_node_mut(node_id)?;
        if node.parent.is_some() {
            return Err(StrataError::InvalidOperation {
                reason: format!("node {} is attached and cannot be shared", node_id),
            });
        }
        node.shared = true;
        if !self.shadow.iter().any(|id| id == node_id) {
            self.shadow.push(node_id.to_string());
        }
        Ok(())
    }

    pub(crate) fn remove_from_shadow(&mut self, node_id: &str) {
        self.shadow.retain(|id| id != node_id);
    }

    // ===== Files and folders =====

    /// # Errors
    ///
    /// Returns `FolderNotFound` if no folder has this id.
    pub fn get_folder(&self, id: &str) -> Result<&Folder> {
        self.folders
            .get(id)
            .ok_or_else(|| StrataError::FolderNotFound {
                folder_id: id.to_string(),
            })
    }

    /// # Errors
    ///
    /// Returns `FolderNotFound` if no folder has this id.
    pub fn get_folder_mut(&mut self, id: &str) -> Result<&mut Folder> {
        self.folders
            .get_mut(id)
            .ok_or_else(|| StrataError::FolderNotFound {
                folder_id: id.to_string(),
            })
    }

    pub fn list_folders(&self) -> Vec<&Folder> {
        let mut folders: Vec<&Folder> = self.folders.values().collect();
        folders.sort_by(|a, b| (&a.name, &a.key).cmp(&(&b.name, &b.key)));
        folders
    }

    /// # Errors
    ///
    /// Returns `DuplicateKey` if the folder's key is already bound.
    pub fn insert_folder(&mut self, folder: Folder) -> Result<()> {
        self.claim_key(&folder.key, EntityRef::folder(&folder.id))?;
        self.folders.insert(folder.id.clone(), folder);
        Ok(())
    }

    pub(crate) fn remove_folder_entry(&mut self, id: &str) -> Option<Folder> {
        let folder = self.folders.remove(id)?;
        self.key_index.remove(&folder.key);
        Some(folder)
    }

    /// # Errors
    ///
    /// Returns `FileNotFound` if no file has this id.
    pub fn get_file(&self, id: &str) -> Result<&File> {
        self.files.get(id).ok_or_else(|| StrataError::FileNotFound {
            file_id: id.to_string(),
        })
    }

    /// # Errors
    ///
    /// Returns `FileNotFound` if no file has this id.
    pub fn get_file_mut(&mut self, id: &str) -> Result<&mut File> {
        self.files
            .get_mut(id)
            .ok_or_else(|| StrataError::FileNotFound {
                file_id: id.to_string(),
            })
    }

    pub fn list_files(&self) -> Vec<&File> {
        let mut files: Vec<&File> = self.files.values().collect();
        files.sort_by(|a, b| (&a.name, &a.key).cmp(&(&b.name, &b.key)));
        files
    }

    /// # Errors
    ///
    /// Returns `DuplicateKey` if the file's key is already bound.
    pub fn insert_file(&mut self, file: File) -> Result<()> {
        self.claim_key(&file.key, EntityRef::file(&file.id))?;
        self.files.insert(file.id.clone(), file);
        Ok(())
    }

    pub(crate) fn remove_file_entry(&mut self, id: &str) -> Option<File> {
        let file = self.files.remove(id)?;
        self.key_index.remove(&file.key);
        Some(file)
    }

    // ===== Principals =====

    /// # Errors
    ///
    /// Returns `PrincipalNotFound` if no principal has this id.
    pub fn get_principal(&self, id: &str) -> Result<&Principal> {
        self.principals
            .get(id)
            .ok_or_else(|| StrataError::PrincipalNotFound {
                principal: id.to_string(),
            })
    }

    /// # Errors
    ///
    /// Returns `PrincipalNotFound` if no principal has this id.
    pub fn get_principal_mut(&mut self, id: &str) -> Result<&mut Principal> {
        self.principals
            .get_mut(id)
            .ok_or_else(|| StrataError::PrincipalNotFound {
                principal: id.to_string(),
            })
    }

    pub fn principal_by_name(&self, name: &str) -> Option<&Principal> {
        self.principals.values().find(|p| p.name == name)
    }

    pub fn list_principals(&self) -> Vec<&Principal> {
        let mut principals: Vec<&Principal> = self.principals.values().collect();
        principals.sort_by(|a, b| a.name.cmp(&b.name));
        principals
    }

    /// # Errors
    ///
    /// Returns `DuplicateKey` if the principal's key is already bound.
    pub fn insert_principal(&mut self, principal: Principal) -> Result<()> {
        self.claim_key(
            &principal.key,
            EntityRef::new(EntityKind::Principal, &principal.id),
        )?;
        self.principals.insert(principal.id.clone(), principal);
        Ok(())
    }

    // ===== Schema types =====

    /// # Errors
    ///
    /// Returns `TypeNotFound` if no type has this id.
    pub fn get_type(&self, id: &str) -> Result<&SchemaType> {
        self.types.get(id).ok_or_else(|| StrataError::TypeNotFound {
            type_name: id.to_string(),
        })
    }

    /// # Errors
    ///
    /// Returns `TypeNotFound` if no type has this id.
    pub fn get_type_mut(&mut self, id: &str) -> Result<&mut SchemaType> {
        self.types
            .get_mut(id)
            .ok_or_else(|| StrataError::TypeNotFound {
                type_name: id.to_string(),
            })
    }

    pub fn type_by_name(&self, name: &str) -> Option<&SchemaType> {
        self.types.values().find(|t| t.name == name)
    }

    /// # Errors
    ///
    /// Returns `TypeNotFound` if no type has this name.
    pub fn require_type(&self, name: &str) -> Result<&SchemaType> {
        self.type_by_name(name)
            .ok_or_else(|| StrataError::TypeNotFound {
                type_name: name.to_string(),
            })
    }

    /// Schema types sorted by name
    pub fn list_types(&self) -> Vec<&SchemaType> {
        let mut types: Vec<&SchemaType> = self.types.values().collect();
        types.sort_by(|a, b| a.name.cmp(&b.name));
        types
    }

    /// # Errors
    ///
    /// Returns `DuplicateKey` if the type's key is already bound.
    pub fn insert_type(&mut self, schema_type: SchemaType) -> Result<()> {
        self.claim_key(&schema_type.key, EntityRef::schema_type(&schema_type.id))?;
        self.types.insert(schema_type.id.clone(), schema_type);
        Ok(())
    }

    pub(crate) fn remove_type_entry(&mut self, id: &str) -> Option<SchemaType> {
        let t = self.types.remove(id)?;
        self.key_index.remove(&t.key);
        Some(t)
    }

    // ===== Records =====

    /// # Errors
    ///
    /// Returns `RecordNotFound` if no record has this id.
    pub fn get_record(&self, id: &str) -> Result<&Record> {
        self.records
            .get(id)
            .ok_or_else(|| StrataError::RecordNotFound {
                record_id: id.to_string(),
            })
    }

    /// # Errors
    ///
    /// Returns `RecordNotFound` if no record has this id.
    pub fn get_record_mut(&mut self, id: &str) -> Result<&mut Record> {
        self.records
            .get_mut(id)
            .ok_or_else(|| StrataError::RecordNotFound {
                record_id: id.to_string(),
            })
    }

    pub fn list_records(&self) -> Vec<&Record> {
        let mut records: Vec<&Record> = self.records.values().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    /// # Errors
    ///
    /// Returns `DuplicateKey` if the record's key is already bound.
    pub fn insert_record(&mut self, record: Record) -> Result<()> {
        self.claim_key(&record.key, EntityRef::record(&record.id))?;
        self.records.insert(record.id.clone(), record);
        Ok(())
    }

    // ===== Auxiliary artifacts =====

    pub fn get_mail_template(&self, id: &str) -> Option<&MailTemplate> {
        self.mail_templates.get(id)
    }

    pub fn get_mail_template_mut(&mut self, id: &str) -> Option<&mut MailTemplate> {
        self.mail_templates.get_mut(id)
    }

    /// Mail templates sorted by `(name, locale)`
    pub fn list_mail_templates(&self) -> Vec<&MailTemplate> {
        let mut out: Vec<&MailTemplate> = self.mail_templates.values().collect();
        out.sort_by(|a, b| (&a.name, &a.locale, &a.key).cmp(&(&b.name, &b.locale, &b.key)));
        out
    }

    /// # Errors
    ///
    /// Returns `DuplicateKey` if the template's key is already bound.
    pub fn insert_mail_template(&mut self, template: MailTemplate) -> Result<()> {
        self.claim_key(
            &template.key,
            EntityRef::new(EntityKind::MailTemplate, &template.id),
        )?;
        self.mail_templates.insert(template.id.clone(), template);
        Ok(())
    }

    pub fn remove_mail_template(&mut self, id: &str) -> Option<MailTemplate> {
        let t = self.mail_templates.remove(id)?;
        self.key_index.remove(&t.key);
        Some(t)
    }

    pub fn get_localization(&self, id: &str) -> Option<&Localization> {
        self.localizations.get(id)
    }

    pub fn get_localization_mut(&mut self, id: &str) -> Option<&mut Localization> {
        self.localizations.get_mut(id)
    }

    /// Localizations sorted by `(name, domain, locale)`
    pub fn list_localizations(&self) -> Vec<&Localization> {
        let mut out: Vec<&Localization> = self.localizations.values().collect();
        out.sort_by(|a, b| {
            (&a.name, &a.domain, &a.locale, &a.key).cmp(&(&b.name, &b.domain, &b.locale, &b.key))
        });
        out
    }

    /// # Errors
    ///
    /// Returns `DuplicateKey` if the localization's key is already bound.
    pub fn insert_localization(&mut self, localization: Localization) -> Result<()> {
        self.claim_key(
            &localization.key,
            EntityRef::new(EntityKind::Localization, &localization.id),
        )?;
        self.localizations
            .insert(localization.id.clone(), localization);
        Ok(())
    }

    pub fn remove_localization(&mut self, id: &str) -> Option<Localization> {
        let l = self.localizations.remove(id)?;
        self.key_index.remove(&l.key);
        Some(l)
    }
}

fn not_found(entity: &EntityRef) -> StrataError {
    StrataError::EntityNotFound {
        kind: entity.kind.to_string(),
        id: entity.id.clone(),
    }
}

fn not_securable(entity: &EntityRef) -> StrataError {
    StrataError::InvalidOperation {
        reason: format!("{} entities carry no access control", entity.kind),
    }
}

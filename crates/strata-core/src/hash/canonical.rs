use std::collections::BTreeMap;

use serde_json::Value;

use super::digest::hash_bytes;
use crate::errors::{ExError, Result, StrataError};
use crate::model::{AccessControl, ContentNode, EntityKind, EntityRef, NodeKind, Subject};
use crate::ops::file_ops::{file_path, folder_path, is_file_included, is_folder_included};
use crate::ops::principal_ops::subject_name;
use crate::ops::Store;

/// Non-default fields of one line, emitted in alphabetical key order
type Fields = BTreeMap<&'static str, Value>;

const UNKNOWN_PRINCIPAL: &str = "<unknown>";

struct CanonicalWriter<'a> {
    store: &'a Store,
    out: String,
    /// Component ids currently being expanded
    expansion_path: Vec<String>,
}

impl<'a> CanonicalWriter<'a> {
    fn new(store: &'a Store) -> Self {
        Self {
            store,
            out: String::new(),
            expansion_path: Vec::new(),
        }
    }

    fn line(&mut self, depth: usize, label: &str, fields: &Fields) {
        for _ in 0..depth {
            self.out.push_str("  ");
        }
        self.out.push_str(label);
        if !fields.is_empty() {
            self.out.push(' ');
            // BTreeMap of scalars and arrays: serialization cannot fail
            self.out
                .push_str(&serde_json::to_string(fields).unwrap_or_default());
        }
        self.out.push('\n');
    }

    fn access_fields(&self, acl: &AccessControl, fields: &mut Fields) {
        if acl.visibility.public || acl.visibility.authenticated {
            fields.insert(
                "visibility",
                Value::Array(vec![
                    Value::Bool(acl.visibility.public),
                    Value::Bool(acl.visibility.authenticated),
                ]),
            );
        }
        if let Some(owner) = &acl.owner {
            fields.insert("owner", Value::String(self.name_of(owner)));
        }
        if !acl.grants.is_empty() {
            fields.insert("grants", self.grants_value(acl.grants.iter()));
        }
    }

    fn name_of(&self, subject: &Subject) -> String {
        subject_name(self.store, subject)
            .unwrap_or(UNKNOWN_PRINCIPAL)
            .to_string()
    }

    fn grants_value<'g>(&self, grants: impl Iterator<Item = &'g crate::model::Grant>) -> Value {
        let mut pairs: Vec<(String, u8)> = grants
            .map(|g| (self.name_of(&g.subject), g.permissions.bits()))
            .collect();
        pairs.sort();
        Value::Array(
            pairs
                .into_iter()
                .map(|(name, bits)| Value::Array(vec![Value::String(name), Value::from(bits)]))
                .collect(),
        )
    }

    fn node(&mut self, depth: usize, node_id: &str) -> Result<()> {
        let node = self.store.get_node(node_id)?;
        let fields = self.node_fields(node);
        self.line(depth, &format!("<{}>", node.kind.discriminator()), &fields);

        if let Some(component) = node.placement_target() {
            return self.expand_component(depth + 1, component);
        }
        for child in &node.children {
            self.node(depth + 1, child)?;
        }
        Ok(())
    }

    fn expand_component(&mut self, depth: usize, component_id: &str) -> Result<()> {
        if self.expansion_path.iter().any(|id| id == component_id) {
            let mut fields = Fields::new();
            let root = self.store.get_node(component_id)?;
            if let Some(name) = &root.name {
                fields.insert("component", Value::String(name.clone()));
            }
            self.line(depth, "<#cycle>", &fields);
            return Ok(());
        }
        self.expansion_path.push(component_id.to_string());
        let result = self.node(depth, component_id);
        self.expansion_path.pop();
        result
    }

    fn node_fields(&self, node: &ContentNode) -> Fields {
        let mut fields = Fields::new();
        match &node.kind {
            NodeKind::Text { text } | NodeKind::Comment { text } => {
                fields.insert("text", Value::String(text.clone()));
            }
            NodeKind::Template { content } => {
                fields.insert("content", Value::String(content.clone()));
            }
            NodeKind::Element { .. } | NodeKind::Placement { .. } => {}
        }
        if let Some(name) = &node.name {
            fields.insert("name", Value::String(name.clone()));
        }
        if let Some(t) = &node.custom_type {
            fields.insert("type", Value::String(t.clone()));
        }
        if !node.attributes.is_empty() {
            fields.insert(
                "attributes",
                Value::Array(
                    node.attributes
                        .iter()
                        .map(|(k, v)| {
                            Value::Array(vec![Value::String(k.clone()), Value::String(v.clone())])
                        })
                        .collect(),
                ),
            );
        }
        opt_str(&mut fields, "show", &node.show_condition);
        opt_str(&mut fields, "hide", &node.hide_condition);
        str_list(&mut fields, "show_locales", &node.show_for_locales);
        str_list(&mut fields, "hide_locales", &node.hide_for_locales);
        opt_str(&mut fields, "render_mode", &node.render_mode);
        if let Some(binding) = &node.binding {
            fields.insert(
                "binding",
                Value::Array(vec![
                    Value::String(binding.data_key.clone()),
                    binding
                        .query
                        .clone()
                        .map(Value::String)
                        .unwrap_or(Value::Null),
                ]),
            );
        }
        self.access_fields(&node.access, &mut fields);
        fields
    }

    fn page(&mut self, page_id: &str) -> Result<()> {
        let page = self.store.get_page(page_id)?;
        let mut fields = Fields::new();
        fields.insert("name", Value::String(page.name.clone()));
        opt_str(&mut fields, "type", &page.custom_type);
        opt_str(&mut fields, "content_type", &page.content_type);
        if let Some(secs) = page.cache_for_seconds {
            fields.insert("cache_for_seconds", Value::from(secs));
        }
        if page.dont_cache {
            fields.insert("dont_cache", Value::Bool(true));
        }
        if !page.show_on_error_codes.is_empty() {
            fields.insert(
                "error_codes",
                Value::Array(page.show_on_error_codes.iter().map(|c| Value::from(*c)).collect()),
            );
        }
        if !page.path_templates.is_empty() {
            fields.insert(
                "paths",
                Value::Array(
                    page.path_templates
                        .iter()
                        .map(|t| {
                            let mut parts = vec![Value::String(t.path.clone())];
                            for p in &t.parameters {
                                parts.push(Value::Array(vec![
                                    Value::String(p.name.clone()),
                                    p.default_value.clone().map(Value::String).unwrap_or(Value::Null),
                                ]));
                            }
                            Value::Array(parts)
                        })
                        .collect(),
                ),
            );
        }
        if page.position != 0 {
            fields.insert("position", Value::from(page.position));
        }
        self.access_fields(&page.access, &mut fields);
        self.line(0, "page", &fields);
        for child in &page.children {
            self.node(1, child)?;
        }
        Ok(())
    }

    fn component(&mut self, component_id: &str) -> Result<()> {
        self.line(0, "component", &Fields::new());
        self.expand_component(1, component_id)
    }

    fn folder(&mut self, depth: usize, folder_id: &str) -> Result<()> {
        let folder = self.store.get_folder(folder_id)?;
        let mut fields = Fields::new();
        fields.insert("name", Value::String(folder.name.clone()));
        if folder.parent_id.is_none() && folder.include_in_export {
            fields.insert("included", Value::Bool(true));
        }
        opt_str(&mut fields, "type", &folder.custom_type);
        self.access_fields(&folder.access, &mut fields);
        self.line(depth, "folder", &fields);

        let mut subfolders: Vec<(&str, &str)> = self
            .store
            .folders
            .values()
            .filter(|f| f.parent_id.as_deref() == Some(folder_id))
            .map(|f| (f.name.as_str(), f.id.as_str()))
            .collect();
        subfolders.sort();
        let mut files: Vec<(&str, &str)> = self
            .store
            .files
            .values()
            .filter(|f| f.parent_id.as_deref() == Some(folder_id))
            .map(|f| (f.name.as_str(), f.id.as_str()))
            .collect();
        files.sort();

        for (_, id) in subfolders {
            self.folder(depth + 1, id)?;
        }
        for (_, id) in files {
            self.file(depth + 1, id)?;
        }
        Ok(())
    }

    fn file(&mut self, depth: usize, file_id: &str) -> Result<()> {
        let file = self.store.get_file(file_id)?;
        let mut fields = Fields::new();
        fields.insert("name", Value::String(file.name.clone()));
        if file.parent_id.is_none() && file.include_in_export {
            fields.insert("included", Value::Bool(true));
        }
        opt_str(&mut fields, "type", &file.custom_type);
        opt_str(&mut fields, "content_type", &file.content_type);
        fields.insert("sha256", Value::String(hash_bytes(&file.content)));
        self.access_fields(&file.access, &mut fields);
        self.line(depth, "file", &fields);
        Ok(())
    }

    fn schema_type(&mut self, type_id: &str) -> Result<()> {
        let t = self.store.get_type(type_id)?;
        let mut fields = Fields::new();
        fields.insert("name", Value::String(t.name.clone()));
        str_list(&mut fields, "bases", &t.bases);
        if !t.grants.is_empty() {
            fields.insert("grants", self.grants_value(t.grants.iter()));
        }
        self.line(0, "type", &fields);

        for p in &t.properties {
            let mut f = Fields::new();
            f.insert("name", Value::String(p.name.clone()));
            f.insert("type", Value::String(p.property_type.clone()));
            opt_str(&mut f, "default", &p.default_value);
            opt_str(&mut f, "format", &p.format);
            if p.not_null {
                f.insert("not_null", Value::Bool(true));
            }
            if p.unique {
                f.insert("unique", Value::Bool(true));
            }
            self.line(1, "property", &f);
        }
        for m in &t.methods {
            let mut f = Fields::new();
            f.insert("name", Value::String(m.name.clone()));
            f.insert("source", Value::String(m.source.clone()));
            if m.is_static {
                f.insert("static", Value::Bool(true));
            }
            self.line(1, "method", &f);
        }
        for v in &t.views {
            let mut f = Fields::new();
            f.insert("name", Value::String(v.name.clone()));
            str_list(&mut f, "members", &v.members);
            if let Some(order) = &v.order {
                f.insert(
                    "order",
                    Value::Array(order.iter().cloned().map(Value::String).collect()),
                );
            }
            self.line(1, "view", &f);
        }
        Ok(())
    }

    fn mail_template(&mut self, id: &str) -> Result<()> {
        let t = self
            .store
            .get_mail_template(id)
            .ok_or_else(|| not_found(EntityKind::MailTemplate, id))?;
        let mut f = Fields::new();
        f.insert("name", Value::String(t.name.clone()));
        f.insert("locale", Value::String(t.locale.clone()));
        f.insert("text", Value::String(t.text.clone()));
        self.line(0, "mail_template", &f);
        Ok(())
    }

    fn localization(&mut self, id: &str) -> Result<()> {
        let l = self
            .store
            .get_localization(id)
            .ok_or_else(|| not_found(EntityKind::Localization, id))?;
        let mut f = Fields::new();
        f.insert("name", Value::String(l.name.clone()));
        opt_str(&mut f, "domain", &l.domain);
        f.insert("locale", Value::String(l.locale.clone()));
        f.insert("text", Value::String(l.text.clone()));
        self.line(0, "localization", &f);
        Ok(())
    }

    fn entity(&mut self, root: &EntityRef) -> Result<()> {
        match root.kind {
            EntityKind::Page => self.page(&root.id),
            EntityKind::Node if self.store.is_shared_component(&root.id) => self.component(&root.id),
            EntityKind::Node => self.node(0, &root.id),
            EntityKind::Folder => self.folder(0, &root.id),
            EntityKind::File => self.file(0, &root.id),
            EntityKind::SchemaType => self.schema_type(&root.id),
            EntityKind::MailTemplate => self.mail_template(&root.id),
            EntityKind::Localization => self.localization(&root.id),
            EntityKind::Record | EntityKind::Principal => Err(StrataError::InvalidOperation {
                reason: format!("{} entities are not deployable", root.kind),
            }),
        }
    }
}

fn opt_str(fields: &mut Fields, key: &'static str, value: &Option<String>) {
    if let Some(v) = value {
        fields.insert(key, Value::String(v.clone()));
    }
}

fn str_list(fields: &mut Fields, key: &'static str, values: &[String]) {
    if !values.is_empty() {
        fields.insert(
            key,
            Value::Array(values.iter().cloned().map(Value::String).collect()),
        );
    }
}

fn error_marker(store: &Store, root: &EntityRef, err: StrataError) -> String {
    format!(
        "!error {} {} {}\n",
        root.kind,
        store.key_of(root).unwrap_or("?"),
        ExError::from(err).code()
    )
}

fn not_found(kind: EntityKind, id: &str) -> StrataError {
    StrataError::EntityNotFound {
        kind: kind.to_string(),
        id: id.to_string(),
    }
}

/// Canonical string of a page, shared component, node, folder, file, schema
/// type or auxiliary artifact
///
/// # Errors
///
/// Returns lookup errors for missing entities and `InvalidOperation` for
/// records and principals.
pub fn canonical_string(store: &Store, root: &EntityRef) -> Result<String> {
    let mut writer = CanonicalWriter::new(store);
    writer.entity(root)?;
    Ok(writer.out)
}

/// Canonical string of the whole deployable state
///
/// Sections in fixed order; entries within a section sorted by their own
/// canonical string, so allocation order never leaks in. An entity that fails
/// to render contributes an error marker line naming its key and error code.
pub fn site_fingerprint(store: &Store) -> String {
    let mut out = String::new();

    let mut section = |title: &str, roots: Vec<EntityRef>| {
        let mut entries: Vec<String> = roots
            .iter()
            .map(|r| {
                canonical_string(store, r).unwrap_or_else(|err| error_marker(store, r, err))
            })
            .collect();
        entries.sort();
        out.push_str("# ");
        out.push_str(title);
        out.push('\n');
        for e in entries {
            out.push_str(&e);
        }
    };

    section(
        "pages",
        store.pages.keys().map(EntityRef::page).collect(),
    );
    section(
        "components",
        store.shadow.iter().map(EntityRef::node).collect(),
    );

    let mut file_roots: Vec<(String, EntityRef)> = Vec::new();
    for folder in store.folders.values().filter(|f| f.parent_id.is_none()) {
        if is_folder_included(store, &folder.id).unwrap_or(false) {
            let path = folder_path(store, &folder.id).unwrap_or_default();
            file_roots.push((path, EntityRef::folder(&folder.id)));
        }
    }
    for file in store.files.values().filter(|f| f.parent_id.is_none()) {
        if is_file_included(store, &file.id).unwrap_or(false) {
            let path = file_path(store, &file.id).unwrap_or_default();
            file_roots.push((path, EntityRef::file(&file.id)));
        }
    }
    file_roots.sort();
    section("files", file_roots.into_iter().map(|(_, r)| r).collect());

    section(
        "schema",
        store.types.keys().map(EntityRef::schema_type).collect(),
    );
    section(
        "mail-templates",
        store
            .mail_templates
            .keys()
            .map(|id| EntityRef::new(EntityKind::MailTemplate, id))
            .collect(),
    );
    section(
        "localizations",
        store
            .localizations
            .keys()
            .map(|id| EntityRef::new(EntityKind::Localization, id))
            .collect(),
    );

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ParentRef;
    use crate::ops::content_ops::{
        append_child, create_element, create_page, create_shared_component, create_text,
        place_component, set_attribute,
    };

    #[test]
    fn test_ids_and_keys_do_not_leak() {
        let mut store = Store::new();
        let page = create_page(&mut store, "index").unwrap();
        let div = create_element(&mut store, "div").unwrap();
        append_child(&mut store, &ParentRef::Page(page.clone()), &div).unwrap();

        let s = canonical_string(&store, &EntityRef::page(&page)).unwrap();
        assert!(!s.contains(&page));
        assert!(!s.contains(&div));
        assert!(!s.contains(&store.get_page(&page).unwrap().key));
        assert_eq!(s, "page {\"name\":\"index\"}\n  <div>\n");
    }

    #[test]
    fn test_attributes_sorted_and_order_sensitive() {
        let mut store = Store::new();
        let page = create_page(&mut store, "p").unwrap();
        let root = ParentRef::Page(page.clone());
        let a = create_text(&mut store, "a").unwrap();
        let b = create_element(&mut store, "b").unwrap();
        append_child(&mut store, &root, &a).unwrap();
        append_child(&mut store, &root, &b).unwrap();
        set_attribute(&mut store, &b, "z", Some("1")).unwrap();
        set_attribute(&mut store, &b, "a", Some("2")).unwrap();

        let before = canonical_string(&store, &EntityRef::page(&page)).unwrap();
        assert!(before.contains(r#"[["a","2"],["z","1"]]"#));

        crate::ops::content_ops::insert_child(&mut store, &root, 0, &b).unwrap();
        let after = canonical_string(&store, &EntityRef::page(&page)).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_component_cycle_emits_marker() {
        let mut store = Store::new();
        let a = create_shared_component(&mut store, "div", "A").unwrap();
        let b = create_shared_component(&mut store, "div", "B").unwrap();
        place_component(&mut store, &ParentRef::Node(a.clone()), &b).unwrap();
        place_component(&mut store, &ParentRef::Node(b.clone()), &a).unwrap();

        let s = canonical_string(&store, &EntityRef::node(&a)).unwrap();
        assert!(s.contains("<#cycle> {\"component\":\"A\"}"));
    }

    #[test]
    fn test_unrenderable_page_marks_the_fingerprint() {
        let mut store = Store::new();
        let page = create_page(&mut store, "index").unwrap();
        let div = create_element(&mut store, "div").unwrap();
        append_child(&mut store, &ParentRef::Page(page.clone()), &div).unwrap();
        let intact = site_fingerprint(&store);

        store.nodes.remove(&div);

        let key = store.get_page(&page).unwrap().key.clone();
        let broken = site_fingerprint(&store);
        assert_ne!(intact, broken);
        assert!(broken.contains(&format!("!error page {} ", key)));
        assert!(!broken.contains(&div));
    }
}

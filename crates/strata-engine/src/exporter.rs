//! Exporter: live store → export directory
//!
//! A pure read of the store. Entities that cannot be rendered are reported
//! as `UnreadableEntity` and left out; everything else is written in a
//! byte-stable form. Pages render in parallel on the configured pool.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use strata_core::errors::{ExError, ExErrorKind};
use strata_core::hash::hash_bytes;
use strata_core::model::{ContentNode, NodeKind, SchemaType};
use strata_core::ops::file_ops;
use strata_core::{log_op_end, log_op_error, log_op_start, Store};

use crate::config::DeployConfig;
use crate::errors::Result;
use crate::format::atomic_write;
use crate::format::layout::{self, FORMAT_VERSION};
use crate::format::manifest::{
    write_json, ComponentEntry, DeployManifest, FileEntry, FileEntryKind, LocalizationEntry,
    MailTemplateEntry, MethodDoc, PageEntry, PropertyDoc, SchemaDoc, ViewDoc,
};
use crate::format::markup::{write_document, BindingDoc, Directive, MarkupKind, MarkupNode};
use crate::principals::{acl_to_doc, grants_to_doc};
use crate::registry;
use crate::report::{DeployMode, DeployReport, Issue};

/// Rendered artifact waiting to be written
struct Artifact {
    path: PathBuf,
    bytes: Vec<u8>,
}

/// Export the deployable state of `store` into `dir`
///
/// Previous export artifacts in `dir` are removed first. Directory-level
/// failures end the run with a fatal entry in the report.
pub fn export(store: &Store, dir: &Path, config: &DeployConfig) -> DeployReport {
    let mut report = DeployReport::new(DeployMode::Export);
    log_op_start!("export", run_id = %report.run_id, path = %dir.display());
    let start = Instant::now();

    if let Err(err) = export_into(store, dir, config, &mut report) {
        log_op_error!(
            "export",
            err.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        report.fail("directory", &err);
    } else {
        log_op_end!(
            "export",
            duration_ms = start.elapsed().as_millis() as u64,
            issue_count = report.issues.len()
        );
    }
    report.finish();
    report
}

fn export_into(
    store: &Store,
    dir: &Path,
    config: &DeployConfig,
    report: &mut DeployReport,
) -> Result<()> {
    let pool = config.thread_pool()?;
    let mut artifacts = Vec::new();

    for cycle in registry::component_cycles(store) {
        let path = cycle.join(" -> ");
        strata_core::log_structural_note!("export_components", "component cycle", cycle = %path);
        report.note(Issue::new(
            ExErrorKind::CyclicShutdownGuard,
            "component",
            format!("component cycle {}", path),
        ));
    }

    let mut components = Vec::new();
    for id in store.shadow_components() {
        match render_component(store, id) {
            Ok((entry, doc)) => {
                artifacts.push(Artifact {
                    path: Path::new(layout::COMPONENTS_DIR).join(&entry.file),
                    bytes: doc.into_bytes(),
                });
                components.push(entry);
                report.tally("component").exported += 1;
            }
            Err(err) => report.issue(unreadable("component", store.get_node(id).ok(), &err)),
        }
    }
    components.sort_by(|a, b| (&a.name, &a.key).cmp(&(&b.name, &b.key)));

    let pages = store.list_pages();
    let rendered: Vec<Result<(PageEntry, String)>> = pool.install(|| {
        pages
            .par_iter()
            .map(|page| render_page(store, &page.id))
            .collect()
    });
    let mut page_entries = Vec::new();
    for (page, result) in pages.iter().zip(rendered) {
        match result {
            Ok((entry, doc)) => {
                artifacts.push(Artifact {
                    path: Path::new(layout::PAGES_DIR).join(&entry.file),
                    bytes: doc.into_bytes(),
                });
                page_entries.push(entry);
                report.tally("page").exported += 1;
            }
            Err(err) => report.issue(
                Issue::from_error("page", &err)
                    .with_kind(ExErrorKind::UnreadableEntity)
                    .with_key(page.key.clone())
                    .with_name(page.name.clone()),
            ),
        }
    }
    page_entries.sort_by(|a, b| (&a.name, &a.key).cmp(&(&b.name, &b.key)));

    let files = if config.export.files {
        Some(collect_files(store, report, &mut artifacts))
    } else {
        None
    };

    let mut schema = Vec::new();
    if config.export.schema {
        for t in store.list_types() {
            let doc = schema_doc(store, t);
            schema.push((layout::schema_file_name(&t.name), doc));
            report.tally("schema_type").exported += 1;
        }
    }

    let mail_templates = config.export.mail_templates.then(|| {
        let mut entries: Vec<MailTemplateEntry> = store
            .list_mail_templates()
            .into_iter()
            .map(|t| MailTemplateEntry {
                key: t.key.clone(),
                name: t.name.clone(),
                locale: t.locale.clone(),
                text: t.text.clone(),
            })
            .collect();
        entries.sort_by(|a, b| (&a.name, &a.locale, &a.key).cmp(&(&b.name, &b.locale, &b.key)));
        report.tally("mail_template").exported += entries.len();
        entries
    });

    let localizations = config.export.localizations.then(|| {
        let mut entries: Vec<LocalizationEntry> = store
            .list_localizations()
            .into_iter()
            .map(|l| LocalizationEntry {
                key: l.key.clone(),
                name: l.name.clone(),
                domain: l.domain.clone(),
                locale: l.locale.clone(),
                text: l.text.clone(),
            })
            .collect();
        entries.sort_by(|a, b| {
            (&a.name, &a.domain, &a.locale, &a.key).cmp(&(&b.name, &b.domain, &b.locale, &b.key))
        });
        report.tally("localization").exported += entries.len();
        entries
    });

    // Nothing touches the directory until every artifact is rendered.
    std::fs::create_dir_all(dir).map_err(|e| crate::errors::io_error("export", dir, e))?;
    layout::clear_artifacts(dir)?;

    for artifact in &artifacts {
        atomic_write(&dir.join(&artifact.path), &artifact.bytes)?;
    }
    write_json(&dir.join(layout::PAGES_FILE), &page_entries)?;
    write_json(&dir.join(layout::COMPONENTS_FILE), &components)?;
    if let Some(files) = &files {
        write_json(&dir.join(layout::FILES_FILE), files)?;
    }
    for (file_name, doc) in &schema {
        write_json(&dir.join(layout::SCHEMA_DIR).join(file_name), doc)?;
    }
    if let Some(entries) = &mail_templates {
        write_json(&dir.join(layout::MAIL_TEMPLATES_FILE), entries)?;
    }
    if let Some(entries) = &localizations {
        write_json(&dir.join(layout::LOCALIZATIONS_FILE), entries)?;
    }
    // Written last: an interrupted export is not a valid import source.
    write_json(
        &dir.join(layout::DEPLOY_FILE),
        &DeployManifest {
            format: FORMAT_VERSION,
        },
    )?;

    Ok(())
}

fn unreadable(entity: &str, node: Option<&ContentNode>, err: &ExError) -> Issue {
    let mut issue = Issue::from_error(entity, err).with_kind(ExErrorKind::UnreadableEntity);
    if let Some(node) = node {
        issue = issue.with_key(node.key.clone());
        if let Some(name) = &node.name {
            issue = issue.with_name(name.clone());
        }
    }
    issue
}

/// Directive carrying the deployment attributes of a node
pub fn node_directive(store: &Store, node: &ContentNode) -> Directive {
    Directive {
        key: node.key.clone(),
        name: node.name.clone(),
        custom_type: node.custom_type.clone(),
        acl: acl_to_doc(store, &node.access),
        show: node.show_condition.clone(),
        hide: node.hide_condition.clone(),
        show_locales: node.show_for_locales.clone(),
        hide_locales: node.hide_for_locales.clone(),
        render_mode: node.render_mode.clone(),
        binding: node.binding.as_ref().map(|b| BindingDoc {
            data_key: b.data_key.clone(),
            query: b.query.clone(),
        }),
        content: match &node.kind {
            NodeKind::Template { content } => Some(content.clone()),
            _ => None,
        },
    }
}

/// Markup tree of a node and its descendants
///
/// Placements become references to their component's key; the component
/// itself is not expanded.
///
/// # Errors
/// Returns `NotFound` for missing children and `StructuralMismatch` for a
/// placement whose target is not a shared component.
pub fn node_markup(store: &Store, node_id: &str) -> Result<MarkupNode> {
    let node = store.get_node(node_id)?;
    let directive = node_directive(store, node);
    let kind = match &node.kind {
        NodeKind::Element { tag } => MarkupKind::Element {
            tag: tag.clone(),
            attributes: node.attributes.clone(),
            children: node
                .children
                .iter()
                .map(|child| node_markup(store, child))
                .collect::<Result<Vec<_>>>()?,
        },
        NodeKind::Text { text } => MarkupKind::Text(text.clone()),
        NodeKind::Comment { text } => MarkupKind::Comment(text.clone()),
        NodeKind::Template { .. } => MarkupKind::Template,
        NodeKind::Placement { component } => {
            if !store.is_shared_component(component) {
                return Err(ExError::new(ExErrorKind::StructuralMismatch)
                    .with_entity_id(node_id)
                    .with_message(format!("placement points at missing component {}", component)));
            }
            MarkupKind::Placement {
                src: store.get_node(component)?.key.clone(),
            }
        }
    };
    Ok(MarkupNode { directive, kind })
}

fn render_component(store: &Store, component_id: &str) -> Result<(ComponentEntry, String)> {
    let root = store.get_node(component_id)?;
    let doc = write_document(&[node_markup(store, component_id)?])?;
    let entry = ComponentEntry {
        key: root.key.clone(),
        name: root.name.clone(),
        file: layout::component_file_name(root.name.as_deref(), &root.key),
    };
    Ok((entry, doc))
}

/// Page metadata entry plus its markup document
///
/// # Errors
/// Returns the first error met while rendering the page's nodes.
pub fn render_page(store: &Store, page_id: &str) -> Result<(PageEntry, String)> {
    let page = store.get_page(page_id)?;
    let nodes = page
        .children
        .iter()
        .map(|child| node_markup(store, child))
        .collect::<Result<Vec<_>>>()?;
    let doc = write_document(&nodes)?;

    let entry = PageEntry {
        key: page.key.clone(),
        name: page.name.clone(),
        file: layout::page_file_name(&page.name, &page.key),
        custom_type: page.custom_type.clone(),
        content_type: page.content_type.clone(),
        cache_for_seconds: page.cache_for_seconds,
        dont_cache: page.dont_cache,
        error_codes: page.show_on_error_codes.clone(),
        paths: page.path_templates.iter().map(|t| t.template()).collect(),
        position: page.position,
        acl: acl_to_doc(store, &page.access),
    };
    Ok((entry, doc))
}

/// Entries for every folder and file under an included root
fn collect_files(
    store: &Store,
    report: &mut DeployReport,
    artifacts: &mut Vec<Artifact>,
) -> Vec<FileEntry> {
    let mut entries = Vec::new();

    for folder in store.list_folders() {
        let included = file_ops::is_folder_included(store, &folder.id).unwrap_or(false);
        if !included {
            continue;
        }
        match file_ops::folder_path(store, &folder.id) {
            Ok(path) if layout::is_safe_relative_path(&path) => {
                entries.push(FileEntry {
                    kind: FileEntryKind::Folder,
                    path,
                    key: folder.key.clone(),
                    included: folder.parent_id.is_none() && folder.include_in_export,
                    custom_type: folder.custom_type.clone(),
                    content_type: None,
                    sha256: None,
                    acl: acl_to_doc(store, &folder.access),
                });
                report.tally("folder").exported += 1;
            }
            Ok(path) => report.issue(
                Issue::new(
                    ExErrorKind::UnreadableEntity,
                    "folder",
                    format!("path '{}' cannot be written to disk", path),
                )
                .with_key(folder.key.clone()),
            ),
            Err(err) => report.issue(
                Issue::from_error("folder", &err.into())
                    .with_kind(ExErrorKind::UnreadableEntity)
                    .with_key(folder.key.clone()),
            ),
        }
    }

    for file in store.list_files() {
        let included = file_ops::is_file_included(store, &file.id).unwrap_or(false);
        if !included {
            continue;
        }
        match file_ops::file_path(store, &file.id) {
            Ok(path) if layout::is_safe_relative_path(&path) => {
                artifacts.push(Artifact {
                    path: Path::new(layout::FILES_DIR).join(&path),
                    bytes: file.content.clone(),
                });
                entries.push(FileEntry {
                    kind: FileEntryKind::File,
                    path,
                    key: file.key.clone(),
                    included: file.parent_id.is_none() && file.include_in_export,
                    custom_type: file.custom_type.clone(),
                    content_type: file.content_type.clone(),
                    sha256: Some(hash_bytes(&file.content)),
                    acl: acl_to_doc(store, &file.access),
                });
                report.tally("file").exported += 1;
            }
            Ok(path) => report.issue(
                Issue::new(
                    ExErrorKind::UnreadableEntity,
                    "file",
                    format!("path '{}' cannot be written to disk", path),
                )
                .with_key(file.key.clone()),
            ),
            Err(err) => report.issue(
                Issue::from_error("file", &err.into())
                    .with_kind(ExErrorKind::UnreadableEntity)
                    .with_key(file.key.clone()),
            ),
        }
    }

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    entries
}

/// Export document of one schema type, own members only
pub fn schema_doc(store: &Store, t: &SchemaType) -> SchemaDoc {
    SchemaDoc {
        key: t.key.clone(),
        name: t.name.clone(),
        bases: t.bases.clone(),
        properties: t
            .properties
            .iter()
            .map(|p| PropertyDoc {
                name: p.name.clone(),
                property_type: p.property_type.clone(),
                default: p.default_value.clone(),
                format: p.format.clone(),
                not_null: p.not_null,
                unique: p.unique,
            })
            .collect(),
        methods: t
            .methods
            .iter()
            .map(|m| MethodDoc {
                name: m.name.clone(),
                source: m.source.clone(),
                is_static: m.is_static,
            })
            .collect(),
        views: t
            .views
            .iter()
            .map(|v| ViewDoc {
                name: v.name.clone(),
                members: v.members.clone(),
                order: v.order.clone(),
            })
            .collect(),
        grants: grants_to_doc(store, &t.grants),
    }
}

//! Importer: export directory → live store
//!
//! Phases run in a fixed order: schema, shared components, pages, folders
//! and files, mail templates and localizations, then access control. The
//! schema phase is all-or-nothing and its failure aborts the run; every
//! later entity is written in its own transaction and a failing entity is
//! reported and skipped.

mod artifacts;
mod content;
mod files;
mod schema;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use strata_core::errors::{ExError, ExErrorKind};
use strata_core::model::{EntityKind, EntityRef, PathTemplate};
use strata_core::ops::content_ops;
use strata_core::{log_op_end, log_op_error, log_op_start, transact, Store};

use crate::config::DeployConfig;
use crate::errors::{invalid_export, Result};
use crate::format::layout::{self, FORMAT_VERSION};
use crate::format::manifest::{
    read_json, read_json_list, AclDoc, ComponentEntry, DeployManifest, FileEntry,
    LocalizationEntry, MailTemplateEntry, PageEntry, SchemaDoc,
};
use crate::format::markup::{parse_document, MarkupNode};
use crate::principals::PrincipalResolver;
use crate::reconcile::{reconcile, Match};
use crate::registry;
use crate::report::{DeployMode, DeployReport, Issue};

pub(crate) use content::{apply_fields, node_kind, reconcile_children};

/// Access-control block applied once every entity is in place
#[derive(Debug, Clone)]
pub(crate) struct PendingAcl {
    pub entity: EntityRef,
    pub key: String,
    pub acl: AclDoc,
}

/// Which optional groups the export carried
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Presence {
    pub components: bool,
    pub pages: bool,
    pub files: bool,
    pub mail_templates: bool,
    pub localizations: bool,
}

/// Everything read from an export directory before the store is touched
pub(crate) struct Bundle {
    pub dir: PathBuf,
    pub presence: Presence,
    pub schema: Vec<SchemaDoc>,
    pub components: Vec<ComponentEntry>,
    pub pages: Vec<PageEntry>,
    pub files: Vec<FileEntry>,
    pub mail_templates: Vec<MailTemplateEntry>,
    pub localizations: Vec<LocalizationEntry>,
}

/// Mutable state shared by the phases of one import
pub(crate) struct ImportContext {
    /// Every reconciliation key present in the export
    pub incoming_keys: HashSet<String>,
    /// Store ids matched or created by this import
    pub claimed: HashSet<String>,
    pub pending_acl: Vec<PendingAcl>,
    /// Detached nodes to delete at the end unless re-attached meanwhile
    pub orphans: Vec<String>,
    pub resolver: PrincipalResolver,
    pub report: DeployReport,
}

/// State to return to when an entity's transaction is rolled back
pub(crate) struct Checkpoint {
    claimed: HashSet<String>,
    pending_acl: usize,
    orphans: usize,
}

impl ImportContext {
    fn new(bundle: &Bundle) -> Self {
        Self {
            incoming_keys: incoming_keys(bundle),
            claimed: HashSet::new(),
            pending_acl: Vec::new(),
            orphans: Vec::new(),
            resolver: PrincipalResolver::new(),
            report: DeployReport::new(DeployMode::Import),
        }
    }

    /// Context for exercising a single phase outside a full import
    #[cfg(test)]
    pub(crate) fn standalone() -> Self {
        Self {
            incoming_keys: HashSet::new(),
            claimed: HashSet::new(),
            pending_acl: Vec::new(),
            orphans: Vec::new(),
            resolver: PrincipalResolver::new(),
            report: DeployReport::new(DeployMode::Import),
        }
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            claimed: self.claimed.clone(),
            pending_acl: self.pending_acl.len(),
            orphans: self.orphans.len(),
        }
    }

    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.claimed = checkpoint.claimed;
        self.pending_acl.truncate(checkpoint.pending_acl);
        self.orphans.truncate(checkpoint.orphans);
    }

    pub fn defer_acl(&mut self, entity: EntityRef, key: &str, acl: &AclDoc) {
        self.pending_acl.push(PendingAcl {
            entity,
            key: key.to_string(),
            acl: acl.clone(),
        });
    }

    /// Run `apply` as one store transaction; on failure the store and the
    /// context are left as they were and the error is returned
    pub fn atomically<T, F>(&mut self, store: &mut Store, apply: F) -> Result<T>
    where
        F: FnOnce(&mut Store, &mut Self) -> Result<T>,
    {
        let checkpoint = self.checkpoint();
        let outcome = transact(store, |s| apply(s, self));
        if outcome.is_err() {
            self.rollback(checkpoint);
        }
        outcome
    }
}

fn incoming_keys(bundle: &Bundle) -> HashSet<String> {
    let mut keys = HashSet::new();
    keys.extend(bundle.schema.iter().map(|d| d.key.clone()));
    keys.extend(bundle.components.iter().map(|e| e.key.clone()));
    keys.extend(bundle.pages.iter().map(|e| e.key.clone()));
    keys.extend(bundle.files.iter().map(|e| e.key.clone()));
    keys.extend(bundle.mail_templates.iter().map(|e| e.key.clone()));
    keys.extend(bundle.localizations.iter().map(|e| e.key.clone()));
    keys
}

/// Import the export in `dir` into `store`
///
/// Top-level entities absent from the export are deleted only when
/// `replace` is set. A fatal error leaves the store unchanged.
pub fn import(store: &mut Store, dir: &Path, replace: bool, config: &DeployConfig) -> DeployReport {
    let start = Instant::now();
    let bundle = match read_bundle(dir) {
        Ok(bundle) => bundle,
        Err(err) => {
            let mut report = DeployReport::new(DeployMode::Import);
            log_op_error!(
                "import",
                err.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            report.fail("directory", &err);
            report.finish();
            return report;
        }
    };

    let mut ctx = ImportContext::new(&bundle);
    log_op_start!(
        "import",
        run_id = %ctx.report.run_id,
        path = %dir.display(),
        replace = replace
    );

    match run_phases(store, &mut ctx, &bundle, replace, config) {
        Ok(()) => log_op_end!(
            "import",
            duration_ms = start.elapsed().as_millis() as u64,
            issue_count = ctx.report.issues.len()
        ),
        Err((entity, err)) => {
            log_op_error!(
                "import",
                err.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            ctx.report.fail(entity, &err);
        }
    }

    let mut report = ctx.report;
    report.finish();
    report
}

type PhaseResult = std::result::Result<(), (&'static str, ExError)>;

fn run_phases(
    store: &mut Store,
    ctx: &mut ImportContext,
    bundle: &Bundle,
    replace: bool,
    config: &DeployConfig,
) -> PhaseResult {
    let pool = config.thread_pool().map_err(|e| ("directory", e))?;

    // Parsing touches no store state; a schema failure still leaves the
    // store untouched because nothing has been written yet.
    let component_docs = pool.install(|| {
        parse_documents(&bundle.dir, layout::COMPONENTS_DIR, &bundle.components, |e| {
            &e.file
        })
    });
    let page_docs = pool.install(|| {
        parse_documents(&bundle.dir, layout::PAGES_DIR, &bundle.pages, |e| &e.file)
    });

    phase(store, ctx, "import_schema", |s, c| {
        schema::import_schema(s, c, &bundle.schema)
    })
    .map_err(|e| ("schema_type", e))?;

    // Shell pass over every component completes before any page is applied.
    let components: Vec<(ComponentEntry, Result<MarkupNode>)> = bundle
        .components
        .iter()
        .cloned()
        .zip(component_docs)
        .map(|(entry, doc)| (entry, doc.and_then(single_root)))
        .collect();
    step(store, ctx, "import_components", |s, c| {
        registry::import_components(s, c, &components)
    });

    step(store, ctx, "import_pages", |s, c| {
        for (entry, doc) in bundle.pages.iter().zip(page_docs) {
            import_page(s, c, entry, doc);
        }
    });

    if bundle.presence.files {
        step(store, ctx, "import_files", |s, c| {
            files::import_files(s, c, &bundle.dir, &bundle.files)
        });
    }

    step(store, ctx, "import_artifacts", |s, c| {
        if bundle.presence.mail_templates {
            artifacts::import_mail_templates(s, c, &bundle.mail_templates);
        }
        if bundle.presence.localizations {
            artifacts::import_localizations(s, c, &bundle.localizations);
        }
    });

    step(store, ctx, "import_access", apply_access);

    if replace {
        step(store, ctx, "import_replace", |s, c| {
            remove_absent(s, c, bundle.presence)
        });
    }

    remove_orphans(store, ctx);
    Ok(())
}

/// Run one phase with start/end logging
fn phase<F>(store: &mut Store, ctx: &mut ImportContext, op: &'static str, f: F) -> Result<()>
where
    F: FnOnce(&mut Store, &mut ImportContext) -> Result<()>,
{
    log_op_start!(op, run_id = %ctx.report.run_id);
    let start = Instant::now();
    let result = f(store, ctx);
    match &result {
        Ok(()) => log_op_end!(op, duration_ms = start.elapsed().as_millis() as u64),
        Err(err) => log_op_error!(
            op,
            err.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        ),
    }
    result
}

/// Run one phase that records its failures per entry in the report
fn step<F>(store: &mut Store, ctx: &mut ImportContext, op: &'static str, f: F)
where
    F: FnOnce(&mut Store, &mut ImportContext),
{
    log_op_start!(op, run_id = %ctx.report.run_id);
    let start = Instant::now();
    f(store, ctx);
    log_op_end!(op, duration_ms = start.elapsed().as_millis() as u64);
}

// ===== Reading =====

fn read_bundle(dir: &Path) -> Result<Bundle> {
    if !dir.is_dir() {
        return Err(invalid_export(dir, "export directory does not exist"));
    }
    let manifest_path = dir.join(layout::DEPLOY_FILE);
    if !manifest_path.is_file() {
        return Err(invalid_export(dir, "deploy.json is missing"));
    }
    let manifest: DeployManifest = read_json(&manifest_path)
        .map_err(|e| invalid_export(dir, format!("deploy.json is unreadable: {}", e.message())))?;
    if manifest.format != FORMAT_VERSION {
        return Err(invalid_export(
            dir,
            format!("unsupported export format {}", manifest.format),
        ));
    }

    let presence = Presence {
        components: dir.join(layout::COMPONENTS_FILE).is_file(),
        pages: dir.join(layout::PAGES_FILE).is_file(),
        files: dir.join(layout::FILES_FILE).is_file(),
        mail_templates: dir.join(layout::MAIL_TEMPLATES_FILE).is_file(),
        localizations: dir.join(layout::LOCALIZATIONS_FILE).is_file(),
    };

    Ok(Bundle {
        dir: dir.to_path_buf(),
        presence,
        schema: read_schema_dir(&dir.join(layout::SCHEMA_DIR))?,
        components: read_json_list(&dir.join(layout::COMPONENTS_FILE))?,
        pages: read_json_list(&dir.join(layout::PAGES_FILE))?,
        files: read_json_list(&dir.join(layout::FILES_FILE))?,
        mail_templates: read_json_list(&dir.join(layout::MAIL_TEMPLATES_FILE))?,
        localizations: read_json_list(&dir.join(layout::LOCALIZATIONS_FILE))?,
    })
}

fn read_schema_dir(schema_dir: &Path) -> Result<Vec<SchemaDoc>> {
    if !schema_dir.is_dir() {
        return Ok(Vec::new());
    }
    let entries = std::fs::read_dir(schema_dir)
        .map_err(|e| crate::errors::io_error("read_schema", schema_dir, e))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| crate::errors::io_error("read_schema", schema_dir, e))?
            .path();
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            paths.push(path);
        }
    }
    paths.sort();
    paths.iter().map(|p| read_json(p)).collect()
}

/// Read and parse one markup document per entry, in parallel
fn parse_documents<T, F>(
    dir: &Path,
    sub_dir: &str,
    entries: &[T],
    file_of: F,
) -> Vec<Result<Vec<MarkupNode>>>
where
    T: Sync,
    F: Fn(&T) -> &String + Sync,
{
    entries
        .par_iter()
        .map(|entry| {
            let file = file_of(entry);
            let path = dir.join(sub_dir).join(file);
            if !layout::is_plain_file_name(file) {
                return Err(ExError::new(ExErrorKind::UnreadableEntity)
                    .with_path(path.display().to_string())
                    .with_message(format!("'{}' is not a plain file name", file)));
            }
            let text = std::fs::read_to_string(&path)
                .map_err(|e| crate::errors::io_error("read_document", &path, e))?;
            parse_document(&text).map_err(|e| {
                ExError::new(ExErrorKind::UnreadableEntity)
                    .with_path(path.display().to_string())
                    .with_message(e.message().to_string())
            })
        })
        .collect()
}

fn single_root(mut nodes: Vec<MarkupNode>) -> Result<MarkupNode> {
    if nodes.len() != 1 {
        return Err(ExError::new(ExErrorKind::StructuralMismatch).with_message(format!(
            "component document must hold exactly one root node, found {}",
            nodes.len()
        )));
    }
    Ok(nodes.remove(0))
}

// ===== Pages =====

/// Store id the entry would match, without adopting anything
fn page_candidate(store: &Store, ctx: &ImportContext, entry: &PageEntry) -> Option<String> {
    match store.find_by_key(&entry.key) {
        Some(found) if found.kind == EntityKind::Page => Some(found.id.clone()),
        Some(_) => None,
        None => page_by_name_fallback(store, ctx, &entry.name),
    }
}

fn page_by_name_fallback(store: &Store, ctx: &ImportContext, name: &str) -> Option<String> {
    store
        .list_pages()
        .into_iter()
        .find(|p| {
            p.name == name && !ctx.incoming_keys.contains(&p.key) && !ctx.claimed.contains(&p.id)
        })
        .map(|p| p.id.clone())
}

fn import_page(
    store: &mut Store,
    ctx: &mut ImportContext,
    entry: &PageEntry,
    doc: Result<Vec<MarkupNode>>,
) {
    let result = doc.and_then(|nodes| {
        ctx.atomically(store, |s, c| apply_page(s, c, entry, &nodes))
    });
    if let Err(err) = result {
        // A skipped page keeps its previous state and survives replace mode.
        if let Some(id) = page_candidate(store, ctx, entry) {
            ctx.claimed.insert(id);
        }
        ctx.report.issue(
            Issue::from_error("page", &err)
                .with_key(entry.key.clone())
                .with_name(entry.name.clone()),
        );
    }
}

fn apply_page(
    store: &mut Store,
    ctx: &mut ImportContext,
    entry: &PageEntry,
    nodes: &[MarkupNode],
) -> Result<()> {
    if let Some(t) = &entry.custom_type {
        if store.type_by_name(t).is_none() {
            return Err(ExError::new(ExErrorKind::UnresolvedSchemaDependency)
                .with_key(entry.key.clone())
                .with_message(format!("page type {} is not defined", t)));
        }
    }
    let path_templates = entry
        .paths
        .iter()
        .map(|p| PathTemplate::parse(p))
        .collect::<strata_core::Result<Vec<_>>>()?;

    let matched = reconcile(store, EntityKind::Page, &entry.key, |s| {
        page_by_name_fallback(s, ctx, &entry.name)
    })?;
    let (id, created) = match matched {
        Match::Matched { id, .. } => {
            content_ops::rename_page(store, &id, &entry.name)?;
            (id, false)
        }
        Match::NotFound => {
            let id = content_ops::create_page(store, &entry.name)?;
            store.rekey(&EntityRef::page(&id), &entry.key)?;
            (id, true)
        }
    };
    ctx.claimed.insert(id.clone());

    let page = store.get_page_mut(&id)?;
    page.custom_type = entry.custom_type.clone();
    page.content_type = entry.content_type.clone();
    page.cache_for_seconds = entry.cache_for_seconds;
    page.dont_cache = entry.dont_cache;
    page.show_on_error_codes = entry.error_codes.clone();
    page.path_templates = path_templates;
    page.position = entry.position;
    page.touch();
    ctx.defer_acl(EntityRef::page(&id), &entry.key, &entry.acl);

    reconcile_children(store, ctx, &strata_core::model::ParentRef::Page(id), nodes)?;

    let tally = ctx.report.tally("page");
    if created {
        tally.created += 1;
    } else {
        tally.updated += 1;
    }
    Ok(())
}

// ===== Access control =====

fn apply_access(store: &mut Store, ctx: &mut ImportContext) {
    let pending = std::mem::take(&mut ctx.pending_acl);
    for item in pending {
        if store.access(&item.entity).is_err() {
            continue;
        }
        let outcome = ctx
            .resolver
            .acl_from_doc(store, &item.acl)
            .and_then(|acl| {
                *store.access_mut(&item.entity)? = acl;
                Ok(())
            });
        if let Err(err) = outcome {
            ctx.report.issue(
                Issue::from_error(item.entity.kind.as_str(), &err).with_key(item.key.clone()),
            );
        }
    }
    ctx.resolver.report_unresolved(&mut ctx.report);
}

// ===== Replace mode =====

fn remove_absent(store: &mut Store, ctx: &mut ImportContext, presence: Presence) {
    let mut doomed: Vec<(&'static str, EntityRef)> = Vec::new();

    if presence.pages {
        doomed.extend(
            store
                .list_pages()
                .into_iter()
                .filter(|p| !ctx.claimed.contains(&p.id))
                .map(|p| ("page", EntityRef::page(&p.id))),
        );
    }
    if presence.components {
        doomed.extend(
            store
                .shadow_components()
                .iter()
                .filter(|id| !ctx.claimed.contains(*id))
                .map(|id| ("component", EntityRef::node(id))),
        );
    }
    if presence.files {
        for folder in store.list_folders() {
            let included = strata_core::ops::file_ops::is_folder_included(store, &folder.id)
                .unwrap_or(false);
            if included && !ctx.claimed.contains(&folder.id) {
                doomed.push(("folder", EntityRef::folder(&folder.id)));
            }
        }
        for file in store.list_files() {
            let included =
                strata_core::ops::file_ops::is_file_included(store, &file.id).unwrap_or(false);
            if included && !ctx.claimed.contains(&file.id) {
                doomed.push(("file", EntityRef::file(&file.id)));
            }
        }
    }
    if presence.mail_templates {
        doomed.extend(
            store
                .list_mail_templates()
                .into_iter()
                .filter(|t| !ctx.claimed.contains(&t.id))
                .map(|t| ("mail_template", EntityRef::new(EntityKind::MailTemplate, &t.id))),
        );
    }
    if presence.localizations {
        doomed.extend(
            store
                .list_localizations()
                .into_iter()
                .filter(|l| !ctx.claimed.contains(&l.id))
                .map(|l| ("localization", EntityRef::new(EntityKind::Localization, &l.id))),
        );
    }

    for (label, entity) in doomed {
        match delete_entity(store, &entity) {
            Ok(true) => ctx.report.tally(label).deleted += 1,
            Ok(false) => {}
            Err(err) => ctx.report.warn(Issue::from_error(label, &err.into())),
        }
    }
}

/// Delete one top-level entity; `false` when an earlier deletion already
/// took it along
fn delete_entity(store: &mut Store, entity: &EntityRef) -> strata_core::Result<bool> {
    use strata_core::ops::file_ops;
    if store.key_of(entity).is_err() {
        return Ok(false);
    }
    match entity.kind {
        EntityKind::Page => content_ops::delete_page(store, &entity.id)?,
        EntityKind::Node => content_ops::delete_shared_component(store, &entity.id)?,
        EntityKind::Folder => file_ops::delete_folder(store, &entity.id)?,
        EntityKind::File => file_ops::delete_file(store, &entity.id)?,
        EntityKind::MailTemplate => {
            store.remove_mail_template(&entity.id);
        }
        EntityKind::Localization => {
            store.remove_localization(&entity.id);
        }
        _ => return Ok(false),
    }
    Ok(true)
}

/// Delete detached nodes nothing re-attached during the import
fn remove_orphans(store: &mut Store, ctx: &mut ImportContext) {
    let orphans = std::mem::take(&mut ctx.orphans);
    let mut seen = HashSet::new();
    for id in orphans {
        if !seen.insert(id.clone()) {
            continue;
        }
        let detached = store
            .get_node(&id)
            .map(|n| n.parent.is_none() && !n.shared)
            .unwrap_or(false);
        if !detached {
            continue;
        }
        match content_ops::remove_node(store, &id) {
            Ok(()) => ctx.report.tally("node").deleted += 1,
            Err(err) => ctx.report.warn(Issue::from_error("node", &err.into())),
        }
    }
}

//! Mail templates and localizations

use strata_core::model::{new_id, EntityKind, EntityRef, Localization, MailTemplate};
use strata_core::Store;

use super::ImportContext;
use crate::format::manifest::{LocalizationEntry, MailTemplateEntry};
use crate::reconcile::{reconcile, Match};
use crate::report::Issue;

pub(crate) fn import_mail_templates(
    store: &mut Store,
    ctx: &mut ImportContext,
    entries: &[MailTemplateEntry],
) {
    for entry in entries {
        let outcome = ctx.atomically(store, |s, c| {
            let matched = reconcile(s, EntityKind::MailTemplate, &entry.key, |s| {
                s.list_mail_templates()
                    .into_iter()
                    .find(|t| {
                        t.name == entry.name
                            && t.locale == entry.locale
                            && !c.incoming_keys.contains(&t.key)
                    })
                    .map(|t| t.id.clone())
            })?;
            let id = match matched {
                Match::Matched { id, .. } => {
                    if let Some(t) = s.get_mail_template_mut(&id) {
                        t.name = entry.name.clone();
                        t.locale = entry.locale.clone();
                        t.text = entry.text.clone();
                        t.updated_at = chrono::Utc::now();
                    }
                    c.report.tally("mail_template").updated += 1;
                    id
                }
                Match::NotFound => {
                    let id = new_id();
                    s.insert_mail_template(MailTemplate::new(
                        id.clone(),
                        entry.key.clone(),
                        entry.name.clone(),
                        entry.locale.clone(),
                        entry.text.clone(),
                    ))?;
                    c.report.tally("mail_template").created += 1;
                    id
                }
            };
            c.claimed.insert(id);
            Ok(())
        });
        if let Err(err) = outcome {
            protect(store, ctx, EntityKind::MailTemplate, &entry.key);
            ctx.report.issue(
                Issue::from_error("mail_template", &err)
                    .with_key(entry.key.clone())
                    .with_name(entry.name.clone()),
            );
        }
    }
}

pub(crate) fn import_localizations(
    store: &mut Store,
    ctx: &mut ImportContext,
    entries: &[LocalizationEntry],
) {
    for entry in entries {
        let outcome = ctx.atomically(store, |s, c| {
            let matched = reconcile(s, EntityKind::Localization, &entry.key, |s| {
                s.list_localizations()
                    .into_iter()
                    .find(|l| {
                        l.name == entry.name
                            && l.domain == entry.domain
                            && l.locale == entry.locale
                            && !c.incoming_keys.contains(&l.key)
                    })
                    .map(|l| l.id.clone())
            })?;
            let id = match matched {
                Match::Matched { id, .. } => {
                    if let Some(l) = s.get_localization_mut(&id) {
                        l.name = entry.name.clone();
                        l.domain = entry.domain.clone();
                        l.locale = entry.locale.clone();
                        l.text = entry.text.clone();
                        l.updated_at = chrono::Utc::now();
                    }
                    c.report.tally("localization").updated += 1;
                    id
                }
                Match::NotFound => {
                    let id = new_id();
                    let mut localization = Localization::new(
                        id.clone(),
                        entry.key.clone(),
                        entry.name.clone(),
                        entry.locale.clone(),
                        entry.text.clone(),
                    );
                    localization.domain = entry.domain.clone();
                    s.insert_localization(localization)?;
                    c.report.tally("localization").created += 1;
                    id
                }
            };
            c.claimed.insert(id);
            Ok(())
        });
        if let Err(err) = outcome {
            protect(store, ctx, EntityKind::Localization, &entry.key);
            ctx.report.issue(
                Issue::from_error("localization", &err)
                    .with_key(entry.key.clone())
                    .with_name(entry.name.clone()),
            );
        }
    }
}

/// Keep an artifact that failed to import out of replace-mode deletion
fn protect(store: &Store, ctx: &mut ImportContext, kind: EntityKind, key: &str) {
    if let Some(EntityRef { kind: found, id }) = store.find_by_key(key) {
        if *found == kind {
            ctx.claimed.insert(id.clone());
        }
    }
}

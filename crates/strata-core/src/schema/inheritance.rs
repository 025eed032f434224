use std::collections::HashSet;

use crate::errors::{Result, StrataError};
use crate::model::{SchemaMethod, SchemaProperty, SchemaView};
use crate::ops::Store;

/// A schema type with every inherited member folded in
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveType {
    pub name: String,
    /// The type itself followed by its ancestors, first occurrence wins
    pub lineage: Vec<String>,
    pub properties: Vec<SchemaProperty>,
    pub methods: Vec<SchemaMethod>,
    pub views: Vec<SchemaView>,
}

impl EffectiveType {
    pub fn property(&self, name: &str) -> Option<&SchemaProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn view(&self, name: &str) -> Option<&SchemaView> {
        self.views.iter().find(|v| v.name == name)
    }

    pub fn is_a(&self, type_name: &str) -> bool {
        self.lineage.iter().any(|t| t == type_name)
    }
}

/// Fold the members of every base into `type_name`
///
/// Bases are merged in declaration order. The same member inherited from two
/// bases must be identical (diamonds are fine); members declared on the type
/// itself override inherited ones in place.
///
/// # Errors
/// * `TypeNotFound` - If `type_name` does not exist
/// * `UnknownBaseType` - If a base does not exist
/// * `InheritanceCycle` - If the type reaches itself through its bases
/// * `ConflictingInheritance` - If two bases disagree on a member
pub fn flatten(store: &Store, type_name: &str) -> Result<EffectiveType> {
    let mut on_path = HashSet::new();
    flatten_inner(store, type_name, &mut on_path)
}

fn flatten_inner(
    store: &Store,
    type_name: &str,
    on_path: &mut HashSet<String>,
) -> Result<EffectiveType> {
    let declared = store.require_type(type_name)?;
    if !on_path.insert(type_name.to_string()) {
        return Err(StrataError::InheritanceCycle {
            type_name: type_name.to_string(),
        });
    }

    let mut lineage = vec![declared.name.clone()];
    let mut properties: Vec<(SchemaProperty, String)> = Vec::new();
    let mut methods: Vec<(SchemaMethod, String)> = Vec::new();
    let mut views: Vec<(SchemaView, String)> = Vec::new();

    for base in &declared.bases {
        if store.type_by_name(base).is_none() {
            return Err(StrataError::UnknownBaseType {
                type_name: type_name.to_string(),
                base: base.clone(),
            });
        }
        let inherited = flatten_inner(store, base, on_path)?;
        for t in inherited.lineage {
            if !lineage.contains(&t) {
                lineage.push(t);
            }
        }
        for p in inherited.properties {
            merge_member(type_name, &mut properties, p, base, |p| &p.name)?;
        }
        for m in inherited.methods {
            merge_member(type_name, &mut methods, m, base, |m| &m.name)?;
        }
        for v in inherited.views {
            merge_view(type_name, &mut views, v, base)?;
        }
    }

    for p in &declared.properties {
        override_member(&mut properties, p.clone(), type_name, |p| &p.name);
    }
    for m in &declared.methods {
        override_member(&mut methods, m.clone(), type_name, |m| &m.name);
    }
    for own in &declared.views {
        match views.iter_mut().find(|(v, _)| v.name == own.name) {
            Some((inherited, origin)) => {
                for member in &own.members {
                    if !inherited.members.contains(member) {
                        inherited.members.push(member.clone());
                    }
                }
                if own.order.is_some() {
                    inherited.order = own.order.clone();
                }
                *origin = type_name.to_string();
            }
            None => views.push((own.clone(), type_name.to_string())),
        }
    }

    on_path.remove(type_name);
    Ok(EffectiveType {
        name: declared.name.clone(),
        lineage,
        properties: properties.into_iter().map(|(p, _)| p).collect(),
        methods: methods.into_iter().map(|(m, _)| m).collect(),
        views: views.into_iter().map(|(v, _)| v).collect(),
    })
}

fn merge_member<T: Clone + PartialEq>(
    type_name: &str,
    acc: &mut Vec<(T, String)>,
    member: T,
    origin: &str,
    name_of: impl Fn(&T) -> &String,
) -> Result<()> {
    match acc.iter().find(|(existing, _)| name_of(existing) == name_of(&member)) {
        Some((existing, first)) if existing != &member => {
            Err(StrataError::ConflictingInheritance {
                type_name: type_name.to_string(),
                member: name_of(&member).clone(),
                first: first.clone(),
                second: origin.to_string(),
            })
        }
        Some(_) => Ok(()),
        None => {
            acc.push((member, origin.to_string()));
            Ok(())
        }
    }
}

fn override_member<T>(
    acc: &mut Vec<(T, String)>,
    member: T,
    origin: &str,
    name_of: impl Fn(&T) -> &String,
) {
    match acc
        .iter_mut()
        .find(|(existing, _)| name_of(existing) == name_of(&member))
    {
        Some(slot) => *slot = (member, origin.to_string()),
        None => acc.push((member, origin.to_string())),
    }
}

/// Views from different bases merge by unioning members; their custom
/// orders must agree
fn merge_view(
    type_name: &str,
    acc: &mut Vec<(SchemaView, String)>,
    view: SchemaView,
    origin: &str,
) -> Result<()> {
    match acc.iter_mut().find(|(existing, _)| existing.name == view.name) {
        Some((existing, first)) => {
            let disagree = matches!(
                (&existing.order, &view.order),
                (Some(a), Some(b)) if a != b
            );
            if disagree {
                return Err(StrataError::ConflictingInheritance {
                    type_name: type_name.to_string(),
                    member: format!("view {}", view.name),
                    first: first.clone(),
                    second: origin.to_string(),
                });
            }
            if existing.order.is_none() {
                existing.order = view.order.clone();
            }
            for member in view.members {
                if !existing.members.contains(&member) {
                    existing.members.push(member);
                }
            }
            Ok(())
        }
        None => {
            acc.push((view, origin.to_string()));
            Ok(())
        }
    }
}

/// Names of every type whose lineage includes `type_name` (itself included), sorted
pub fn subtypes_of(store: &Store, type_name: &str) -> Vec<String> {
    let mut out: Vec<String> = store
        .list_types()
        .into_iter()
        .filter(|t| {
            flatten(store, &t.name)
                .map(|eff| eff.is_a(type_name))
                .unwrap_or(false)
        })
        .map(|t| t.name.clone())
        .collect();
    out.sort();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SchemaType;

    fn add_type(store: &mut Store, name: &str, bases: &[&str], props: &[(&str, &str)]) {
        let mut t = SchemaType::new(
            format!("id-{}", name),
            format!("key-{}", name),
            name.to_string(),
        );
        t.bases = bases.iter().map(|b| b.to_string()).collect();
        t.properties = props
            .iter()
            .map(|(n, ty)| SchemaProperty::new(*n, *ty))
            .collect();
        store.insert_type(t).unwrap();
    }

    #[test]
    fn test_diamond_with_identical_members_is_allowed() {
        let mut store = Store::new();
        add_type(&mut store, "A", &[], &[("x", "String")]);
        add_type(&mut store, "B", &["A"], &[]);
        add_type(&mut store, "C", &["A"], &[]);
        add_type(&mut store, "D", &["B", "C"], &[("y", "Integer")]);

        let eff = flatten(&store, "D").unwrap();
        let names: Vec<&str> = eff.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["x", "y"]);
        assert_eq!(eff.lineage, vec!["D", "B", "A", "C"]);
    }

    #[test]
    fn test_conflicting_bases_rejected() {
        let mut store = Store::new();
        add_type(&mut store, "B", &[], &[("x", "String")]);
        add_type(&mut store, "C", &[], &[("x", "Integer")]);
        add_type(&mut store, "D", &["B", "C"], &[]);

        let err = flatten(&store, "D").unwrap_err();
        assert_eq!(
            err,
            StrataError::ConflictingInheritance {
                type_name: "D".to_string(),
                member: "x".to_string(),
                first: "B".to_string(),
                second: "C".to_string(),
            }
        );
    }

    #[test]
    fn test_own_definition_overrides_conflict_free() {
        let mut store = Store::new();
        add_type(&mut store, "B", &[], &[("x", "String")]);
        add_type(&mut store, "D", &["B"], &[("x", "Integer")]);
        let eff = flatten(&store, "D").unwrap();
        assert_eq!(eff.property("x").unwrap().property_type, "Integer");
    }

    #[test]
    fn test_cycle_and_unknown_base() {
        let mut store = Store::new();
        add_type(&mut store, "A", &["B"], &[]);
        add_type(&mut store, "B", &["A"], &[]);
        add_type(&mut store, "C", &["Missing"], &[]);

        assert!(matches!(
            flatten(&store, "A"),
            Err(StrataError::InheritanceCycle { .. })
        ));
        assert!(matches!(
            flatten(&store, "C"),
            Err(StrataError::UnknownBaseType { .. })
        ));
    }

    #[test]
    fn test_subtypes_of_includes_self() {
        let mut store = Store::new();
        add_type(&mut store, "A", &[], &[]);
        add_type(&mut store, "B", &["A"], &[]);
        add_type(&mut store, "C", &[], &[]);
        assert_eq!(subtypes_of(&store, "A"), vec!["A", "B"]);
    }
}

//! Traversal and query operations for snapshots.

use crate::types::{Member, Snapshot, TypeRef};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A scope within which sibling names must be unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    Class,
    Member,
    Enum,
    EnumItem,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Scope::Class => "Class",
            Scope::Member => "Member",
            Scope::Enum => "Enum",
            Scope::EnumItem => "EnumItem",
        };
        f.write_str(s)
    }
}

/// Several siblings sharing one name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Duplicate {
    pub scope: Scope,
    /// Owning class or enum, for member and item scopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub name: String,
    pub count: usize,
}

/// Visit every type reference in a snapshot.
///
/// Class and enum declarations are visited as `Class`/`Enum` references, as
/// is each non-empty superclass. Member types follow: property value types,
/// parameter types, then return types.
///
/// # Examples
///
/// ```
/// use apihist::v1::{Class, Function, Snapshot, TypeRef, query};
///
/// let snapshot = Snapshot::new().with_class(
///     Class::new("Workspace")
///         .with_superclass("Model")
///         .with_member(
///             Function::new("FindPartOnRay", TypeRef::new("Class", "BasePart"))
///                 .with_parameter(TypeRef::new("DataType", "Ray"), "ray"),
///         ),
/// );
///
/// let mut seen = Vec::new();
/// query::visit_types(&snapshot, |t| seen.push(t.to_string()));
/// assert_eq!(
///     seen,
///     ["Class:Workspace", "Class:Model", "DataType:Ray", "Class:BasePart"]
/// );
/// ```
pub fn visit_types(snapshot: &Snapshot, mut visit: impl FnMut(&TypeRef)) {
    for class in &snapshot.classes {
        visit(&TypeRef::new("Class", class.name.as_str()));
        if !class.superclass.is_empty() {
            visit(&TypeRef::new("Class", class.superclass.as_str()));
        }
        for member in &class.members {
            member_types(member).into_iter().for_each(&mut visit);
        }
    }
    for enumeration in &snapshot.enums {
        visit(&TypeRef::new("Enum", enumeration.name.as_str()));
    }
}

/// Type references carried by one member: property value type, parameter
/// types, then return type.
pub fn member_types(member: &Member) -> Vec<&TypeRef> {
    match member {
        Member::Property(p) => vec![&p.value_type],
        Member::Function(f) => f
            .parameters
            .iter()
            .map(|p| &p.ty)
            .chain(std::iter::once(&f.return_type))
            .collect(),
        Member::Event(e) => e.parameters.iter().map(|p| &p.ty).collect(),
        Member::Callback(c) => c
            .parameters
            .iter()
            .map(|p| &p.ty)
            .chain(std::iter::once(&c.return_type))
            .collect(),
    }
}

/// Every member type reference whose category is still empty, with a
/// `Class.Member` location.
pub fn uncategorized_types(snapshot: &Snapshot) -> Vec<(String, &TypeRef)> {
    let mut out = Vec::new();
    for class in &snapshot.classes {
        for member in &class.members {
            for ty in member_types(member) {
                if !ty.is_categorized() {
                    out.push((format!("{}.{}", class.name, member.name()), ty));
                }
            }
        }
    }
    out
}

/// All name collisions in a snapshot, in order of first appearance.
///
/// # Examples
///
/// ```
/// use apihist::v1::{Class, Snapshot, query::{self, Scope}};
///
/// let snapshot = Snapshot::new()
///     .with_class(Class::new("Pages"))
///     .with_class(Class::new("Workspace"))
///     .with_class(Class::new("Pages"));
///
/// let dups = query::duplicates(&snapshot);
/// assert_eq!(dups.len(), 1);
/// assert_eq!(dups[0].scope, Scope::Class);
/// assert_eq!(dups[0].name, "Pages");
/// assert_eq!(dups[0].count, 2);
/// ```
pub fn duplicates(snapshot: &Snapshot) -> Vec<Duplicate> {
    let mut out = Vec::new();
    collect_duplicates(
        snapshot.classes.iter().map(|c| c.name.as_str()),
        Scope::Class,
        None,
        &mut out,
    );
    for class in &snapshot.classes {
        collect_duplicates(
            class.members.iter().map(Member::name),
            Scope::Member,
            Some(class.name.as_str()),
            &mut out,
        );
    }
    collect_duplicates(
        snapshot.enums.iter().map(|e| e.name.as_str()),
        Scope::Enum,
        None,
        &mut out,
    );
    for enumeration in &snapshot.enums {
        collect_duplicates(
            enumeration.items.iter().map(|i| i.name.as_str()),
            Scope::EnumItem,
            Some(enumeration.name.as_str()),
            &mut out,
        );
    }
    out
}

fn collect_duplicates<'a>(
    names: impl Iterator<Item = &'a str>,
    scope: Scope,
    parent: Option<&str>,
    out: &mut Vec<Duplicate>,
) {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for name in names {
        let count = counts.entry(name).or_insert(0);
        if *count == 0 {
            order.push(name);
        }
        *count += 1;
    }
    for name in order {
        let count = counts[name];
        if count > 1 {
            out.push(Duplicate {
                scope,
                parent: parent.map(str::to_string),
                name: name.to_string(),
                count,
            });
        }
    }
}

/// Count of classes, members, enums, and enum items.
pub fn entity_counts(snapshot: &Snapshot) -> (usize, usize, usize, usize) {
    let members = snapshot.classes.iter().map(|c| c.members.len()).sum();
    let items = snapshot.enums.iter().map(|e| e.items.len()).sum();
    (snapshot.classes.len(), members, snapshot.enums.len(), items)
}

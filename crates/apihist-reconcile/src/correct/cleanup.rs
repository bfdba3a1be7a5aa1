//! Known historical defects, removed unconditionally after correction.

use apihist::v1::query::Scope;
use apihist::v1::{MemberKind, Snapshot};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefectFix {
    /// Remove every member of this kind carrying the name.
    RemoveMember(MemberKind),
    /// Keep the first entity carrying the name and remove the rest.
    KeepFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownDefect {
    pub scope: Scope,
    pub parent: &'static str,
    pub name: &'static str,
    pub fix: DefectFix,
}

pub const KNOWN_DEFECTS: &[KnownDefect] = &[
    // A Loaded function that shadowed the Loaded event and was never used.
    KnownDefect {
        scope: Scope::Member,
        parent: "DataModel",
        name: "Loaded",
        fix: DefectFix::RemoveMember(MemberKind::Function),
    },
    // Redundant KeypadEquals items, all removed eventually.
    KnownDefect {
        scope: Scope::EnumItem,
        parent: "KeyCode",
        name: "KeypadEquals",
        fix: DefectFix::KeepFirst,
    },
];

/// An entity removed by a known-defect rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefectRemoval {
    pub scope: Scope,
    pub parent: String,
    pub name: String,
    pub count: usize,
}

/// Whether a duplicate of `name` in this scope is a known defect that
/// [`cleanup`] will take care of.
pub fn is_known_defect(scope: Scope, parent: Option<&str>, name: &str) -> bool {
    KNOWN_DEFECTS
        .iter()
        .any(|d| d.scope == scope && Some(d.parent) == parent && d.name == name)
}

/// Apply every known-defect rule to the snapshot.
pub fn cleanup(snapshot: &mut Snapshot) -> Vec<DefectRemoval> {
    let mut removals = Vec::new();
    for defect in KNOWN_DEFECTS {
        let count = apply(snapshot, defect);
        if count > 0 {
            removals.push(DefectRemoval {
                scope: defect.scope,
                parent: defect.parent.to_string(),
                name: defect.name.to_string(),
                count,
            });
        }
    }
    removals
}

fn apply(snapshot: &mut Snapshot, defect: &KnownDefect) -> usize {
    match defect.scope {
        Scope::Member => {
            let Some(class) = snapshot.class_mut(defect.parent) else {
                return 0;
            };
            let before = class.members.len();
            match defect.fix {
                DefectFix::RemoveMember(kind) => class
                    .members
                    .retain(|m| !(m.kind() == kind && m.name() == defect.name)),
                DefectFix::KeepFirst => keep_first(&mut class.members, |m| m.name() == defect.name),
            }
            before - class.members.len()
        }
        Scope::EnumItem => {
            let Some(enumeration) = snapshot.enumeration_mut(defect.parent) else {
                return 0;
            };
            let before = enumeration.items.len();
            match defect.fix {
                DefectFix::KeepFirst | DefectFix::RemoveMember(_) => {
                    keep_first(&mut enumeration.items, |i| i.name == defect.name)
                }
            }
            before - enumeration.items.len()
        }
        Scope::Class => {
            let before = snapshot.classes.len();
            keep_first(&mut snapshot.classes, |c| c.name == defect.name);
            before - snapshot.classes.len()
        }
        Scope::Enum => {
            let before = snapshot.enums.len();
            keep_first(&mut snapshot.enums, |e| e.name == defect.name);
            before - snapshot.enums.len()
        }
    }
}

fn keep_first<T>(items: &mut Vec<T>, matches: impl Fn(&T) -> bool) {
    let mut seen = false;
    items.retain(|item| {
        if !matches(item) {
            return true;
        }
        let keep = !seen;
        seen = true;
        keep
    });
}

//! Deterministic resolution of duplicate names within one snapshot.

use crate::correct::cleanup::is_known_defect;
use crate::error::{ReconcileError, Result};
use apihist::v1::query::Scope;
use apihist::v1::{Class, Enum, EnumItem, Member, Snapshot};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// What to do with a repeated occurrence of a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictAction {
    Rename(String),
    Drop,
}

/// One correction, keyed by `(scope, parent, name, occurrence)`.
///
/// `occurrence` counts from zero in authored order, so the first repeat of a
/// name is occurrence 1. The first occurrence is never corrected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConflictEntry {
    pub scope: Scope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub name: String,
    pub occurrence: usize,
    pub action: ConflictAction,
}

/// An ordered list of corrections; the first matching entry wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConflictTable {
    entries: Vec<ConflictEntry>,
}

impl ConflictEntry {
    pub fn new(
        scope: Scope,
        parent: Option<&str>,
        name: impl Into<String>,
        occurrence: usize,
        action: ConflictAction,
    ) -> Self {
        Self {
            scope,
            parent: parent.map(str::to_string),
            name: name.into(),
            occurrence,
            action,
        }
    }
}

impl ConflictTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Corrections for duplicates known to occur in the historical dumps.
    pub fn historical() -> Self {
        use ConflictAction::{Drop, Rename};
        Self::new()
            // The second Pages was renamed StandardPages in the next version.
            .with_entry(ConflictEntry::new(
                Scope::Class,
                None,
                "Pages",
                1,
                Rename("StandardPages".into()),
            ))
            // The second CameraMode became CustomCameraMode several versions later.
            .with_entry(ConflictEntry::new(
                Scope::Enum,
                None,
                "CameraMode",
                1,
                Rename("CustomCameraMode".into()),
            ))
            .with_entry(ConflictEntry::new(
                Scope::EnumItem,
                Some("HumanoidStateType"),
                "Running",
                1,
                Rename("RunningNoPhysics".into()),
            ))
            .with_entry(ConflictEntry::new(
                Scope::EnumItem,
                Some("KeyCode"),
                "KeypadEquals",
                1,
                Drop,
            ))
            .with_entry(ConflictEntry::new(
                Scope::EnumItem,
                Some("KeyCode"),
                "KeypadEquals",
                2,
                Drop,
            ))
    }

    /// Read additional entries from a JSON array.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| {
            ReconcileError::Config(format!("invalid conflict table {}: {}", path.display(), e))
        })
    }

    pub fn with_entry(mut self, entry: ConflictEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Append another table's entries after this one's.
    pub fn extend(&mut self, other: ConflictTable) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> &[ConflictEntry] {
        &self.entries
    }

    pub fn lookup(
        &self,
        scope: Scope,
        parent: Option<&str>,
        name: &str,
        occurrence: usize,
    ) -> Option<&ConflictAction> {
        self.entries
            .iter()
            .find(|e| {
                e.scope == scope
                    && e.parent.as_deref() == parent
                    && e.name == name
                    && e.occurrence == occurrence
            })
            .map(|e| &e.action)
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Where a duplicate occurrence sits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictSite {
    pub scope: Scope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub name: String,
    pub occurrence: usize,
}

/// A duplicate with no table entry, left in place.
pub type UnresolvedConflict = ConflictSite;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Renamed {
    #[serde(flatten)]
    pub site: ConflictSite,
    pub to: String,
}

/// Everything [`resolve`] did to a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub renamed: Vec<Renamed>,
    pub dropped: Vec<ConflictSite>,
    /// Duplicates left for the known-defect cleanup.
    pub deferred: Vec<ConflictSite>,
    pub unresolved: Vec<UnresolvedConflict>,
}

impl Resolution {
    /// True when nothing was renamed or dropped.
    pub fn is_noop(&self) -> bool {
        self.renamed.is_empty() && self.dropped.is_empty()
    }
}

/// Fix duplicate names in place using the correction table.
///
/// Scopes are visited classes, members of each class, enums, then items of
/// each enum. Survivors keep their relative order.
pub fn resolve(snapshot: &mut Snapshot, table: &ConflictTable) -> Resolution {
    let mut resolution = Resolution::default();
    let mut scope = ScopeResolver {
        table,
        resolution: &mut resolution,
    };

    scope.run(
        &mut snapshot.classes,
        Scope::Class,
        None,
        |c| c.name.as_str(),
        |c: &mut Class, to| c.name = to.to_string(),
    );
    for class in &mut snapshot.classes {
        scope.run(
            &mut class.members,
            Scope::Member,
            Some(class.name.as_str()),
            Member::name,
            |m: &mut Member, to| m.set_name(to),
        );
    }
    scope.run(
        &mut snapshot.enums,
        Scope::Enum,
        None,
        |e| e.name.as_str(),
        |e: &mut Enum, to| e.name = to.to_string(),
    );
    for enumeration in &mut snapshot.enums {
        scope.run(
            &mut enumeration.items,
            Scope::EnumItem,
            Some(enumeration.name.as_str()),
            |i| i.name.as_str(),
            |i: &mut EnumItem, to| i.name = to.to_string(),
        );
    }

    resolution
}

struct ScopeResolver<'a> {
    table: &'a ConflictTable,
    resolution: &'a mut Resolution,
}

impl ScopeResolver<'_> {
    fn run<T>(
        &mut self,
        items: &mut Vec<T>,
        scope: Scope,
        parent: Option<&str>,
        name_of: impl Fn(&T) -> &str,
        rename: impl Fn(&mut T, &str),
    ) {
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut kept = Vec::with_capacity(items.len());
        for mut item in items.drain(..) {
            let name = name_of(&item).to_string();
            let count = seen.entry(name.clone()).or_insert(0);
            let occurrence = *count;
            *count += 1;
            if occurrence == 0 {
                kept.push(item);
                continue;
            }

            let site = ConflictSite {
                scope,
                parent: parent.map(str::to_string),
                name,
                occurrence,
            };
            match self.table.lookup(scope, parent, &site.name, occurrence) {
                Some(ConflictAction::Rename(to)) => {
                    rename(&mut item, to);
                    // The new name now occupies its own slot.
                    *seen.entry(to.clone()).or_insert(0) += 1;
                    kept.push(item);
                    self.resolution.renamed.push(Renamed {
                        site,
                        to: to.clone(),
                    });
                }
                Some(ConflictAction::Drop) => self.resolution.dropped.push(site),
                None if is_known_defect(scope, parent, &site.name) => {
                    debug!(
                        "Deferring duplicate {} {} (occurrence {}) to cleanup",
                        scope,
                        qualified(parent, &site.name),
                        occurrence
                    );
                    kept.push(item);
                    self.resolution.deferred.push(site);
                }
                None => {
                    warn!(
                        "Unresolved duplicate {} {} (occurrence {})",
                        scope,
                        qualified(parent, &site.name),
                        occurrence
                    );
                    kept.push(item);
                    self.resolution.unresolved.push(site);
                }
            }
        }
        *items = kept;
    }
}

fn qualified(parent: Option<&str>, name: &str) -> String {
    match parent {
        Some(parent) => format!("{parent}.{name}"),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apihist::v1::{Event, Function, TypeRef, query};

    fn legacy_duplicates() -> Snapshot {
        Snapshot::new()
            .with_class(Class::new("Pages"))
            .with_class(
                Class::new("DataModel")
                    .with_member(Function::new("Loaded", TypeRef::uncategorized("bool")))
                    .with_member(Event::new("Loaded")),
            )
            .with_class(Class::new("Pages").with_superclass("Instance"))
            .with_enum(Enum::new("CameraMode").with_item("Classic", 0))
            .with_enum(Enum::new("CameraMode").with_item("Follow", 1))
            .with_enum(
                Enum::new("HumanoidStateType")
                    .with_item("Running", 8)
                    .with_item("Running", 10),
            )
            .with_enum(
                Enum::new("KeyCode")
                    .with_item("KeypadEquals", 272)
                    .with_item("KeypadEquals", 272)
                    .with_item("A", 97)
                    .with_item("KeypadEquals", 272),
            )
    }

    #[test]
    fn test_resolve_renames_second_pages() {
        let mut snapshot = legacy_duplicates();
        let resolution = resolve(&mut snapshot, &ConflictTable::historical());

        let names: Vec<&str> = snapshot.classes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Pages", "DataModel", "StandardPages"]);
        assert_eq!(snapshot.classes[2].superclass, "Instance");
        assert_eq!(resolution.renamed[0].to, "StandardPages");
    }

    #[test]
    fn test_resolve_enums_and_items() {
        let mut snapshot = legacy_duplicates();
        resolve(&mut snapshot, &ConflictTable::historical());

        let enums: Vec<&str> = snapshot.enums.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            enums,
            ["CameraMode", "CustomCameraMode", "HumanoidStateType", "KeyCode"]
        );
        assert_eq!(snapshot.enums[1].items[0].name, "Follow");

        let states = snapshot.enumeration("HumanoidStateType").unwrap();
        assert_eq!(states.items[1].name, "RunningNoPhysics");
        assert_eq!(states.items[1].value, 10);

        let keycode = snapshot.enumeration("KeyCode").unwrap();
        let items: Vec<&str> = keycode.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(items, ["KeypadEquals", "A"]);
    }

    #[test]
    fn test_resolve_defers_known_defects() {
        let mut snapshot = legacy_duplicates();
        let resolution = resolve(&mut snapshot, &ConflictTable::historical());

        assert_eq!(resolution.deferred.len(), 1);
        assert_eq!(resolution.deferred[0].parent.as_deref(), Some("DataModel"));
        assert!(resolution.unresolved.is_empty());
        // Both Loaded members are still there until cleanup runs.
        assert_eq!(snapshot.class("DataModel").unwrap().members.len(), 2);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let table = ConflictTable::historical();
        let mut once = legacy_duplicates();
        resolve(&mut once, &table);
        let mut twice = once.clone();
        let second = resolve(&mut twice, &table);
        assert_eq!(twice, once);
        assert!(second.is_noop());
    }

    #[test]
    fn test_resolve_leaves_no_duplicates_but_deferred() {
        let mut snapshot = legacy_duplicates();
        resolve(&mut snapshot, &ConflictTable::historical());
        let dups = query::duplicates(&snapshot);
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].scope, Scope::Member);
    }

    #[test]
    fn test_resolve_reports_unknown_duplicates() {
        let mut snapshot = Snapshot::new()
            .with_class(Class::new("Workspace"))
            .with_class(Class::new("Workspace"));
        let resolution = resolve(&mut snapshot, &ConflictTable::historical());
        assert_eq!(snapshot.classes.len(), 2);
        assert_eq!(resolution.unresolved.len(), 1);
        assert_eq!(resolution.unresolved[0].name, "Workspace");
        assert_eq!(resolution.unresolved[0].occurrence, 1);
    }

    #[test]
    fn test_rename_target_collision_is_reported() {
        let mut snapshot = Snapshot::new()
            .with_class(Class::new("Pages"))
            .with_class(Class::new("Pages"))
            .with_class(Class::new("StandardPages"));
        let resolution = resolve(&mut snapshot, &ConflictTable::historical());
        assert_eq!(resolution.renamed.len(), 1);
        assert_eq!(resolution.unresolved.len(), 1);
        assert_eq!(resolution.unresolved[0].name, "StandardPages");
    }

    #[test]
    fn test_table_from_file_extends_historical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conflicts.json");
        std::fs::write(
            &path,
            r#"[{"Scope": "Class", "Name": "Workspace", "Occurrence": 1, "Action": {"Rename": "Workspace2"}},
                {"Scope": "Member", "Parent": "Workspace", "Name": "Gravity", "Occurrence": 1, "Action": "Drop"}]"#,
        )
        .unwrap();

        let mut table = ConflictTable::historical();
        table.extend(ConflictTable::from_file(&path).unwrap());
        assert_eq!(table.entries().len(), 7);
        assert_eq!(
            table.lookup(Scope::Member, Some("Workspace"), "Gravity", 1),
            Some(&ConflictAction::Drop)
        );

        let mut snapshot = Snapshot::new()
            .with_class(Class::new("Workspace"))
            .with_class(Class::new("Workspace"));
        resolve(&mut snapshot, &table);
        assert_eq!(snapshot.classes[1].name, "Workspace2");
    }

    #[test]
    fn test_table_from_file_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conflicts.json");
        std::fs::write(&path, r#"{"not": "a list"}"#).unwrap();
        let err = ConflictTable::from_file(&path).unwrap_err();
        assert!(matches!(err, ReconcileError::Config(_)));
    }

    #[test]
    fn test_first_matching_entry_wins() {
        let table = ConflictTable::new()
            .with_entry(ConflictEntry::new(Scope::Enum, None, "X", 1, ConflictAction::Drop))
            .with_entry(ConflictEntry::new(
                Scope::Enum,
                None,
                "X",
                1,
                ConflictAction::Rename("Y".into()),
            ));
        assert_eq!(
            table.lookup(Scope::Enum, None, "X", 1),
            Some(&ConflictAction::Drop)
        );
        assert!(table.lookup(Scope::Enum, None, "X", 0).is_none());
    }
}

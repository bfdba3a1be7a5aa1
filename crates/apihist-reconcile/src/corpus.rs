//! Accumulated knowledge of which category each type name belongs to.

use apihist::v1::{Snapshot, TypeRef, query};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;

/// Types whose every reference was removed before the reference snapshot was
/// captured, so no later snapshot can teach the corpus about them.
const HISTORICAL: &[(&str, &str)] = &[
    // Replaced by "Class:<class>".
    ("DataType", "Object"),
    // Renamed to CFrame.
    ("DataType", "CoordinateFrame"),
    ("DataType", "SystemAddress"),
    ("Enum", "BuildPermission"),
    ("Enum", "PhysicsReceiveMethod"),
    ("Enum", "PhysicsSendMethod"),
    ("Enum", "PrismSides"),
    ("Enum", "PyramidSides"),
];

/// The category chosen for a type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inferred {
    /// First category ever registered for the name.
    pub category: String,
    /// Every known category, when there is more than one.
    pub alternatives: Vec<String>,
}

impl Inferred {
    pub fn is_ambiguous(&self) -> bool {
        !self.alternatives.is_empty()
    }
}

/// A type name registered under more than one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ambiguity {
    pub name: String,
    pub categories: Vec<String>,
}

/// Type name → categories, in registration order.
///
/// The corpus only grows. One lock guards every read and write, so a single
/// corpus can be shared by reference between worker threads.
#[derive(Debug, Default)]
pub struct TypeCorpus {
    types: Mutex<BTreeMap<String, Vec<String>>>,
}

impl TypeCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// A corpus seeded with types that no surviving snapshot references.
    pub fn historical() -> Self {
        let corpus = Self::new();
        for (category, name) in HISTORICAL {
            corpus.register(&TypeRef::new(*category, *name));
        }
        corpus
    }

    /// Record a categorized reference. Returns `true` if it taught the corpus
    /// something new; uncategorized or unnamed references are ignored.
    pub fn register(&self, ty: &TypeRef) -> bool {
        insert(&mut self.types.lock(), ty)
    }

    /// Register every type reference in a snapshot. Returns how many were new.
    pub fn register_snapshot(&self, snapshot: &Snapshot) -> usize {
        let mut types = self.types.lock();
        let mut added = 0;
        query::visit_types(snapshot, |ty| {
            if insert(&mut types, ty) {
                added += 1;
            }
        });
        added
    }

    /// Known categories for a name, in registration order.
    pub fn lookup(&self, name: &str) -> Vec<String> {
        self.types.lock().get(name).cloned().unwrap_or_default()
    }

    pub fn best(&self, name: &str) -> Option<Inferred> {
        let types = self.types.lock();
        let categories = types.get(name)?;
        let category = categories.first()?.clone();
        let alternatives = if categories.len() > 1 {
            categories.clone()
        } else {
            Vec::new()
        };
        Some(Inferred {
            category,
            alternatives,
        })
    }

    pub fn ambiguities(&self) -> Vec<Ambiguity> {
        self.types
            .lock()
            .iter()
            .filter(|(_, categories)| categories.len() > 1)
            .map(|(name, categories)| Ambiguity {
                name: name.clone(),
                categories: categories.clone(),
            })
            .collect()
    }

    /// Number of distinct type names.
    pub fn len(&self) -> usize {
        self.types.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.lock().is_empty()
    }

    /// Every name with its categories, sorted by name.
    pub fn entries(&self) -> Vec<(String, Vec<String>)> {
        self.types
            .lock()
            .iter()
            .map(|(name, categories)| (name.clone(), categories.clone()))
            .collect()
    }
}

fn insert(types: &mut BTreeMap<String, Vec<String>>, ty: &TypeRef) -> bool {
    if ty.category.is_empty() || ty.name.is_empty() {
        return false;
    }
    let categories = types.entry(ty.name.clone()).or_default();
    if categories.iter().any(|c| *c == ty.category) {
        return false;
    }
    categories.push(ty.category.clone());
    true
}

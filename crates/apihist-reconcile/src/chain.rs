//! Frozen snapshots and the nearest-first chain used as correction reference.

use apihist::v1::{Class, Enum, EnumItem, Member, MemberKind, Snapshot};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_MAX_CHAIN_DEPTH: usize = 1024;

/// A corrected snapshot that will never change again.
///
/// Name indices are built once, at freeze time. Only shared access is handed
/// out, so correcting an older build cannot touch it.
#[derive(Debug)]
pub struct FrozenSnapshot {
    label: String,
    snapshot: Snapshot,
    classes: HashMap<String, usize>,
    enums: HashMap<String, usize>,
}

impl FrozenSnapshot {
    pub fn freeze(label: impl Into<String>, snapshot: Snapshot) -> Arc<Self> {
        let mut classes = HashMap::with_capacity(snapshot.classes.len());
        for (i, class) in snapshot.classes.iter().enumerate() {
            classes.entry(class.name.clone()).or_insert(i);
        }
        let mut enums = HashMap::with_capacity(snapshot.enums.len());
        for (i, enumeration) in snapshot.enums.iter().enumerate() {
            enums.entry(enumeration.name.clone()).or_insert(i);
        }
        Arc::new(Self {
            label: label.into(),
            snapshot,
            classes,
            enums,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn class(&self, name: &str) -> Option<&Class> {
        self.classes.get(name).map(|&i| &self.snapshot.classes[i])
    }

    pub fn enumeration(&self, name: &str) -> Option<&Enum> {
        self.enums.get(name).map(|&i| &self.snapshot.enums[i])
    }
}

/// Reference snapshots, nearest first, ending with the pinned baseline.
///
/// Recent snapshots are bounded by `max_depth`; the oldest-pushed one is
/// evicted first. The baseline is never evicted.
#[derive(Debug, Clone)]
pub struct ReferenceChain {
    recent: VecDeque<Arc<FrozenSnapshot>>,
    baseline: Option<Arc<FrozenSnapshot>>,
    max_depth: usize,
}

impl Default for ReferenceChain {
    fn default() -> Self {
        Self::empty()
    }
}

impl ReferenceChain {
    pub fn new(baseline: Arc<FrozenSnapshot>) -> Self {
        Self {
            baseline: Some(baseline),
            ..Self::empty()
        }
    }

    /// A chain with nothing to consult.
    pub fn empty() -> Self {
        Self {
            recent: VecDeque::new(),
            baseline: None,
            max_depth: DEFAULT_MAX_CHAIN_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self.recent.truncate(max_depth);
        self
    }

    /// Make `frozen` the nearest reference.
    pub fn push(&mut self, frozen: Arc<FrozenSnapshot>) {
        if self.max_depth == 0 {
            return;
        }
        debug!("Chain now starts at {}", frozen.label());
        self.recent.push_front(frozen);
        if self.recent.len() > self.max_depth {
            if let Some(evicted) = self.recent.pop_back() {
                debug!("Evicted {} from the chain", evicted.label());
            }
        }
    }

    pub fn baseline(&self) -> Option<&FrozenSnapshot> {
        self.baseline.as_deref()
    }

    /// Number of snapshots consulted, baseline included.
    pub fn len(&self) -> usize {
        self.recent.len() + usize::from(self.baseline.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshots nearest-first.
    pub fn iter(&self) -> impl Iterator<Item = &FrozenSnapshot> {
        self.recent.iter().map(|frozen| &**frozen).chain(self.baseline.as_deref())
    }

    pub fn find_class(&self, name: &str) -> Option<&Class> {
        self.iter().find_map(|frozen| frozen.class(name))
    }

    /// Nearest member of the same name and kind under a class of the same
    /// name. A snapshot that has the class but not the member is skipped.
    pub fn find_member(&self, class: &str, name: &str, kind: MemberKind) -> Option<&Member> {
        self.iter()
            .find_map(|frozen| frozen.class(class)?.member_of_kind(name, kind))
    }

    pub fn find_enum(&self, name: &str) -> Option<&Enum> {
        self.iter().find_map(|frozen| frozen.enumeration(name))
    }

    pub fn find_enum_item(&self, enumeration: &str, name: &str) -> Option<&EnumItem> {
        self.iter()
            .find_map(|frozen| frozen.enumeration(enumeration)?.item(name))
    }

    /// Enum list of the nearest snapshot that has any.
    pub fn nearest_enums(&self) -> Option<&[Enum]> {
        self.iter()
            .map(|frozen| frozen.snapshot().enums.as_slice())
            .find(|enums| !enums.is_empty())
    }
}

//! Driving the reconciliation of a whole build history.

use crate::archive::Archive;
use crate::builds::{self, Build, Version};
use crate::chain::{DEFAULT_MAX_CHAIN_DEPTH, FrozenSnapshot, ReferenceChain};
use crate::conflicts::{self, ConflictTable, Resolution, UnresolvedConflict};
use crate::corpus::{Ambiguity, TypeCorpus};
use crate::correct::{self, AmbiguousType, CorrectionReport, UnresolvedType};
use crate::error::Result;
use apihist::v1::Snapshot;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use tracing::{debug, info, warn};

/// Turns acquired bytes into an uncorrected snapshot.
pub trait Materializer: Sync {
    fn materialize(&self, bytes: &[u8]) -> Result<Snapshot>;
}

/// Reads the legacy text dump format.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyDumpMaterializer;

impl Materializer for LegacyDumpMaterializer {
    fn materialize(&self, bytes: &[u8]) -> Result<Snapshot> {
        Ok(apihist_legacy::read_snapshot(bytes)?)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// One build at a time; each corrected build joins the chain.
    #[default]
    Sequential,
    /// Builds in parallel, each against the baseline only.
    Parallel,
}

// ============================================================================
// Reports
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BuildStatus {
    Converted,
    Skipped { reason: String },
    PersistFailed { reason: String },
}

/// What happened to one build.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildOutcome {
    pub hash: String,
    pub version: Version,
    pub date: DateTime<Utc>,
    #[serde(flatten)]
    pub status: BuildStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unresolved_conflicts: Vec<UnresolvedConflict>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unresolved_types: Vec<UnresolvedType>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ambiguous_types: Vec<AmbiguousType>,
}

impl BuildOutcome {
    fn new(build: &Build, status: BuildStatus) -> Self {
        Self {
            hash: build.hash.clone(),
            version: build.version,
            date: build.date,
            status,
            unresolved_conflicts: Vec::new(),
            unresolved_types: Vec::new(),
            ambiguous_types: Vec::new(),
        }
    }

    /// The corrected snapshot exists, whether or not it was stored.
    pub fn is_corrected(&self) -> bool {
        !matches!(self.status, BuildStatus::Skipped { .. })
    }
}

/// Outcome of a whole run, one entry per build in processing order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub mode: Mode,
    pub builds: Vec<BuildOutcome>,
    /// Type names the corpus ended up knowing under several categories.
    pub ambiguities: Vec<Ambiguity>,
}

impl RunReport {
    fn count(&self, f: impl Fn(&BuildStatus) -> bool) -> usize {
        self.builds.iter().filter(|b| f(&b.status)).count()
    }

    pub fn converted(&self) -> usize {
        self.count(|s| matches!(s, BuildStatus::Converted))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, BuildStatus::Skipped { .. }))
    }

    pub fn persist_failed(&self) -> usize {
        self.count(|s| matches!(s, BuildStatus::PersistFailed { .. }))
    }
}

/// Result of reconciling one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reconciled {
    pub resolution: Resolution,
    pub correction: CorrectionReport,
}

/// Resolve conflicts, register types, then correct: the per-snapshot core of
/// a run, usable on its own.
pub fn reconcile(
    snapshot: &mut Snapshot,
    chain: &ReferenceChain,
    corpus: &TypeCorpus,
    table: &ConflictTable,
) -> Reconciled {
    let resolution = conflicts::resolve(snapshot, table);
    corpus.register_snapshot(snapshot);
    let correction = correct::correct(snapshot, chain, corpus);
    Reconciled {
        resolution,
        correction,
    }
}

// ============================================================================
// Sequencer
// ============================================================================

/// Orders builds newest first and reconciles each against its reference
/// chain.
///
/// # Example
///
/// ```rust,no_run
/// use apihist::v1::Snapshot;
/// use apihist_reconcile::{BuildList, BuildSequencer, DirArchive};
/// use std::path::Path;
///
/// let reference = Snapshot::from_json(&std::fs::read_to_string("stable.json")?)?;
/// let builds = BuildList::load(Path::new("builds.json"))?;
/// let archive = DirArchive::new("data/api-dump/txt", "data/api-dump/json");
/// archive.prepare()?;
///
/// let report = BuildSequencer::new(archive, reference)
///     .with_build_kind(Some("Player".into()))
///     .run(&builds.builds);
/// println!("{} converted, {} skipped", report.converted(), report.skipped());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct BuildSequencer<A, M = LegacyDumpMaterializer> {
    archive: A,
    materializer: M,
    corpus: TypeCorpus,
    baseline: Arc<FrozenSnapshot>,
    table: ConflictTable,
    build_kind: Option<String>,
    mode: Mode,
    workers: usize,
    max_chain_depth: usize,
}

impl<A: Archive> BuildSequencer<A> {
    /// A sequencer whose corpus is seeded with historical types and
    /// everything the reference snapshot mentions.
    pub fn new(archive: A, reference: Snapshot) -> Self {
        let corpus = TypeCorpus::historical();
        corpus.register_snapshot(&reference);
        Self {
            archive,
            materializer: LegacyDumpMaterializer,
            corpus,
            baseline: FrozenSnapshot::freeze("reference", reference),
            table: ConflictTable::historical(),
            build_kind: None,
            mode: Mode::Sequential,
            workers: thread::available_parallelism().map_or(1, |n| n.get()),
            max_chain_depth: DEFAULT_MAX_CHAIN_DEPTH,
        }
    }
}

impl<A: Archive, M: Materializer> BuildSequencer<A, M> {
    pub fn with_materializer<N: Materializer>(self, materializer: N) -> BuildSequencer<A, N> {
        BuildSequencer {
            archive: self.archive,
            materializer,
            corpus: self.corpus,
            baseline: self.baseline,
            table: self.table,
            build_kind: self.build_kind,
            mode: self.mode,
            workers: self.workers,
            max_chain_depth: self.max_chain_depth,
        }
    }

    pub fn with_conflict_table(mut self, table: ConflictTable) -> Self {
        self.table = table;
        self
    }

    /// Only process builds of this kind; builds without a kind always pass.
    pub fn with_build_kind(mut self, kind: Option<String>) -> Self {
        self.build_kind = kind;
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_max_chain_depth(mut self, depth: usize) -> Self {
        self.max_chain_depth = depth;
        self
    }

    pub fn corpus(&self) -> &TypeCorpus {
        &self.corpus
    }

    pub fn archive(&self) -> &A {
        &self.archive
    }

    /// Reconcile every eligible build, newest first.
    pub fn run(&self, builds: &[Build]) -> RunReport {
        let ordered = builds::order(builds, self.build_kind.as_deref());
        info!(
            "Reconciling {} of {} builds ({:?})",
            ordered.len(),
            builds.len(),
            self.mode
        );
        let outcomes = match self.mode {
            Mode::Sequential => self.run_sequential(&ordered),
            Mode::Parallel => self.run_parallel(&ordered),
        };
        RunReport {
            mode: self.mode,
            builds: outcomes,
            ambiguities: self.corpus.ambiguities(),
        }
    }

    fn run_sequential(&self, ordered: &[Build]) -> Vec<BuildOutcome> {
        let mut chain =
            ReferenceChain::new(Arc::clone(&self.baseline)).with_max_depth(self.max_chain_depth);
        let mut outcomes = Vec::with_capacity(ordered.len());
        for build in ordered {
            let (outcome, snapshot) = self.process(build, &chain);
            if let Some(snapshot) = snapshot {
                chain.push(FrozenSnapshot::freeze(build.hash.as_str(), snapshot));
                debug!("Reference chain holds {} snapshots", chain.len());
            }
            outcomes.push(outcome);
        }
        outcomes
    }

    fn run_parallel(&self, ordered: &[Build]) -> Vec<BuildOutcome> {
        let chain = ReferenceChain::new(Arc::clone(&self.baseline));
        let cursor = AtomicUsize::new(0);
        let slots: Mutex<Vec<Option<BuildOutcome>>> = Mutex::new(vec![None; ordered.len()]);
        let workers = self.workers.min(ordered.len()).max(1);

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(workers);
            for _ in 0..workers {
                let (chain, cursor, slots) = (&chain, &cursor, &slots);
                handles.push(scope.spawn(move || {
                    loop {
                        let index = cursor.fetch_add(1, Ordering::Relaxed);
                        let Some(build) = ordered.get(index) else {
                            break;
                        };
                        let (outcome, _) = self.process(build, chain);
                        slots.lock()[index] = Some(outcome);
                    }
                }));
            }
            for handle in handles {
                if let Err(panic) = handle.join() {
                    std::panic::resume_unwind(panic);
                }
            }
        });

        slots.into_inner().into_iter().flatten().collect()
    }

    /// Acquire, materialize, reconcile and persist one build. The snapshot is
    /// returned whenever correction happened, even if persisting failed.
    fn process(&self, build: &Build, chain: &ReferenceChain) -> (BuildOutcome, Option<Snapshot>) {
        let acquired = self
            .archive
            .acquire(build)
            .and_then(|bytes| self.materializer.materialize(&bytes));
        let mut snapshot = match acquired {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Skipping build {} ({}): {}", build.hash, build.version, e);
                let status = BuildStatus::Skipped {
                    reason: e.to_string(),
                };
                return (BuildOutcome::new(build, status), None);
            }
        };

        let reconciled = reconcile(&mut snapshot, chain, &self.corpus, &self.table);

        let status = match self.archive.persist(build, &snapshot) {
            Ok(()) => {
                info!(
                    "Converted build {} ({}): {} unresolved types",
                    build.hash,
                    build.version,
                    reconciled.correction.unresolved_types.len()
                );
                BuildStatus::Converted
            }
            Err(e) => {
                warn!("Failed to persist build {}: {}", build.hash, e);
                BuildStatus::PersistFailed {
                    reason: e.to_string(),
                }
            }
        };

        let mut outcome = BuildOutcome::new(build, status);
        outcome.unresolved_conflicts = reconciled.resolution.unresolved;
        outcome.unresolved_types = reconciled.correction.unresolved_types;
        outcome.ambiguous_types = reconciled.correction.ambiguous_types;
        (outcome, Some(snapshot))
    }
}

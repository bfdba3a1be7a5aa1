#![doc = include_str!("../README.md")]

pub mod archive;
pub mod builds;
pub mod chain;
pub mod config;
pub mod conflicts;
pub mod corpus;
pub mod correct;
pub mod error;
pub mod sequence;

pub use archive::{Archive, DirArchive};
pub use builds::{Build, BuildList, Version};
pub use chain::{DEFAULT_MAX_CHAIN_DEPTH, FrozenSnapshot, ReferenceChain};
pub use config::{ReconcileConfig, run};
pub use conflicts::{
    ConflictAction, ConflictEntry, ConflictSite, ConflictTable, Renamed, Resolution,
    UnresolvedConflict, resolve,
};
pub use corpus::{Ambiguity, Inferred, TypeCorpus};
pub use correct::{AmbiguousType, CorrectionReport, UnresolvedType, correct};
pub use error::{ReconcileError, Result};
pub use sequence::{
    BuildOutcome, BuildSequencer, BuildStatus, LegacyDumpMaterializer, Materializer, Mode,
    Reconciled, RunReport, reconcile,
};

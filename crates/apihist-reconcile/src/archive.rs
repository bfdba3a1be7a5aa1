//! Where legacy dumps come from and where corrected snapshots go.

use crate::builds::Build;
use crate::error::{ReconcileError, Result};
use apihist::v1::Snapshot;
use std::fs;
use std::path::{Path, PathBuf};

/// Source of legacy dumps and sink for corrected snapshots.
pub trait Archive: Sync {
    /// Raw legacy dump bytes for a build.
    fn acquire(&self, build: &Build) -> Result<Vec<u8>>;

    /// Store a corrected snapshot for a build.
    fn persist(&self, build: &Build, snapshot: &Snapshot) -> Result<()>;
}

/// Directory-backed archive: reads `<input>/<hash>.txt`, writes
/// `<output>/<hash>.json`.
#[derive(Debug, Clone)]
pub struct DirArchive {
    input_dir: PathBuf,
    output_dir: PathBuf,
    pretty: bool,
}

impl DirArchive {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            pretty: false,
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn input_path(&self, hash: &str) -> PathBuf {
        self.input_dir.join(format!("{hash}.txt"))
    }

    pub fn output_path(&self, hash: &str) -> PathBuf {
        self.output_dir.join(format!("{hash}.json"))
    }

    /// Create the output directory.
    pub fn prepare(&self) -> Result<()> {
        fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    /// Read back a snapshot written by [`Archive::persist`].
    pub fn load_persisted(&self, build: &Build) -> Result<Snapshot> {
        let bytes = fs::read(self.output_path(&build.hash))?;
        Ok(Snapshot::from_slice(&bytes)?)
    }
}

impl Archive for DirArchive {
    fn acquire(&self, build: &Build) -> Result<Vec<u8>> {
        fs::read(self.input_path(&build.hash)).map_err(|source| ReconcileError::Acquire {
            hash: build.hash.clone(),
            source,
        })
    }

    fn persist(&self, build: &Build, snapshot: &Snapshot) -> Result<()> {
        let persist_err = |source: std::io::Error| ReconcileError::Persist {
            hash: build.hash.clone(),
            source,
        };
        let json = if self.pretty {
            snapshot.to_json_pretty()
        } else {
            snapshot.to_json()
        }
        .map_err(|e| persist_err(e.into()))?;
        fs::write(self.output_path(&build.hash), json).map_err(persist_err)
    }
}

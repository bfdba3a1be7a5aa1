use anyhow::{Context, Result};
use apihist::v1::query::{self, Duplicate};
use apihist_reconcile::{BuildList, DirArchive, Version};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Duplicates remaining in one persisted snapshot.
#[derive(Debug, Serialize)]
pub struct BuildConflicts {
    pub hash: String,
    pub version: Version,
    pub duplicates: Vec<Duplicate>,
}

/// Scan the persisted snapshot of every listed build, newest first. Builds
/// with no persisted snapshot are skipped.
pub fn scan(builds: &Path, dir: &Path, kind: Option<&str>) -> Result<Vec<BuildConflicts>> {
    let list = BuildList::load(builds).with_context(|| format!("Failed to load {:?}", builds))?;
    let archive = DirArchive::new(dir, dir);

    let mut found = Vec::new();
    for build in list.ordered(kind) {
        if !archive.output_path(&build.hash).exists() {
            debug!("No snapshot for build {}", build.hash);
            continue;
        }
        let snapshot = archive
            .load_persisted(&build)
            .with_context(|| format!("Failed to read snapshot for {}", build.hash))?;
        let duplicates = query::duplicates(&snapshot);
        if !duplicates.is_empty() {
            found.push(BuildConflicts {
                hash: build.hash,
                version: build.version,
                duplicates,
            });
        }
    }
    Ok(found)
}

pub fn run(builds: PathBuf, dir: PathBuf, kind: Option<String>, pretty: bool) -> Result<()> {
    let found = scan(&builds, &dir, kind.as_deref())?;
    println!("{}", crate::to_json(&found, pretty)?);
    Ok(())
}

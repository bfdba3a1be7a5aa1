//! Run configuration, loadable from a JSON file.

use crate::archive::DirArchive;
use crate::builds::BuildList;
use crate::chain::DEFAULT_MAX_CHAIN_DEPTH;
use crate::conflicts::ConflictTable;
use crate::error::{ReconcileError, Result};
use crate::sequence::{BuildSequencer, Mode, RunReport};
use apihist::v1::Snapshot;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::thread;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Current snapshot used as baseline and corpus seed.
    pub reference: PathBuf,
    pub builds: PathBuf,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// `None` processes every kind.
    pub build_kind: Option<String>,
    pub mode: Mode,
    /// Parallel workers; `None` uses the available parallelism.
    pub workers: Option<usize>,
    pub max_chain_depth: usize,
    /// Extra conflict entries, applied after the historical ones.
    pub conflict_table: Option<PathBuf>,
    pub pretty: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            reference: PathBuf::from("stable.json"),
            builds: PathBuf::from("builds.json"),
            input_dir: PathBuf::from("data/api-dump/txt"),
            output_dir: PathBuf::from("data/api-dump/json"),
            build_kind: Some("Player".to_string()),
            mode: Mode::Sequential,
            workers: None,
            max_chain_depth: DEFAULT_MAX_CHAIN_DEPTH,
            conflict_table: None,
            pretty: false,
        }
    }
}

impl ReconcileConfig {
    /// Read a configuration file; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ReconcileError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&text)
            .map_err(|e| ReconcileError::Config(format!("invalid config {}: {}", path.display(), e)))
    }

    pub fn worker_count(&self) -> usize {
        self.workers
            .unwrap_or_else(|| thread::available_parallelism().map_or(1, |n| n.get()))
            .max(1)
    }

    /// Historical entries, then those from `conflict_table`.
    pub fn conflict_table(&self) -> Result<ConflictTable> {
        let mut table = ConflictTable::historical();
        if let Some(path) = &self.conflict_table {
            table.extend(ConflictTable::from_file(path)?);
        }
        Ok(table)
    }

    pub fn load_reference(&self) -> Result<Snapshot> {
        let reference_err = |message: String| ReconcileError::Reference {
            path: self.reference.clone(),
            message,
        };
        let text = std::fs::read_to_string(&self.reference).map_err(|e| reference_err(e.to_string()))?;
        Snapshot::from_json(&text).map_err(|e| reference_err(e.to_string()))
    }

    pub fn load_builds(&self) -> Result<BuildList> {
        BuildList::load(&self.builds)
    }

    pub fn archive(&self) -> DirArchive {
        DirArchive::new(&self.input_dir, &self.output_dir).with_pretty(self.pretty)
    }

    /// Sequencer over the directory archive, with the reference loaded.
    pub fn sequencer(&self) -> Result<BuildSequencer<DirArchive>> {
        let archive = self.archive();
        archive.prepare()?;
        Ok(BuildSequencer::new(archive, self.load_reference()?)
            .with_conflict_table(self.conflict_table()?)
            .with_build_kind(self.build_kind.clone())
            .with_mode(self.mode)
            .with_workers(self.worker_count())
            .with_max_chain_depth(self.max_chain_depth))
    }
}

/// Load everything the configuration names and reconcile the build list.
///
/// A missing reference or unreadable build list fails the whole run;
/// individual build failures only show up in the report.
pub fn run(config: &ReconcileConfig) -> Result<RunReport> {
    let sequencer = config.sequencer()?;
    let builds = config.load_builds()?;
    Ok(sequencer.run(&builds.builds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::BuildStatus;
    use serde_json::json;
    use std::fs;

    fn write_fixture(dir: &Path) -> ReconcileConfig {
        let reference = json!({
            "Classes": [{
                "Name": "Part",
                "Superclass": "BasePart",
                "Members": [{
                    "MemberType": "Property",
                    "Name": "Size",
                    "ValueType": {"Category": "DataType", "Name": "Vector3"}
                }]
            }],
            "Enums": []
        });
        fs::write(dir.join("stable.json"), reference.to_string()).unwrap();

        let builds = json!({
            "Schema": 1,
            "Domain": "api.roblox.com",
            "Builds": [
                {"Type": "Player", "Hash": "version-aa", "Date": "2010-03-01T12:00:00Z", "Version": "0.1.2.3"},
                {"Type": "Player", "Hash": "version-bb", "Date": "2010-04-01T12:00:00Z", "Version": "0.1.3.0"},
                {"Type": "Studio", "Hash": "version-cc", "Date": "2010-05-01T12:00:00Z", "Version": "0.1.3.1"}
            ]
        });
        fs::write(dir.join("builds.json"), builds.to_string()).unwrap();

        let input = dir.join("txt");
        fs::create_dir_all(&input).unwrap();
        fs::write(
            input.join("version-bb.txt"),
            "Class Part\n\tProperty Vector3 Part.Size\n\tProperty Vector3 Part.Velocity\n",
        )
        .unwrap();

        ReconcileConfig {
            reference: dir.join("stable.json"),
            builds: dir.join("builds.json"),
            input_dir: input,
            output_dir: dir.join("json"),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = ReconcileConfig::default();
        assert_eq!(config.reference, PathBuf::from("stable.json"));
        assert_eq!(config.build_kind.as_deref(), Some("Player"));
        assert_eq!(config.mode, Mode::Sequential);
        assert_eq!(config.max_chain_depth, 1024);
        assert!(config.worker_count() >= 1);
    }

    #[test]
    fn test_from_file_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"mode": "parallel", "workers": 3, "build_kind": null}"#).unwrap();

        let config = ReconcileConfig::from_file(&path).unwrap();
        assert_eq!(config.mode, Mode::Parallel);
        assert_eq!(config.worker_count(), 3);
        assert_eq!(config.build_kind, None);
        assert_eq!(config.output_dir, PathBuf::from("data/api-dump/json"));
    }

    #[test]
    fn test_from_file_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"mode": "sideways"}"#).unwrap();
        let err = ReconcileConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ReconcileError::Config(_)));

        let missing = ReconcileConfig::from_file(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(missing, ReconcileError::Config(_)));
    }

    #[test]
    fn test_conflict_table_extends_historical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conflicts.json");
        fs::write(
            &path,
            r#"[{"Scope": "Enum", "Name": "Material", "Occurrence": 1, "Action": "Drop"}]"#,
        )
        .unwrap();
        let config = ReconcileConfig {
            conflict_table: Some(path),
            ..Default::default()
        };
        let table = config.conflict_table().unwrap();
        assert_eq!(
            table.entries().len(),
            ConflictTable::historical().entries().len() + 1
        );
    }

    #[test]
    fn test_missing_reference_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = ReconcileConfig {
            reference: dir.path().join("stable.json"),
            output_dir: dir.path().join("json"),
            ..Default::default()
        };
        let err = run(&config).unwrap_err();
        assert!(matches!(err, ReconcileError::Reference { .. }));
    }

    #[test]
    fn test_run_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_fixture(dir.path());
        let report = run(&config).unwrap();

        // Studio build filtered out; version-aa has no dump.
        assert_eq!(report.builds.len(), 2);
        assert_eq!(report.builds[0].hash, "version-bb");
        assert_eq!(report.builds[0].status, BuildStatus::Converted);
        assert!(matches!(report.builds[1].status, BuildStatus::Skipped { .. }));

        let archive = config.archive();
        let written = fs::read_to_string(archive.output_path("version-bb")).unwrap();
        let snapshot = Snapshot::from_json(&written).unwrap();
        let part = snapshot.class("Part").unwrap();
        assert_eq!(part.superclass, "BasePart");
        let velocity = part.member("Velocity").and_then(|m| m.as_property()).unwrap();
        assert_eq!(velocity.value_type.category, "DataType");
    }

    #[test]
    fn test_run_parallel_matches_sequential_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = write_fixture(dir.path());
        let sequential = run(&config).unwrap();
        let first = fs::read_to_string(config.archive().output_path("version-bb")).unwrap();

        config.mode = Mode::Parallel;
        config.workers = Some(2);
        let parallel = run(&config).unwrap();
        let second = fs::read_to_string(config.archive().output_path("version-bb")).unwrap();

        assert_eq!(parallel.mode, Mode::Parallel);
        assert_eq!(parallel.builds, sequential.builds);
        assert_eq!(first, second);
    }
}

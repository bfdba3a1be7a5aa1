use anyhow::{Context, Result};
use apihist::v1::Snapshot;
use apihist_reconcile::{
    ConflictTable, FrozenSnapshot, Reconciled, ReferenceChain, TypeCorpus, reconcile,
};
use std::path::{Path, PathBuf};
use tracing::info;

fn read_reference(path: &Path) -> Result<Snapshot> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    Snapshot::from_json(&content).with_context(|| format!("Failed to parse {:?}", path))
}

/// Correct one legacy dump against the reference alone.
pub fn convert(input: &Path, reference: &Path) -> Result<(Snapshot, Reconciled)> {
    let reference = read_reference(reference)?;
    let bytes = std::fs::read(input).with_context(|| format!("Failed to read {:?}", input))?;
    let mut snapshot = apihist_legacy::read_snapshot(&bytes)
        .with_context(|| format!("Failed to parse legacy dump {:?}", input))?;

    let corpus = TypeCorpus::historical();
    corpus.register_snapshot(&reference);
    let chain = ReferenceChain::new(FrozenSnapshot::freeze("reference", reference));
    let reconciled = reconcile(&mut snapshot, &chain, &corpus, &ConflictTable::historical());

    info!(
        "Corrected {:?}: {} renamed, {} unresolved types",
        input,
        reconciled.resolution.renamed.len(),
        reconciled.correction.unresolved_types.len()
    );
    Ok((snapshot, reconciled))
}

pub fn run(input: PathBuf, reference: PathBuf, output: Option<PathBuf>, pretty: bool) -> Result<()> {
    let (snapshot, _) = convert(&input, &reference)?;
    let json = crate::to_json(&snapshot, pretty)?;
    match output {
        Some(path) => {
            std::fs::write(&path, json).with_context(|| format!("Failed to write {:?}", path))?
        }
        None => println!("{}", json),
    }
    Ok(())
}

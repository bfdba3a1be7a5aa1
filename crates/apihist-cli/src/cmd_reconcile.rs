use anyhow::{Context, Result};
use apihist_reconcile::{Mode, ReconcileConfig, RunReport};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug, Default)]
pub struct ReconcileArgs {
    /// Configuration file (JSON); flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Reference snapshot
    #[arg(long)]
    pub reference: Option<PathBuf>,

    /// Build list
    #[arg(long)]
    pub builds: Option<PathBuf>,

    /// Directory of legacy dumps (<hash>.txt)
    #[arg(long)]
    pub input_dir: Option<PathBuf>,

    /// Directory for corrected snapshots (<hash>.json)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Only process builds of this kind
    #[arg(long, conflicts_with = "all_kinds")]
    pub kind: Option<String>,

    /// Process builds of every kind
    #[arg(long)]
    pub all_kinds: bool,

    /// Correct builds concurrently against the reference only
    #[arg(long)]
    pub parallel: bool,

    /// Worker threads in parallel mode
    #[arg(long)]
    pub workers: Option<usize>,

    /// Recent snapshots kept in the reference chain
    #[arg(long)]
    pub max_chain_depth: Option<usize>,

    /// Extra conflict entries (JSON)
    #[arg(long)]
    pub conflict_table: Option<PathBuf>,
}

impl ReconcileArgs {
    /// Persisted snapshots follow the config's `pretty`; the global flag only
    /// formats stdout.
    pub fn to_config(&self) -> Result<ReconcileConfig> {
        let mut config = match &self.config {
            Some(path) => ReconcileConfig::from_file(path)
                .with_context(|| format!("Failed to load config {:?}", path))?,
            None => ReconcileConfig::default(),
        };
        if let Some(p) = &self.reference {
            config.reference = p.clone();
        }
        if let Some(p) = &self.builds {
            config.builds = p.clone();
        }
        if let Some(p) = &self.input_dir {
            config.input_dir = p.clone();
        }
        if let Some(p) = &self.output_dir {
            config.output_dir = p.clone();
        }
        if self.all_kinds {
            config.build_kind = None;
        } else if let Some(kind) = &self.kind {
            config.build_kind = Some(kind.clone());
        }
        if self.parallel {
            config.mode = Mode::Parallel;
        }
        if self.workers.is_some() {
            config.workers = self.workers;
        }
        if let Some(depth) = self.max_chain_depth {
            config.max_chain_depth = depth;
        }
        if let Some(p) = &self.conflict_table {
            config.conflict_table = Some(p.clone());
        }
        Ok(config)
    }
}

pub fn reconcile(args: &ReconcileArgs) -> Result<RunReport> {
    let config = args.to_config()?;
    let report = apihist_reconcile::run(&config).context("Reconciliation failed")?;
    info!(
        "{} converted, {} skipped, {} not persisted",
        report.converted(),
        report.skipped(),
        report.persist_failed()
    );
    Ok(report)
}

pub fn run(args: ReconcileArgs, pretty: bool) -> Result<()> {
    let report = reconcile(&args)?;
    println!("{}", crate::to_json(&report, pretty)?);
    Ok(())
}

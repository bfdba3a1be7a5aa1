mod cmd_conflicts;
mod cmd_convert;
mod cmd_reconcile;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "apihist")]
#[command(about = "Reconcile, convert, and audit historical API dumps")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Log level when RUST_LOG is unset
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Correct a whole build history against the reference snapshot
    Reconcile(cmd_reconcile::ReconcileArgs),
    /// Correct a single legacy dump against a reference snapshot
    Convert {
        /// Legacy dump file
        #[arg(short, long)]
        input: PathBuf,

        /// Reference snapshot (JSON)
        #[arg(short, long)]
        reference: PathBuf,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List duplicate names left in persisted snapshots
    Conflicts {
        /// Build list (JSON)
        #[arg(short, long)]
        builds: PathBuf,

        /// Directory of persisted snapshots
        #[arg(short, long)]
        dir: PathBuf,

        /// Only scan builds of this kind
        #[arg(long)]
        kind: Option<String>,
    },
}

/// Logs go to stderr so JSON on stdout stays clean.
fn init_tracing(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

pub(crate) fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level);

    match cli.command {
        Commands::Reconcile(args) => cmd_reconcile::run(args, cli.pretty),
        Commands::Convert {
            input,
            reference,
            output,
        } => cmd_convert::run(input, reference, output, cli.pretty),
        Commands::Conflicts { builds, dir, kind } => cmd_conflicts::run(builds, dir, kind, cli.pretty),
    }
}

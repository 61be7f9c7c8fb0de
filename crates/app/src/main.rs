use anyhow::{Context, Result};
use clap::Parser;
use tally_core::Manifest;
use tally_import::{write_reports, StatementCompiler};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{CliArgs, ManifestSource};

fn main() -> Result<()> {
    let args = CliArgs::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    std::fs::create_dir_all(&args.data_dir).with_context(|| {
        format!("Failed to create data directory {}", args.data_dir.display())
    })?;

    let manifest = match args.manifest_source() {
        ManifestSource::File(path) => {
            tracing::info!("Loading bank manifest from {}", path.display());
            Manifest::load(&path)
                .with_context(|| format!("Failed to load manifest {}", path.display()))?
        }
        ManifestSource::Builtin => {
            Manifest::builtin().context("Built-in manifest is invalid")?
        }
    };

    let compiler = StatementCompiler::new(manifest).context("Invalid pattern in manifest")?;
    tracing::debug!("{} bank manifests loaded", compiler.manifest().banks.len());

    let outputs = args.outputs();
    let compilation = compiler
        .compile_dir(&args.data_dir, &outputs)
        .with_context(|| format!("Failed to scan {}", args.data_dir.display()))?;

    write_reports(&args.data_dir, &outputs, &compilation.transactions)
        .context("Failed to write reports")?;

    let summary = &compilation.summary;
    tracing::info!(
        matched = summary.files_matched,
        unmatched = summary.files_unmatched,
        failed = summary.files_failed,
        filtered = summary.rows_skipped,
        transactions = summary.transactions,
        "Compilation finished"
    );

    Ok(())
}

use clap::Parser;
use std::path::{Path, PathBuf};
use tally_import::OutputFiles;

/// Compile bank statement exports into income and expense reports
#[derive(Parser, Debug)]
#[command(name = "tally")]
#[command(about = "Compile bank statement CSV exports into income and expense reports", long_about = None)]
pub struct CliArgs {
    /// Directory holding the statement exports; reports are written here too
    #[arg(long = "data-dir", value_name = "DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Bank manifest (JSON or TOML)
    #[arg(long, value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    #[arg(long = "income-file", value_name = "NAME", default_value = "Compiled Income.csv")]
    pub income_file: String,

    #[arg(long = "expenses-file", value_name = "NAME", default_value = "Compiled expenses.csv")]
    pub expenses_file: String,

    /// Log filtered rows and other detail
    #[arg(short, long)]
    pub verbose: bool,
}

/// Where the bank manifest comes from for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
    File(PathBuf),
    Builtin,
}

impl CliArgs {
    pub fn outputs(&self) -> OutputFiles {
        OutputFiles {
            income: self.income_file.clone(),
            expenses: self.expenses_file.clone(),
        }
    }

    /// An explicit `--manifest` wins, then `config.json` in the data
    /// directory, then the built-in manifest.
    pub fn manifest_source(&self) -> ManifestSource {
        if let Some(path) = &self.manifest {
            return ManifestSource::File(path.clone());
        }
        let default = default_manifest_path(&self.data_dir);
        if default.is_file() {
            ManifestSource::File(default)
        } else {
            ManifestSource::Builtin
        }
    }

    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

fn default_manifest_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.json")
}

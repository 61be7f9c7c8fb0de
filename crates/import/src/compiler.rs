use std::path::Path;

use tally_core::{BankManifest, Manifest, Transaction};
use thiserror::Error;
use tracing::{info, warn};

use crate::columns::{resolve_columns, ColumnError};
use crate::csv::{read_statement, CsvError};
use crate::discovery::find_statement_files;
use crate::report::OutputFiles;
use crate::rules::{BankRules, CategoryRuleEngine, RuleError};
use crate::transform::{RowError, RowOutcome, RowTransformer};

/// Why a single statement file was abandoned.
#[derive(Error, Debug)]
pub enum FileError {
    #[error(transparent)]
    Csv(#[from] CsvError),
    #[error(transparent)]
    Columns(#[from] ColumnError),
    #[error(transparent)]
    Row(#[from] RowError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileStats {
    pub emitted: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileSummary {
    pub files_matched: usize,
    pub files_unmatched: usize,
    pub files_failed: usize,
    pub rows_skipped: usize,
    pub transactions: usize,
}

#[derive(Debug, Default)]
pub struct Compilation {
    pub transactions: Vec<Transaction>,
    pub summary: CompileSummary,
}

/// Runs every statement in a directory through its bank's manifest.
///
/// Regexes are compiled once here, so a bad pattern is a startup error rather
/// than a per-file one.
pub struct StatementCompiler {
    manifest: Manifest,
    categories: CategoryRuleEngine,
    bank_rules: Vec<BankRules>,
}

impl StatementCompiler {
    pub fn new(manifest: Manifest) -> Result<Self, RuleError> {
        let categories = CategoryRuleEngine::new(&manifest.category_rules)?;
        let bank_rules = manifest
            .banks
            .iter()
            .map(BankRules::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            manifest,
            categories,
            bank_rules,
        })
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn compile_dir(&self, dir: &Path, outputs: &OutputFiles) -> std::io::Result<Compilation> {
        let mut compilation = Compilation::default();
        let summary = &mut compilation.summary;

        for path in find_statement_files(dir, &outputs.names())? {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let Some(idx) = self
                .manifest
                .banks
                .iter()
                .position(|bank| bank.matches_file_name(&file_name))
            else {
                warn!("No bank manifest matches {}, skipping", path.display());
                summary.files_unmatched += 1;
                continue;
            };

            summary.files_matched += 1;
            let bank = &self.manifest.banks[idx];
            match self.compile_file(&path, bank, &self.bank_rules[idx], &mut compilation.transactions)
            {
                Ok(stats) => summary.rows_skipped += stats.skipped,
                Err(e) => {
                    warn!("Abandoning {}: {}", path.display(), e);
                    summary.files_failed += 1;
                }
            }
        }

        summary.transactions = compilation.transactions.len();
        Ok(compilation)
    }

    /// Appends the transactions of one file to `out`.
    ///
    /// On error the rows emitted before the fault stay in `out`.
    pub fn compile_file(
        &self,
        path: &Path,
        bank: &BankManifest,
        rules: &BankRules,
        out: &mut Vec<Transaction>,
    ) -> Result<FileStats, FileError> {
        info!("Getting transactions from {} located at {}", bank.name, path.display());

        let statement = read_statement(path, bank.has_headers, bank.add_header_comma)?;
        let columns = resolve_columns(bank, statement.headers.as_deref())?;
        let transformer = RowTransformer::new(bank, rules, &self.categories, columns);

        let mut stats = FileStats::default();
        for record in &statement.records {
            match transformer.transform(record)? {
                RowOutcome::Emit(tx) => {
                    out.push(tx);
                    stats.emitted += 1;
                }
                RowOutcome::Skipped => stats.skipped += 1,
                RowOutcome::EndOfData => break,
            }
        }
        Ok(stats)
    }
}

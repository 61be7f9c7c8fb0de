use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tally_core::{Flow, Transaction};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error writing {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("CSV error writing {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
}

/// Names of the two reports, relative to the data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFiles {
    pub income: String,
    pub expenses: String,
}

impl Default for OutputFiles {
    fn default() -> Self {
        Self {
            income: "Compiled Income.csv".to_string(),
            expenses: "Compiled expenses.csv".to_string(),
        }
    }
}

impl OutputFiles {
    pub fn names(&self) -> [&str; 2] {
        [&self.income, &self.expenses]
    }
}

#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Item")]
    item: &'a str,
    #[serde(rename = "Cost")]
    cost: String,
    #[serde(rename = "Category")]
    category: &'a str,
    #[serde(rename = "Bank")]
    bank: &'a str,
}

impl<'a> From<&'a Transaction> for ReportRow<'a> {
    fn from(tx: &'a Transaction) -> Self {
        Self {
            date: tx.date.format("%Y-%m-%d").to_string(),
            item: &tx.description,
            cost: tx.amount.abs().to_string(),
            category: tx.category.as_deref().unwrap_or(""),
            bank: &tx.bank,
        }
    }
}

/// Transactions of one flow, stable-sorted by date.
pub fn partition(transactions: &[Transaction], flow: Flow) -> Vec<&Transaction> {
    let mut rows: Vec<&Transaction> = transactions
        .iter()
        .filter(|tx| tx.flow() == Some(flow))
        .collect();
    rows.sort_by_key(|tx| tx.date);
    rows
}

/// Writes the income and expense reports into `dir`.
///
/// A flow with no transactions writes nothing, leaving any file of that name
/// as it was. Returns the paths actually written.
pub fn write_reports(
    dir: &Path,
    outputs: &OutputFiles,
    transactions: &[Transaction],
) -> Result<Vec<PathBuf>, ReportError> {
    let mut written = Vec::new();
    for (flow, name) in [(Flow::Income, &outputs.income), (Flow::Expense, &outputs.expenses)] {
        let rows = partition(transactions, flow);
        if rows.is_empty() {
            continue;
        }
        let path = dir.join(name);
        write_report(&path, &rows)?;
        info!("Saved {} {:?} rows to {}", rows.len(), flow, path.display());
        written.push(path);
    }
    Ok(written)
}

fn write_report(path: &Path, rows: &[&Transaction]) -> Result<(), ReportError> {
    let io_err = |source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    };
    let csv_err = |source| ReportError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut buf = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut buf);
        for tx in rows {
            writer.serialize(ReportRow::from(*tx)).map_err(csv_err)?;
        }
        writer.flush().map_err(io_err)?;
    }

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(&buf).map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

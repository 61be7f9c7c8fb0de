use tally_core::{AmountSource, BankManifest, Locator};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedAmount {
    Single(usize),
    DebitCredit { debit: usize, credit: usize },
}

/// A bank manifest's locators mapped onto one file's column positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumns {
    pub date: Option<usize>,
    pub description: Option<usize>,
    pub category: Option<usize>,
    pub transaction_type: Option<usize>,
    pub account_name: Option<usize>,
    pub amount: ResolvedAmount,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColumnError {
    #[error("Error with bank: {bank}. Column '{column}' is not in the csv header; ensure the columns in the csv match the bank manifest")]
    Mismatch { bank: String, column: String },
    #[error("Error with bank: {bank}. Column '{column}' is configured by name but the file has no header row")]
    NoHeaderRow { bank: String, column: String },
    #[error("Error with bank: {bank}. Manifest item cannot be an empty string ('{field}')")]
    EmptyLocator { bank: String, field: &'static str },
}

/// Maps every name-based locator in `bank` to its index in `headers`.
///
/// Header matching is exact and case sensitive. The manifest is left untouched,
/// so the same bank can be resolved against files with different layouts.
pub fn resolve_columns(
    bank: &BankManifest,
    headers: Option<&[String]>,
) -> Result<ResolvedColumns, ColumnError> {
    let locate = |field: &'static str, locator: &Locator| -> Result<usize, ColumnError> {
        match locator {
            Locator::Index(idx) => Ok(*idx),
            Locator::Name(name) if name.is_empty() => Err(ColumnError::EmptyLocator {
                bank: bank.name.clone(),
                field,
            }),
            Locator::Name(name) => {
                let headers = headers.ok_or_else(|| ColumnError::NoHeaderRow {
                    bank: bank.name.clone(),
                    column: name.clone(),
                })?;
                headers
                    .iter()
                    .position(|h| h == name)
                    .ok_or_else(|| ColumnError::Mismatch {
                        bank: bank.name.clone(),
                        column: name.clone(),
                    })
            }
        }
    };
    let locate_opt = |field: &'static str, locator: &Option<Locator>| {
        locator.as_ref().map(|l| locate(field, l)).transpose()
    };

    let amount = match &bank.amount {
        AmountSource::Single(locator) => ResolvedAmount::Single(locate("amount", locator)?),
        AmountSource::DebitCredit { debit, credit } => ResolvedAmount::DebitCredit {
            debit: locate("debit_credit", debit)?,
            credit: locate("debit_credit", credit)?,
        },
    };

    Ok(ResolvedColumns {
        date: locate_opt("date", &bank.date)?,
        description: locate_opt("description", &bank.description)?,
        category: locate_opt("category", &bank.category)?,
        transaction_type: locate_opt("transaction_type", &bank.transaction_type)?,
        account_name: locate_opt("account_name", &bank.account_name)?,
        amount,
    })
}

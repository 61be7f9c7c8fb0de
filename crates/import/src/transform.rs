use csv::StringRecord;
use tally_core::{BankManifest, Money, Transaction};
use thiserror::Error;
use tracing::debug;

use crate::columns::{ResolvedAmount, ResolvedColumns};
use crate::csv::{parse_amount, parse_date, parse_optional_amount, CsvError};
use crate::rules::{BankRules, CategoryRuleEngine, OverrideOutcome};
use crate::util::title_case;

#[derive(Error, Debug)]
pub enum RowError {
    #[error("Bank '{bank}', line {line}: cannot be credit and debit at the same time")]
    DebitAndCredit { bank: String, line: u64 },
    #[error("Bank '{bank}': no date column is configured")]
    MissingDateColumn { bank: String },
    #[error("Bank '{bank}', line {line}: the configured columns do not match, no column {column} in row {record:?}")]
    ShortRow {
        bank: String,
        line: u64,
        column: usize,
        record: Vec<String>,
    },
    #[error("Bank '{bank}', line {line}: {source}")]
    Cell {
        bank: String,
        line: u64,
        source: CsvError,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Emit(Transaction),
    Skipped,
    /// The first cell is empty: the statement's real data has ended.
    EndOfData,
}

/// Turns one bank's resolved rows into transactions.
pub struct RowTransformer<'a> {
    bank: &'a BankManifest,
    rules: &'a BankRules,
    categories: &'a CategoryRuleEngine,
    columns: ResolvedColumns,
}

impl<'a> RowTransformer<'a> {
    pub fn new(
        bank: &'a BankManifest,
        rules: &'a BankRules,
        categories: &'a CategoryRuleEngine,
        columns: ResolvedColumns,
    ) -> Self {
        Self {
            bank,
            rules,
            categories,
            columns,
        }
    }

    pub fn transform(&self, record: &StringRecord) -> Result<RowOutcome, RowError> {
        if record.get(0).map_or(true, |cell| cell.trim().is_empty()) {
            return Ok(RowOutcome::EndOfData);
        }

        let raw_description = match self.columns.description {
            Some(col) => self.cell(record, col)?,
            None => "",
        };
        if self.rules.should_skip(raw_description) {
            debug!(bank = %self.bank.name, description = raw_description, "filtered");
            return Ok(RowOutcome::Skipped);
        }

        let date_col = self
            .columns
            .date
            .ok_or_else(|| RowError::MissingDateColumn {
                bank: self.bank.name.clone(),
            })?;
        let date = parse_date(self.cell(record, date_col)?).map_err(|e| self.cell_error(record, e))?;

        let category = match self.columns.category {
            Some(col) => Some(self.cell(record, col)?.trim())
                .filter(|c| !c.is_empty())
                .map(str::to_string),
            None => None,
        };

        let mut tx = Transaction {
            bank: self.bank_label(record)?,
            date,
            description: title_case(raw_description),
            amount: Money::zero(),
            category,
        };
        self.categories.categorize(&mut tx);

        tx.amount = self.amount(record)?;
        if let Some(multiplier) = self.bank.amount_multiplier {
            tx.amount = tx.amount.abs() * multiplier;
        }

        if self.rules.apply_overrides(&mut tx) == OverrideOutcome::Dropped {
            debug!(bank = %self.bank.name, description = %tx.description, "dropped by amount override");
        }

        Ok(RowOutcome::Emit(tx))
    }

    fn amount(&self, record: &StringRecord) -> Result<Money, RowError> {
        match self.columns.amount {
            ResolvedAmount::Single(col) => {
                parse_amount(self.cell(record, col)?).map_err(|e| self.cell_error(record, e))
            }
            ResolvedAmount::DebitCredit { debit, credit } => {
                let debit = parse_optional_amount(self.cell(record, debit)?)
                    .map_err(|e| self.cell_error(record, e))?;
                let credit = parse_optional_amount(self.cell(record, credit)?)
                    .map_err(|e| self.cell_error(record, e))?;
                match (debit, credit) {
                    (Some(_), Some(_)) => Err(RowError::DebitAndCredit {
                        bank: self.bank.name.clone(),
                        line: line_of(record),
                    }),
                    (Some(debit), None) => Ok(-debit),
                    (None, Some(credit)) => Ok(credit.abs()),
                    (None, None) => Ok(Money::zero()),
                }
            }
        }
    }

    /// Aggregator exports name the underlying account on each row.
    fn bank_label(&self, record: &StringRecord) -> Result<String, RowError> {
        if self.bank.aggregator {
            if let Some(col) = self.columns.account_name {
                let account = self.cell(record, col)?.trim();
                if !account.is_empty() {
                    return Ok(account.to_string());
                }
            }
        }
        Ok(self.bank.name.clone())
    }

    fn cell<'r>(&self, record: &'r StringRecord, col: usize) -> Result<&'r str, RowError> {
        record.get(col).ok_or_else(|| RowError::ShortRow {
            bank: self.bank.name.clone(),
            line: line_of(record),
            column: col,
            record: record.iter().map(str::to_string).collect(),
        })
    }

    fn cell_error(&self, record: &StringRecord, source: CsvError) -> RowError {
        RowError::Cell {
            bank: self.bank.name.clone(),
            line: line_of(record),
            source,
        }
    }
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map_or(0, |p| p.line())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::resolve_columns;
    use crate::csv::parse_statement;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use tally_core::{
        AmountCategoryOverride, AmountCondition, AmountSource, GlobalCategoryRule, Locator,
        OverrideAction,
    };

    fn money(s: &str) -> Money {
        Money::from_decimal(Decimal::from_str(s).unwrap())
    }

    fn name(s: &str) -> Locator {
        Locator::Name(s.to_string())
    }

    fn chase() -> BankManifest {
        let mut bank = BankManifest::new("Chase", AmountSource::Single(name("Amount")));
        bank.date = Some(name("Transaction Date"));
        bank.description = Some(name("Description"));
        bank.category = Some(name("Category"));
        bank.transaction_type = Some(name("Type"));
        bank.skip_filters = vec!["AUTOMATIC PAYMENT - THANK".to_string()];
        bank
    }

    fn citi() -> BankManifest {
        let mut bank = BankManifest::new(
            "Citi",
            AmountSource::DebitCredit {
                debit: name("Debit"),
                credit: name("Credit"),
            },
        );
        bank.date = Some(name("Date"));
        bank.description = Some(name("Description"));
        bank
    }

    fn engine() -> CategoryRuleEngine {
        CategoryRuleEngine::new(&[GlobalCategoryRule {
            pattern: "Chipotle".to_string(),
            category: "Meals Out".to_string(),
        }])
        .unwrap()
    }

    /// Runs every row of `csv` through a transformer for `bank`.
    fn run(bank: &BankManifest, csv: &str) -> Vec<Result<RowOutcome, RowError>> {
        let file = parse_statement(csv, bank.has_headers, false).unwrap();
        let columns = resolve_columns(bank, file.headers.as_deref()).unwrap();
        let rules = BankRules::new(bank).unwrap();
        let categories = engine();
        let transformer = RowTransformer::new(bank, &rules, &categories, columns);
        file.records.iter().map(|r| transformer.transform(r)).collect()
    }

    fn emitted(outcome: &Result<RowOutcome, RowError>) -> &Transaction {
        match outcome {
            Ok(RowOutcome::Emit(tx)) => tx,
            other => panic!("expected a transaction, got {other:?}"),
        }
    }

    const CHASE_HEADER: &str = "Transaction Date,Description,Category,Type,Amount\n";

    #[test]
    fn chase_row_is_normalized_and_recategorized() {
        let csv = format!("{CHASE_HEADER}01/15/2024,CHIPOTLE MEXICAN GRILL,Dining,Sale,-12.50\n");
        let out = run(&chase(), &csv);
        let tx = emitted(&out[0]);
        assert_eq!(tx.bank, "chase");
        assert_eq!(tx.date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(tx.description, "Chipotle Mexican Grill");
        assert_eq!(tx.amount, money("-12.50"));
        assert_eq!(tx.category.as_deref(), Some("Meals Out"));
    }

    #[test]
    fn row_category_is_kept_without_global_match() {
        let csv = format!("{CHASE_HEADER}01/16/2024,TRADER JOE'S,Groceries,Sale,-40.00\n");
        let out = run(&chase(), &csv);
        assert_eq!(emitted(&out[0]).category.as_deref(), Some("Groceries"));
    }

    #[test]
    fn empty_category_cell_is_none() {
        let csv = format!("{CHASE_HEADER}01/16/2024,REFUND,,Return,8.00\n");
        let out = run(&chase(), &csv);
        assert_eq!(emitted(&out[0]).category, None);
    }

    #[test]
    fn skip_filter_sees_raw_description() {
        let csv = format!("{CHASE_HEADER}01/20/2024,AUTOMATIC PAYMENT - THANK YOU,,Payment,500.00\n");
        let out = run(&chase(), &csv);
        assert!(matches!(out[0], Ok(RowOutcome::Skipped)));
    }

    #[test]
    fn skipped_row_needs_no_valid_date() {
        let csv = format!("{CHASE_HEADER}pending,AUTOMATIC PAYMENT - THANK YOU,,Payment,500.00\n");
        let out = run(&chase(), &csv);
        assert!(matches!(out[0], Ok(RowOutcome::Skipped)));
    }

    #[test]
    fn empty_first_cell_ends_data() {
        let csv = format!("{CHASE_HEADER}01/15/2024,COFFEE,,Sale,-3.00\n,,,,\n");
        let out = run(&chase(), &csv);
        assert!(matches!(out[1], Ok(RowOutcome::EndOfData)));
    }

    #[test]
    fn unparsable_date_is_an_error() {
        let csv = format!("{CHASE_HEADER}someday,COFFEE,,Sale,-3.00\n");
        let out = run(&chase(), &csv);
        assert!(matches!(
            &out[0],
            Err(RowError::Cell { source: CsvError::InvalidDate(_), .. })
        ));
    }

    #[test]
    fn missing_date_column_is_an_error() {
        let mut bank = chase();
        bank.date = None;
        let csv = format!("{CHASE_HEADER}01/15/2024,COFFEE,,Sale,-3.00\n");
        let out = run(&bank, &csv);
        assert!(matches!(&out[0], Err(RowError::MissingDateColumn { .. })));
    }

    #[test]
    fn short_row_reports_bank_and_line() {
        let csv = format!("{CHASE_HEADER}01/15/2024,COFFEE\n");
        let out = run(&chase(), &csv);
        let err = out[0].as_ref().unwrap_err();
        assert!(matches!(err, RowError::ShortRow { line: 2, .. }));
        assert!(err.to_string().contains("chase"));
    }

    #[test]
    fn double_negative_amount_is_income() {
        let csv = format!("{CHASE_HEADER}01/15/2024,RETURN,,Return,--19.99\n");
        let out = run(&chase(), &csv);
        assert_eq!(emitted(&out[0]).amount, money("19.99"));
    }

    #[test]
    fn debit_credit_signs() {
        let csv = "Date,Description,Debit,Credit\n\
                   02/01/2024,Payroll Deposit,,2500.00\n\
                   02/02/2024,GROCERY,45.10,\n\
                   02/03/2024,NOTHING,,\n\
                   02/04/2024,REVERSAL,,-10.00\n";
        let out = run(&citi(), csv);
        assert_eq!(emitted(&out[0]).amount, money("2500"));
        assert_eq!(emitted(&out[1]).amount, money("-45.10"));
        assert!(emitted(&out[2]).amount.is_zero());
        assert_eq!(emitted(&out[3]).amount, money("10"));
    }

    #[test]
    fn debit_and_credit_together_is_an_error() {
        let csv = "Date,Description,Debit,Credit\n02/01/2024,ODD,5.00,5.00\n";
        let out = run(&citi(), csv);
        let err = out[0].as_ref().unwrap_err();
        assert!(matches!(err, RowError::DebitAndCredit { .. }));
        assert!(err.to_string().contains("cannot be credit and debit at the same time"));
    }

    #[test]
    fn zero_debit_counts_as_empty() {
        let csv = "Date,Description,Debit,Credit\n02/01/2024,REFUND,0.00,12.00\n";
        let out = run(&citi(), csv);
        assert_eq!(emitted(&out[0]).amount, money("12"));
    }

    #[test]
    fn multiplier_is_the_only_sign_source() {
        let mut bank = chase();
        bank.amount_multiplier = Some(Decimal::from(-1));
        let csv = format!("{CHASE_HEADER}01/15/2024,REFUND,,Return,8.00\n01/16/2024,SHOP,,Sale,-8.00\n");
        let out = run(&bank, &csv);
        assert_eq!(emitted(&out[0]).amount, money("-8"));
        assert_eq!(emitted(&out[1]).amount, money("-8"));
    }

    #[test]
    fn override_runs_after_multiplier() {
        let mut bank = chase();
        bank.amount_multiplier = Some(Decimal::ONE);
        bank.amount_overrides = vec![AmountCategoryOverride {
            pattern: "TRANSFER".to_string(),
            condition: AmountCondition::Exact(money("100")),
            action: OverrideAction::Drop,
        }];
        let csv = format!("{CHASE_HEADER}01/15/2024,TRANSFER,,Sale,-100.00\n");
        let out = run(&bank, &csv);
        let tx = emitted(&out[0]);
        assert!(tx.amount.is_zero());
        assert_eq!(tx.category.as_deref(), Some(tally_core::FILTERED_CATEGORY));
    }

    #[test]
    fn absent_description_column_yields_empty_description() {
        let mut bank = citi();
        bank.description = None;
        let csv = "Date,Description,Debit,Credit\n02/01/2024,IGNORED,1.00,\n";
        let out = run(&bank, csv);
        assert_eq!(emitted(&out[0]).description, "");
    }

    #[test]
    fn aggregator_rows_carry_account_name() {
        let mut bank = BankManifest::new("Mint", AmountSource::Single(name("Amount")));
        bank.date = Some(name("Date"));
        bank.description = Some(name("Description"));
        bank.aggregator = true;
        bank.account_name = Some(name("Account Name"));
        let csv = "Date,Description,Amount,Account Name\n\
                   03/01/2024,COFFEE,-3.00,Amex Gold\n\
                   03/02/2024,TEA,-2.00,\n";
        let out = run(&bank, csv);
        assert_eq!(emitted(&out[0]).bank, "Amex Gold");
        assert_eq!(emitted(&out[1]).bank, "mint");
    }
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::money::Money;

/// Category given to transactions removed by an amount override.
pub const FILTERED_CATEGORY: &str = "Filtered";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Flow {
    Income,
    Expense,
}

/// One retained statement row after normalization and categorization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub bank: String,
    pub date: NaiveDate,
    pub description: String,
    pub amount: Money,
    pub category: Option<String>,
}

impl Transaction {
    /// `None` for zero amounts, which belong to neither report.
    pub fn flow(&self) -> Option<Flow> {
        if self.amount.is_income() {
            Some(Flow::Income)
        } else if self.amount.is_expense() {
            Some(Flow::Expense)
        } else {
            None
        }
    }

    pub fn drop_from_reports(&mut self) {
        self.amount = Money::zero();
        self.category = Some(FILTERED_CATEGORY.to_string());
    }
}

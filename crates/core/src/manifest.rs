use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

use super::money::Money;

const BUILTIN_MANIFEST: &str = include_str!("builtin_manifest.json");

/// A column reference: a header name (case sensitive) or a zero-based index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Locator {
    Index(usize),
    Name(String),
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Index(i) => write!(f, "#{i}"),
            Locator::Name(name) => write!(f, "'{name}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmountSource {
    Single(Locator),
    DebitCredit { debit: Locator, credit: Locator },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountCondition {
    /// Configured as `0` or `-1`: matches on description alone.
    Any,
    Exact(Money),
}

impl AmountCondition {
    pub fn from_configured(amount: Money) -> Self {
        if amount.is_zero() || amount == -Money::from_decimal(Decimal::ONE) {
            AmountCondition::Any
        } else {
            AmountCondition::Exact(amount)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideAction {
    SetCategory(String),
    Drop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountCategoryOverride {
    pub pattern: String,
    pub condition: AmountCondition,
    pub action: OverrideAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalCategoryRule {
    pub pattern: String,
    pub category: String,
}

/// How to read one bank's statement export. Immutable once built; column
/// names are resolved per file into a separate value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankManifest {
    pub name: String,
    pub has_headers: bool,
    pub date: Option<Locator>,
    pub description: Option<Locator>,
    pub category: Option<Locator>,
    pub transaction_type: Option<Locator>,
    pub amount: AmountSource,
    pub amount_multiplier: Option<Decimal>,
    pub skip_filters: Vec<String>,
    pub amount_overrides: Vec<AmountCategoryOverride>,
    pub add_header_comma: bool,
    pub aggregator: bool,
    pub account_name: Option<Locator>,
}

impl BankManifest {
    pub fn new(name: &str, amount: AmountSource) -> Self {
        BankManifest {
            name: name.to_lowercase(),
            has_headers: true,
            date: None,
            description: None,
            category: None,
            transaction_type: None,
            amount,
            amount_multiplier: None,
            skip_filters: Vec::new(),
            amount_overrides: Vec::new(),
            add_header_comma: false,
            aggregator: false,
            account_name: None,
        }
    }

    /// Checks the invariants that the constructor alone cannot express.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.name.trim().is_empty() {
            return Err(ManifestError::MissingBankName);
        }
        if matches!(self.amount, AmountSource::DebitCredit { .. }) && self.transaction_type.is_some()
        {
            return Err(ManifestError::TypeWithDebitCredit {
                bank: self.name.clone(),
            });
        }
        for (field, locator) in self.locators() {
            if matches!(locator, Locator::Name(name) if name.is_empty()) {
                return Err(ManifestError::EmptyLocator {
                    bank: self.name.clone(),
                    field,
                });
            }
        }
        Ok(())
    }

    /// Every configured locator with the manifest key it came from.
    pub fn locators(&self) -> Vec<(&'static str, &Locator)> {
        let mut out = Vec::new();
        let optional = [
            ("date", &self.date),
            ("description", &self.description),
            ("category", &self.category),
            ("transaction_type", &self.transaction_type),
            ("account_name", &self.account_name),
        ];
        for (field, locator) in optional {
            if let Some(locator) = locator {
                out.push((field, locator));
            }
        }
        match &self.amount {
            AmountSource::Single(locator) => out.push(("amount", locator)),
            AmountSource::DebitCredit { debit, credit } => {
                out.push(("debit_credit", debit));
                out.push(("debit_credit", credit));
            }
        }
        out
    }

    /// Case-insensitive substring match of the bank name against a file name.
    pub fn matches_file_name(&self, file_name: &str) -> bool {
        file_name.to_lowercase().contains(&self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub banks: Vec<BankManifest>,
    pub category_rules: Vec<GlobalCategoryRule>,
}

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse manifest JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to parse manifest TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Unsupported manifest format: {0} (expected .json or .toml)")]
    UnsupportedFormat(String),
    #[error("Bank manifest is missing a bank_name")]
    MissingBankName,
    #[error("Bank '{bank}' must set exactly one of 'amount' and 'debit_credit'")]
    AmountSource { bank: String },
    #[error("Bank '{bank}' cannot set both 'transaction_type' and 'debit_credit'")]
    TypeWithDebitCredit { bank: String },
    #[error("Bank '{bank}': manifest item cannot be an empty string ('{field}')")]
    EmptyLocator { bank: String, field: &'static str },
    #[error("Bank '{bank}': 'debit_credit' must list exactly two columns, got {got}")]
    DebitCreditArity { bank: String, got: usize },
    #[error("Bank '{bank}': invalid amount {value} in amount_category_manifest")]
    InvalidAmount { bank: String, value: f64 },
    #[error("Bank '{bank}': override target for '{pattern}' must be a category, null or false")]
    InvalidOverrideTarget { bank: String, pattern: String },
}

// ── On-disk representation ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ManifestFile {
    banks: Vec<BankEntry>,
    #[serde(default)]
    category_manifest: Vec<(String, String)>,
}

#[derive(Debug, Deserialize)]
struct BankEntry {
    #[serde(default)]
    bank_name: String,
    #[serde(default = "default_headers")]
    headers: bool,
    date: Option<Locator>,
    description: Option<Locator>,
    category: Option<Locator>,
    transaction_type: Option<Locator>,
    debit_credit: Option<Vec<Locator>>,
    amount: Option<Locator>,
    amount_multiple: Option<f64>,
    #[serde(default)]
    regex_filters: Vec<String>,
    #[serde(default)]
    amount_category_manifest: Vec<(String, f64, Option<OverrideTarget>)>,
    #[serde(default)]
    add_comma_to_csv_header: bool,
    #[serde(default)]
    aggregator: bool,
    account_name: Option<Locator>,
}

fn default_headers() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OverrideTarget {
    Flag(bool),
    Category(String),
}

impl TryFrom<BankEntry> for BankManifest {
    type Error = ManifestError;

    fn try_from(entry: BankEntry) -> Result<Self, Self::Error> {
        let name = entry.bank_name.to_lowercase();
        if name.trim().is_empty() {
            return Err(ManifestError::MissingBankName);
        }

        let amount = match (entry.amount, entry.debit_credit) {
            (Some(locator), None) => AmountSource::Single(locator),
            (None, Some(pair)) => {
                let got = pair.len();
                let mut pair = pair.into_iter();
                match (pair.next(), pair.next(), pair.next()) {
                    (Some(debit), Some(credit), None) => AmountSource::DebitCredit { debit, credit },
                    _ => return Err(ManifestError::DebitCreditArity { bank: name, got }),
                }
            }
            _ => return Err(ManifestError::AmountSource { bank: name }),
        };

        let amount_multiplier = match entry.amount_multiple {
            Some(value) => Some(
                Decimal::from_f64(value)
                    .ok_or(ManifestError::InvalidAmount { bank: name.clone(), value })?,
            ),
            None => None,
        };

        let mut amount_overrides = Vec::with_capacity(entry.amount_category_manifest.len());
        for (pattern, value, target) in entry.amount_category_manifest {
            let amount = Money::from_f64(value)
                .ok_or(ManifestError::InvalidAmount { bank: name.clone(), value })?;
            let action = match target {
                None | Some(OverrideTarget::Flag(false)) => OverrideAction::Drop,
                Some(OverrideTarget::Category(category)) => OverrideAction::SetCategory(category),
                Some(OverrideTarget::Flag(true)) => {
                    return Err(ManifestError::InvalidOverrideTarget { bank: name, pattern })
                }
            };
            amount_overrides.push(AmountCategoryOverride {
                pattern,
                condition: AmountCondition::from_configured(amount),
                action,
            });
        }

        let bank = BankManifest {
            name,
            has_headers: entry.headers,
            date: entry.date,
            description: entry.description,
            category: entry.category,
            transaction_type: entry.transaction_type,
            amount,
            amount_multiplier,
            skip_filters: entry.regex_filters,
            amount_overrides,
            add_header_comma: entry.add_comma_to_csv_header,
            aggregator: entry.aggregator,
            account_name: entry.account_name,
        };
        bank.validate()?;
        Ok(bank)
    }
}

impl TryFrom<ManifestFile> for Manifest {
    type Error = ManifestError;

    fn try_from(file: ManifestFile) -> Result<Self, Self::Error> {
        let banks = file
            .banks
            .into_iter()
            .map(BankManifest::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let category_rules = file
            .category_manifest
            .into_iter()
            .map(|(pattern, category)| GlobalCategoryRule { pattern, category })
            .collect();
        Ok(Manifest {
            banks,
            category_rules,
        })
    }
}

impl Manifest {
    pub fn from_json(json: &str) -> Result<Self, ManifestError> {
        let file: ManifestFile = serde_json::from_str(json)?;
        Manifest::try_from(file)
    }

    pub fn from_toml(toml_content: &str) -> Result<Self, ManifestError> {
        let file: ManifestFile = toml::from_str(toml_content)?;
        Manifest::try_from(file)
    }

    /// Loads a manifest file, picking the format from its extension.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_lowercase();
        let content = std::fs::read_to_string(path)?;
        match ext.as_str() {
            "json" => Manifest::from_json(&content),
            "toml" => Manifest::from_toml(&content),
            _ => Err(ManifestError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// The manifest shipped with the binary (Chase, Citi, USAA).
    pub fn builtin() -> Result<Self, ManifestError> {
        Manifest::from_json(BUILTIN_MANIFEST)
    }

    /// First bank whose name appears in the file name.
    pub fn bank_for_file(&self, file_name: &str) -> Option<&BankManifest> {
        self.banks.iter().find(|bank| bank.matches_file_name(file_name))
    }
}

use regex::{Regex, RegexBuilder};
use tally_core::{
    AmountCondition, BankManifest, GlobalCategoryRule, OverrideAction, Transaction,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("Invalid pattern '{pattern}' in {owner}: {source}")]
    InvalidPattern {
        owner: String,
        pattern: String,
        source: regex::Error,
    },
}

fn compile(
    owner: &str,
    pattern: &str,
    case_insensitive: bool,
    multi_line: bool,
) -> Result<Regex, RuleError> {
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .multi_line(multi_line)
        .build()
        .map_err(|source| RuleError::InvalidPattern {
            owner: owner.to_string(),
            pattern: pattern.to_string(),
            source,
        })
}

/// Internal pairing of a rule with its precompiled regex.
struct CompiledRule {
    rule: GlobalCategoryRule,
    regex: Regex,
}

/// Global description → category rules, shared by every bank. Rules keep
/// their declared order and the first match wins.
pub struct CategoryRuleEngine {
    rules: Vec<CompiledRule>,
}

impl CategoryRuleEngine {
    pub fn new(rules: &[GlobalCategoryRule]) -> Result<Self, RuleError> {
        let rules = rules
            .iter()
            .map(|rule| {
                let regex = compile("category_manifest", &rule.pattern, true, false)?;
                Ok(CompiledRule {
                    rule: rule.clone(),
                    regex,
                })
            })
            .collect::<Result<Vec<_>, RuleError>>()?;
        Ok(Self { rules })
    }

    pub fn find_matching_rule(&self, description: &str) -> Option<&GlobalCategoryRule> {
        self.rules
            .iter()
            .find(|cr| cr.regex.is_match(description))
            .map(|cr| &cr.rule)
    }

    /// Overwrites the category on a match; leaves it alone otherwise.
    pub fn categorize(&self, tx: &mut Transaction) {
        if let Some(rule) = self.find_matching_rule(&tx.description) {
            tx.category = Some(rule.category.clone());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideOutcome {
    Recategorized,
    Dropped,
    NoOverride,
}

struct CompiledOverride {
    regex: Regex,
    condition: AmountCondition,
    action: OverrideAction,
}

/// One bank's skip filters and amount-conditioned category overrides.
pub struct BankRules {
    skip_filters: Vec<Regex>,
    overrides: Vec<CompiledOverride>,
}

impl BankRules {
    pub fn new(bank: &BankManifest) -> Result<Self, RuleError> {
        let owner = format!("bank '{}'", bank.name);
        let skip_filters = bank
            .skip_filters
            .iter()
            .map(|pattern| compile(&owner, pattern, false, true))
            .collect::<Result<Vec<_>, _>>()?;
        let overrides = bank
            .amount_overrides
            .iter()
            .map(|o| {
                Ok(CompiledOverride {
                    regex: compile(&owner, &o.pattern, true, false)?,
                    condition: o.condition,
                    action: o.action.clone(),
                })
            })
            .collect::<Result<Vec<_>, RuleError>>()?;
        Ok(Self {
            skip_filters,
            overrides,
        })
    }

    /// True when the raw description matches any skip filter (case sensitive).
    pub fn should_skip(&self, raw_description: &str) -> bool {
        self.skip_filters.iter().any(|re| re.is_match(raw_description))
    }

    /// Applies the first override whose pattern and amount condition both hold.
    ///
    /// A wildcard override only ever sets the category; a drop target on a
    /// wildcard clears it.
    pub fn apply_overrides(&self, tx: &mut Transaction) -> OverrideOutcome {
        for o in &self.overrides {
            if !o.regex.is_match(&tx.description) {
                continue;
            }
            match (o.condition, &o.action) {
                (AmountCondition::Any, OverrideAction::SetCategory(category)) => {
                    tx.category = Some(category.clone());
                    return OverrideOutcome::Recategorized;
                }
                (AmountCondition::Any, OverrideAction::Drop) => {
                    tx.category = None;
                    return OverrideOutcome::Recategorized;
                }
                (AmountCondition::Exact(amount), action) if amount == tx.amount => {
                    return match action {
                        OverrideAction::SetCategory(category) => {
                            tx.category = Some(category.clone());
                            OverrideOutcome::Recategorized
                        }
                        OverrideAction::Drop => {
                            tx.drop_from_reports();
                            OverrideOutcome::Dropped
                        }
                    };
                }
                _ => {}
            }
        }
        OverrideOutcome::NoOverride
    }
}

pub mod manifest;
pub mod money;
pub mod transaction;

pub use manifest::{
    AmountCategoryOverride, AmountCondition, AmountSource, BankManifest, GlobalCategoryRule,
    Locator, Manifest, ManifestError, OverrideAction,
};
pub use money::Money;
pub use transaction::{Flow, Transaction, FILTERED_CATEGORY};

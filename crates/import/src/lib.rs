pub mod columns;
pub mod compiler;
pub mod csv;
pub mod discovery;
pub mod report;
pub mod rules;
pub mod transform;
pub(crate) mod util;

pub use columns::{resolve_columns, ColumnError, ResolvedAmount, ResolvedColumns};
pub use compiler::{Compilation, CompileSummary, FileError, FileStats, StatementCompiler};
pub use csv::{parse_amount, parse_date, read_statement, CsvError, StatementFile};
pub use discovery::find_statement_files;
pub use report::{partition, write_reports, OutputFiles, ReportError};
pub use rules::{BankRules, CategoryRuleEngine, OverrideOutcome, RuleError};
pub use transform::{RowError, RowOutcome, RowTransformer};

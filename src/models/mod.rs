pub mod mapping;
pub mod record;
pub mod report;
pub mod table;

pub use mapping::{ColumnMapping, MatchConfidence};
pub use record::{CanonicalRecord, FieldValue};
pub use report::{ImportResult, ReconciliationPlan, RowError};
pub use table::ParsedTable;

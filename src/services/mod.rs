pub mod coercer;
pub mod importer;
pub mod matcher;
pub mod parser;
pub mod reconciler;
pub mod store;

pub use importer::LeadImporter;
pub use matcher::{auto_map_columns, match_field, FieldMatch};
pub use parser::{parse_csv, parse_csv_str};
pub use reconciler::reconcile;
pub use store::{LeadStore, MemoryLeadStore, PostgrestLeadStore};

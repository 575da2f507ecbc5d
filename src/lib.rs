// Biblioteca de importação de leads via planilha (CSV)
// Expõe módulos para uso em testes e integrações

pub mod config;
pub mod models;
pub mod services;
pub mod utils;

pub use config::{ImportSettings, Settings, StoreSettings, SynonymTable};
pub use models::{ColumnMapping, ImportResult, MatchConfidence, ParsedTable};
pub use services::importer::LeadImporter;
pub use services::store::{LeadStore, MemoryLeadStore, PostgrestLeadStore};

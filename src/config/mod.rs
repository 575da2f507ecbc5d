pub mod settings;
pub mod synonyms;

pub use settings::{ImportSettings, Settings, StoreSettings};
pub use synonyms::{EnumSpec, FieldKind, FieldSpec, SynonymTable};

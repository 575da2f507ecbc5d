use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Limites e knobs da importação
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ImportSettings {
    /// Teto de linhas por arquivo; acima disso a importação nem começa
    pub max_rows: usize,
    /// Tamanho dos lotes enviados ao store
    pub batch_size: usize,
    /// Máximo de erros por linha exibidos no resumo (todos são contados)
    pub max_reported_errors: usize,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            max_rows: 5000,
            batch_size: 50,
            max_reported_errors: 20,
        }
    }
}

/// Conexão com o store PostgREST (Supabase)
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StoreSettings {
    pub base_url: String,
    pub api_key: String,
    #[serde(default = "default_table")]
    pub table: String,
    /// Escopo multi-tenant: filtra consultas e carimba registros inseridos
    pub organization_id: Option<String>,
}

fn default_table() -> String {
    "leads".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub import: ImportSettings,
    pub store: Option<StoreSettings>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut builder = Config::builder()
            // Arquivo de configuração base
            .add_source(File::with_name("config/default").required(false))
            // Arquivo específico do ambiente
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false));

        // Variáveis de ambiente do Supabase têm precedência
        if let Ok(url) = std::env::var("SUPABASE_URL") {
            builder = builder.set_override("store.base_url", url)?;
        }
        if let Ok(key) = std::env::var("SUPABASE_SERVICE_ROLE_KEY") {
            builder = builder.set_override("store.api_key", key)?;
        }

        builder = builder.add_source(Environment::with_prefix("LEAD_IMPORT").separator("__"));

        let s = builder.build()?;

        s.try_deserialize()
    }
}

//! Tipos de erro do pipeline de importação
//!
//! Apenas as falhas de pré-validação e de infraestrutura (configuração,
//! parse do arquivo, consulta inicial ao store) sobem como `Err`. Erros de
//! linha e de lote são coletados no `ImportResult`, nunca propagados.

use thiserror::Error;

/// Erros da importação de leads
#[derive(Debug, Error)]
pub enum ImportError {
    /// Arquivo acima do teto de linhas permitido
    #[error("Limite de {max} linhas excedido ({got} linhas). Divida o arquivo.")]
    RowLimitExceeded { max: usize, got: usize },

    /// Nenhuma linha para importar
    #[error("Nenhuma linha para importar")]
    EmptyInput,

    /// Nenhuma coluna da planilha foi mapeada para um campo de destino
    #[error("Nenhuma coluna mapeada para um campo de destino")]
    NoMappedColumns,

    /// Erro de parse do CSV
    #[error("CSV parsing failed: {0}")]
    CsvError(#[from] csv::Error),

    /// Erro de requisição HTTP
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Erro do store (status code não-2xx)
    #[error("Store error (status {status}): {message}")]
    StoreError { status: u16, message: String },

    /// Erro de parsing JSON
    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Erro de configuração
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Tipo Result padrão do crate
pub type Result<T> = std::result::Result<T, ImportError>;

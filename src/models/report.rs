//! Plano de reconciliação e resultado final da importação

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::record::CanonicalRecord;

/// Erro associado a uma linha do arquivo de origem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    /// Número da linha no arquivo (1 = cabeçalho, dados começam em 2)
    pub row: usize,
    pub message: String,
}

/// Decisão do motor de reconciliação para um arquivo inteiro
///
/// Cada linha de entrada termina em exatamente um destino: `upserts`,
/// `rejects`, ou colapsada por uma linha posterior de mesma chave natural
/// (contada em `superseded`).
#[derive(Debug, Clone)]
pub struct ReconciliationPlan {
    /// Registros a persistir, já colapsados por last-row-wins
    pub upserts: Vec<CanonicalRecord>,
    /// Linhas estruturalmente inválidas, com motivo
    pub rejects: Vec<RowError>,
    /// Linhas substituídas por uma ocorrência posterior da mesma chave
    pub superseded: usize,
}

impl ReconciliationPlan {
    /// Registros que atualizam um lead já existente no store
    pub fn update_count(&self) -> usize {
        self.upserts
            .iter()
            .filter(|r| r.existing_id.is_some())
            .count()
    }
}

/// Resumo devolvido ao chamador ao fim da importação
#[derive(Debug, Clone, Serialize)]
pub struct ImportResult {
    /// Identificador desta execução, presente em todos os logs
    pub batch_id: Uuid,
    /// Registros inseridos ou atualizados (contados pós-colapso)
    pub success: usize,
    /// Linhas rejeitadas na coerção + registros com falha de persistência
    pub failed: usize,
    /// Linhas colapsadas em um registro existente por chave natural
    /// (duplicatas no arquivo + updates de leads já cadastrados)
    pub duplicates: usize,
    /// Lista completa de erros por linha; para exibição use `capped_errors`
    pub errors: Vec<RowError>,
}

impl ImportResult {
    pub fn new(batch_id: Uuid) -> Self {
        Self {
            batch_id,
            success: 0,
            failed: 0,
            duplicates: 0,
            errors: Vec::new(),
        }
    }

    /// Primeiros `max` erros, para exibição truncada na UI/logs
    pub fn capped_errors(&self, max: usize) -> &[RowError] {
        &self.errors[..self.errors.len().min(max)]
    }
}

//! Tabela parseada: fronteira entre o arquivo e o pipeline
//!
//! Nenhum objeto dinâmico do parser atravessa esta fronteira: linhas são
//! sempre mapas `cabeçalho → célula` de strings.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Conteúdo tabular já decodificado (CSV ou planilha)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedTable {
    /// Cabeçalhos únicos, na ordem do arquivo
    pub headers: Vec<String>,
    /// Linhas na ordem do arquivo; células ausentes simplesmente não
    /// aparecem no mapa
    pub rows: Vec<HashMap<String, String>>,
}

impl ParsedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Primeira célula não vazia de uma coluna (para exibição no mapeamento)
    pub fn sample_value(&self, header: &str) -> String {
        self.rows
            .iter()
            .filter_map(|row| row.get(header))
            .map(|cell| cell.trim())
            .find(|cell| !cell.is_empty())
            .unwrap_or_default()
            .to_string()
    }
}

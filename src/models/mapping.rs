//! Mapeamento coluna da planilha → campo canônico

use serde::{Deserialize, Serialize};

/// Quão confiável é o mapeamento automático de uma coluna
///
/// `Manual` marca mapeamentos ajustados pelo operador; o matcher nunca
/// produz esse valor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchConfidence {
    High,
    Medium,
    Low,
    Manual,
}

/// Uma coluna de origem e o campo canônico atribuído a ela
///
/// `target_field = None` significa coluna ignorada. Mais de uma coluna
/// pode apontar para o mesmo campo; na coerção a última coluna mapeada
/// (ordem da planilha) vence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub source_column: String,
    pub target_field: Option<String>,
    pub confidence: MatchConfidence,
    /// Primeira célula não vazia da coluna, apenas para exibição
    pub sample_value: String,
}

impl ColumnMapping {
    /// Reatribui o campo de destino manualmente (ação do operador)
    pub fn override_target(&mut self, target_field: Option<String>) {
        self.target_field = target_field;
        self.confidence = MatchConfidence::Manual;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_target_marks_manual() {
        let mut mapping = ColumnMapping {
            source_column: "Coluna X".to_string(),
            target_field: None,
            confidence: MatchConfidence::Low,
            sample_value: String::new(),
        };
        mapping.override_target(Some("email".to_string()));
        assert_eq!(mapping.target_field.as_deref(), Some("email"));
        assert_eq!(mapping.confidence, MatchConfidence::Manual);
    }

    #[test]
    fn test_confidence_serializes_lowercase() {
        let json = serde_json::to_string(&MatchConfidence::High).unwrap();
        assert_eq!(json, "\"high\"");
    }
}

//! Mapeamento automático de cabeçalhos para campos canônicos
//!
//! Cada cabeçalho é comparado com a tabela de sinônimos: match exato após
//! normalização ganha confiança alta imediatamente; caso contrário vale o
//! melhor score de similaridade (Dice sobre bigramas) entre todos os
//! sinônimos de todos os campos. O resultado é determinístico para uma
//! mesma tabela e cabeçalho.

use crate::config::synonyms::SynonymTable;
use crate::models::{ColumnMapping, MatchConfidence, ParsedTable};
use crate::utils::normalization::{normalize, similarity};

/// Palpite do matcher para um cabeçalho
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMatch {
    pub field: Option<String>,
    pub confidence: MatchConfidence,
}

impl FieldMatch {
    fn none() -> Self {
        Self {
            field: None,
            confidence: MatchConfidence::Low,
        }
    }
}

/// Encontra o campo canônico mais provável para um cabeçalho
///
/// Classificação por score:
/// - match exato de sinônimo → `High`
/// - score ≥ 0.8 → `High`
/// - 0.5 ≤ score < 0.8 → `Medium`
/// - 0.3 ≤ score < 0.5 → melhor campo com `Low`
/// - score < 0.3 → nenhum campo (`Low`)
pub fn match_field(header: &str, table: &SynonymTable) -> FieldMatch {
    let normalized = normalize(header);
    if normalized.is_empty() {
        return FieldMatch::none();
    }

    // 1. Match exato (primeiro campo declarado vence)
    for spec in &table.fields {
        let exact = normalize(&spec.name) == normalized
            || spec.synonyms.iter().any(|s| normalize(s) == normalized);
        if exact {
            return FieldMatch {
                field: Some(spec.name.clone()),
                confidence: MatchConfidence::High,
            };
        }
    }

    // 2. Melhor similaridade entre todos os sinônimos
    // `>` mantém o primeiro campo declarado em caso de empate de score
    let mut best_field: Option<String> = None;
    let mut best_score = 0.0_f64;
    for spec in &table.fields {
        for synonym in &spec.synonyms {
            let score = similarity(&normalized, &normalize(synonym));
            if score > best_score {
                best_score = score;
                best_field = Some(spec.name.clone());
            }
        }
    }

    if best_score < 0.3 {
        return FieldMatch::none();
    }

    let confidence = if best_score >= 0.8 {
        MatchConfidence::High
    } else if best_score >= 0.5 {
        MatchConfidence::Medium
    } else {
        MatchConfidence::Low
    };

    FieldMatch {
        field: best_field,
        confidence,
    }
}

/// Gera o mapeamento automático de todas as colunas de uma tabela
///
/// O resultado é apresentado ao operador, que pode sobrescrever palpites
/// de baixa confiança antes de rodar a importação.
pub fn auto_map_columns(table: &ParsedTable, synonyms: &SynonymTable) -> Vec<ColumnMapping> {
    table
        .headers
        .iter()
        .map(|header| {
            let guess = match_field(header, synonyms);
            ColumnMapping {
                source_column: header.clone(),
                target_field: guess.field,
                confidence: guess.confidence,
                sample_value: table.sample_value(header),
            }
        })
        .collect()
}

//! Motor de reconciliação: linhas coercidas → plano de upsert
//!
//! Regras de desempate, explícitas e testáveis:
//! - dentro de um arquivo, a última ocorrência de uma chave natural vence
//!   (etapa de colapso dedicada, não efeito colateral de inserção em mapa);
//! - entre sessões, vale o snapshot do índice de chaves existentes tirado
//!   antes da execução (sem re-consulta no meio do run).

use std::collections::HashMap;

use tracing::debug;

use crate::config::synonyms::{FieldKind, FieldSpec, SynonymTable};
use crate::models::{CanonicalRecord, ColumnMapping, FieldValue, ParsedTable, ReconciliationPlan, RowError};
use crate::services::coercer::{coerce, derive_title};

/// Monta o plano de reconciliação para uma tabela inteira
///
/// `existing_index` é o snapshot `chave natural → id` do store. Cada linha
/// termina em exatamente um destino: upsert, reject ou colapsada por uma
/// linha posterior de mesma chave.
pub fn reconcile(
    table: &ParsedTable,
    mappings: &[ColumnMapping],
    existing_index: &HashMap<String, String>,
    synonyms: &SynonymTable,
) -> ReconciliationPlan {
    let columns = mapped_columns(mappings, synonyms);

    let mut staged = Vec::new();
    let mut rejects = Vec::new();

    for (index, row) in table.rows.iter().enumerate() {
        // +2: linha 1 é o cabeçalho, dados começam na 2
        let row_number = index + 2;

        let all_blank = columns.iter().all(|(column, _)| {
            row.get(*column).map(|cell| cell.trim().is_empty()).unwrap_or(true)
        });
        if all_blank {
            rejects.push(RowError {
                row: row_number,
                message: "linha vazia: nenhuma coluna mapeada possui valor".to_string(),
            });
            continue;
        }

        staged.push(build_record(row, &columns, synonyms, row_number));
    }

    let (mut upserts, superseded) = collapse_last_row_wins(staged);

    // Anexa ids do snapshot: marca updates de leads já cadastrados
    for record in &mut upserts {
        if let Some(key) = record.natural_key() {
            if let Some(id) = existing_index.get(&key) {
                record.existing_id = Some(id.clone());
            }
        }
    }

    debug!(
        "Reconciliação: {} upserts ({} updates), {} rejeitadas, {} colapsadas",
        upserts.len(),
        upserts.iter().filter(|r| r.existing_id.is_some()).count(),
        rejects.len(),
        superseded
    );

    ReconciliationPlan {
        upserts,
        rejects,
        superseded,
    }
}

/// Resolve o mapeamento em pares (coluna, spec do campo)
///
/// Entradas sem campo de destino ou com campo desconhecido na tabela de
/// sinônimos são ignoradas.
fn mapped_columns<'a>(
    mappings: &'a [ColumnMapping],
    synonyms: &'a SynonymTable,
) -> Vec<(&'a str, &'a FieldSpec)> {
    mappings
        .iter()
        .filter_map(|mapping| {
            let target = mapping.target_field.as_deref()?;
            let spec = synonyms.field(target)?;
            Some((mapping.source_column.as_str(), spec))
        })
        .collect()
}

fn build_record(
    row: &HashMap<String, String>,
    columns: &[(&str, &FieldSpec)],
    synonyms: &SynonymTable,
    row_number: usize,
) -> CanonicalRecord {
    let mut record = CanonicalRecord::new(row_number);

    for (column, spec) in columns {
        let Some(raw) = row.get(*column) else {
            continue;
        };
        match coerce(raw, spec.kind, synonyms) {
            Some(value) => record.set(&spec.name, value),
            None => {
                // Email com valor presente mas inválido é preservado sob
                // chave secundária para inspeção do operador
                if spec.kind == FieldKind::Email && !raw.trim().is_empty() {
                    record.set("email_raw", FieldValue::Text(raw.trim().to_string()));
                }
            }
        }
    }

    // Defaults de sistema para campos obrigatórios ausentes
    let system_defaults = [
        ("status", &synonyms.status),
        ("priority", &synonyms.priority),
        ("source", &synonyms.source),
    ];
    for (name, spec) in system_defaults {
        if record.get(name).is_none() {
            record.set(name, FieldValue::Text(spec.default.clone()));
        }
    }

    record.title = derive_title(&record, row_number);
    // o título serializa pelo campo próprio da struct; a mesma chave em
    // `fields` duplicaria no payload achatado
    record.fields.remove("title");
    record
}

/// Etapa de colapso "última linha vence"
///
/// Registros com a mesma chave natural são reduzidos a um só, com os
/// valores da última ocorrência na ordem do arquivo (a posição na saída é
/// a da primeira ocorrência). Registros sem chave nunca são deduplicados.
/// Retorna também quantas linhas foram substituídas.
fn collapse_last_row_wins(records: Vec<CanonicalRecord>) -> (Vec<CanonicalRecord>, usize) {
    let mut collapsed: Vec<CanonicalRecord> = Vec::with_capacity(records.len());
    let mut slot_by_key: HashMap<String, usize> = HashMap::new();
    let mut superseded = 0;

    for record in records {
        match record.natural_key() {
            Some(key) => {
                if let Some(&slot) = slot_by_key.get(&key) {
                    superseded += 1;
                    collapsed[slot] = record;
                } else {
                    slot_by_key.insert(key, collapsed.len());
                    collapsed.push(record);
                }
            }
            None => collapsed.push(record),
        }
    }

    (collapsed, superseded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MatchConfidence;
    use crate::services::parser::parse_csv_str;

    fn mapping(column: &str, field: &str) -> ColumnMapping {
        ColumnMapping {
            source_column: column.to_string(),
            target_field: Some(field.to_string()),
            confidence: MatchConfidence::High,
            sample_value: String::new(),
        }
    }

    fn plan_for(csv: &str, mappings: &[ColumnMapping]) -> ReconciliationPlan {
        let table = parse_csv_str(csv).unwrap();
        reconcile(&table, mappings, &HashMap::new(), &SynonymTable::default())
    }

    #[test]
    fn test_basic_row_produces_upsert_with_defaults() {
        let plan = plan_for(
            "Nome,Email\nMaria,maria@x.com\n",
            &[mapping("Nome", "name"), mapping("Email", "email")],
        );
        assert_eq!(plan.upserts.len(), 1);
        assert_eq!(plan.rejects.len(), 0);

        let record = &plan.upserts[0];
        assert_eq!(record.title, "Maria");
        assert_eq!(record.source_row, 2);
        assert_eq!(record.text("status"), Some("novo_lead"));
        assert_eq!(record.text("priority"), Some("medium"));
        assert_eq!(record.text("source"), Some("manual"));
    }

    #[test]
    fn test_last_row_wins_within_file() {
        // duas linhas com o mesmo email: vale o valor da última
        let plan = plan_for(
            "Email,Valor\njoao@x.com,100\njoao@x.com,200\n",
            &[mapping("Email", "email"), mapping("Valor", "value")],
        );
        assert_eq!(plan.upserts.len(), 1);
        assert_eq!(plan.superseded, 1);
        let record = &plan.upserts[0];
        assert_eq!(record.get("value").and_then(|v| v.as_number()), Some(200.0));
        assert_eq!(record.source_row, 3);
    }

    #[test]
    fn test_rows_without_key_never_deduplicated() {
        let plan = plan_for(
            "Nome\nMaria\nMaria\nMaria\n",
            &[mapping("Nome", "name")],
        );
        assert_eq!(plan.upserts.len(), 3);
        assert_eq!(plan.superseded, 0);
    }

    #[test]
    fn test_existing_index_marks_update() {
        let table = parse_csv_str("Email\nana@x.com\nnova@x.com\n").unwrap();
        let existing =
            HashMap::from([("ana@x.com".to_string(), "lead-123".to_string())]);
        let plan = reconcile(
            &table,
            &[mapping("Email", "email")],
            &existing,
            &SynonymTable::default(),
        );
        assert_eq!(plan.upserts.len(), 2);
        assert_eq!(plan.update_count(), 1);
        let update = plan
            .upserts
            .iter()
            .find(|r| r.natural_key().as_deref() == Some("ana@x.com"))
            .unwrap();
        assert_eq!(update.existing_id.as_deref(), Some("lead-123"));
    }

    #[test]
    fn test_blank_row_rejected_with_reason() {
        let plan = plan_for(
            "Nome,Outra\n,lixo\nMaria,x\n",
            &[mapping("Nome", "name")],
        );
        assert_eq!(plan.upserts.len(), 1);
        assert_eq!(plan.rejects.len(), 1);
        assert_eq!(plan.rejects[0].row, 2);
        assert!(plan.rejects[0].message.contains("linha vazia"));
    }

    #[test]
    fn test_invalid_email_preserved_as_raw() {
        let plan = plan_for(
            "Nome,Email\nMaria,sem-arroba\n",
            &[mapping("Nome", "name"), mapping("Email", "email")],
        );
        let record = &plan.upserts[0];
        assert_eq!(record.text("email"), None);
        assert_eq!(record.text("email_raw"), Some("sem-arroba"));
        // sem email válido não há chave natural
        assert_eq!(record.natural_key(), None);
    }

    #[test]
    fn test_row_accounting_invariant() {
        // upserts + rejects + superseded == linhas de entrada
        let plan = plan_for(
            "Nome,Email,Obs\nMaria,a@x.com,\nJosé,a@x.com,\n,,so coluna ignorada\nPaula,b@x.com,\n",
            &[mapping("Nome", "name"), mapping("Email", "email")],
        );
        assert_eq!(
            plan.upserts.len() + plan.rejects.len() + plan.superseded,
            4
        );
        assert_eq!(plan.upserts.len(), 2);
        assert_eq!(plan.rejects.len(), 1);
        assert_eq!(plan.superseded, 1);
    }

    #[test]
    fn test_unknown_target_field_ignored() {
        let plan = plan_for(
            "Nome,Misterio\nMaria,zz\n",
            &[mapping("Nome", "name"), mapping("Misterio", "campo_inexistente")],
        );
        let record = &plan.upserts[0];
        assert_eq!(record.get("campo_inexistente"), None);
    }

    #[test]
    fn test_later_column_wins_for_same_target_field() {
        // duas colunas apontando para value: vale a última na ordem do mapeamento
        let plan = plan_for(
            "Valor Antigo,Valor Novo\n100,250\n",
            &[mapping("Valor Antigo", "value"), mapping("Valor Novo", "value")],
        );
        let record = &plan.upserts[0];
        assert_eq!(record.get("value").and_then(|v| v.as_number()), Some(250.0));
    }

    #[test]
    fn test_later_column_without_coercible_value_keeps_earlier() {
        // célula posterior não coercível não apaga o valor já atribuído
        let plan = plan_for(
            "Valor Antigo,Valor Novo\n100,sem numero\n",
            &[mapping("Valor Antigo", "value"), mapping("Valor Novo", "value")],
        );
        let record = &plan.upserts[0];
        assert_eq!(record.get("value").and_then(|v| v.as_number()), Some(100.0));
    }

    #[test]
    fn test_mapped_title_serializes_as_single_key() {
        let plan = plan_for(
            "Titulo,Email\nProposta Acme,x@y.com\n",
            &[mapping("Titulo", "title"), mapping("Email", "email")],
        );
        let record = &plan.upserts[0];
        assert_eq!(record.title, "Proposta Acme");
        let json = serde_json::to_string(record).unwrap();
        assert_eq!(json.matches("\"title\"").count(), 1);
    }

    #[test]
    fn test_title_placeholder_when_only_phone() {
        let plan = plan_for(
            "Telefone\n11987654321\n",
            &[mapping("Telefone", "phone")],
        );
        assert_eq!(plan.upserts[0].title, "Lead importado 2");
    }
}

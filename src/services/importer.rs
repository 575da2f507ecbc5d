//! Orquestração da importação: pré-validações, snapshot de chaves,
//! reconciliação e envio em lotes
//!
//! Execução single-threaded e cooperativa: os únicos pontos de suspensão
//! são a consulta única de chaves existentes e cada chamada de lote ao
//! store. Falha de lote não interrompe os lotes seguintes; o resultado
//! final agrega os desfechos parciais.

use std::collections::HashSet;

use tracing::{info, warn};
use uuid::Uuid;

use crate::config::settings::ImportSettings;
use crate::config::synonyms::{FieldKind, SynonymTable};
use crate::models::{ColumnMapping, ImportResult, ParsedTable, RowError};
use crate::services::coercer::parse_email;
use crate::services::matcher::auto_map_columns;
use crate::services::reconciler::reconcile;
use crate::services::store::LeadStore;
use crate::utils::error::{ImportError, Result};

/// Pipeline completo de importação de leads
pub struct LeadImporter<S: LeadStore> {
    store: S,
    settings: ImportSettings,
    synonyms: SynonymTable,
}

impl<S: LeadStore> LeadImporter<S> {
    pub fn new(store: S) -> Self {
        Self::with_settings(store, ImportSettings::default(), SynonymTable::default())
    }

    pub fn with_settings(store: S, settings: ImportSettings, synonyms: SynonymTable) -> Self {
        Self {
            store,
            settings,
            synonyms,
        }
    }

    pub fn synonyms(&self) -> &SynonymTable {
        &self.synonyms
    }

    /// Executa a importação com mapeamento automático de colunas
    pub async fn run_auto(&self, table: &ParsedTable) -> Result<ImportResult> {
        let mappings = auto_map_columns(table, &self.synonyms);
        self.run(table, &mappings).await
    }

    /// Executa a importação de uma tabela com o mapeamento informado
    ///
    /// Pré-validações falham a execução inteira antes de qualquer escrita;
    /// depois disso o chamador sempre recebe um `ImportResult` agregando
    /// sucessos e falhas parciais.
    pub async fn run(&self, table: &ParsedTable, mappings: &[ColumnMapping]) -> Result<ImportResult> {
        let batch_id = Uuid::new_v4();

        self.preflight(table, mappings)?;

        let mapped_count = mappings.iter().filter(|m| m.target_field.is_some()).count();
        info!(
            "📥 Importação {}: {} linhas, {} de {} colunas mapeadas",
            batch_id,
            table.len(),
            mapped_count,
            mappings.len()
        );

        // Snapshot único das chaves existentes, tirado antes da
        // reconciliação; escritas concorrentes durante o run não são
        // detectadas (last-writer-wins no banco)
        let keys = self.collect_natural_keys(table, mappings);
        let existing_index = self.store.fetch_existing_ids(&keys).await?;

        let plan = reconcile(table, mappings, &existing_index, &self.synonyms);

        let mut result = ImportResult::new(batch_id);
        result.duplicates = plan.superseded + plan.update_count();
        result.failed = plan.rejects.len();
        result.errors.extend(plan.rejects.iter().cloned());

        for (batch_index, chunk) in plan.upserts.chunks(self.settings.batch_size).enumerate() {
            match self.store.upsert_batch(chunk).await {
                Ok(ids) => {
                    result.success += ids.len();
                }
                Err(e) => {
                    warn!("⚠️ Importação {}: lote {} falhou: {}", batch_id, batch_index + 1, e);
                    result.failed += chunk.len();
                    for record in chunk {
                        result.errors.push(RowError {
                            row: record.source_row,
                            message: format!("falha no lote {}: {}", batch_index + 1, e),
                        });
                    }
                }
            }
        }

        info!(
            "✅ Importação {} concluída: {} sucesso, {} falhas, {} duplicados",
            batch_id, result.success, result.failed, result.duplicates
        );
        for error in result.capped_errors(self.settings.max_reported_errors) {
            warn!("Importação {}: linha {}: {}", batch_id, error.row, error.message);
        }
        let hidden = result.errors.len().saturating_sub(self.settings.max_reported_errors);
        if hidden > 0 {
            warn!("Importação {}: mais {} erros omitidos do resumo", batch_id, hidden);
        }

        Ok(result)
    }

    /// Validações que impedem a importação de começar
    fn preflight(&self, table: &ParsedTable, mappings: &[ColumnMapping]) -> Result<()> {
        if table.is_empty() {
            return Err(ImportError::EmptyInput);
        }
        if table.len() > self.settings.max_rows {
            return Err(ImportError::RowLimitExceeded {
                max: self.settings.max_rows,
                got: table.len(),
            });
        }
        if mappings.iter().all(|m| m.target_field.is_none()) {
            return Err(ImportError::NoMappedColumns);
        }
        Ok(())
    }

    /// Chaves naturais (emails válidos) presentes no arquivo, sem repetição
    fn collect_natural_keys(&self, table: &ParsedTable, mappings: &[ColumnMapping]) -> Vec<String> {
        let email_columns: Vec<&str> = mappings
            .iter()
            .filter(|m| {
                m.target_field
                    .as_deref()
                    .and_then(|f| self.synonyms.field(f))
                    .map(|spec| spec.kind == FieldKind::Email)
                    .unwrap_or(false)
            })
            .map(|m| m.source_column.as_str())
            .collect();

        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        for row in &table.rows {
            for column in &email_columns {
                let Some(raw) = row.get(*column) else {
                    continue;
                };
                if let Some(email) = parse_email(raw.trim()) {
                    if seen.insert(email.clone()) {
                        keys.push(email);
                    }
                }
            }
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MatchConfidence;
    use crate::services::parser::parse_csv_str;
    use crate::services::store::MemoryLeadStore;
    use crate::models::CanonicalRecord;

    fn importer(store: MemoryLeadStore) -> LeadImporter<MemoryLeadStore> {
        LeadImporter::new(store)
    }

    fn mapping(column: &str, field: &str) -> ColumnMapping {
        ColumnMapping {
            source_column: column.to_string(),
            target_field: Some(field.to_string()),
            confidence: MatchConfidence::High,
            sample_value: String::new(),
        }
    }

    #[tokio::test]
    async fn test_full_flow_with_auto_mapping() {
        let table = parse_csv_str(
            "Nome,E-mail,Valor,Status\nMaria,maria@x.com,\"R$ 1.500,00\",ganho\nJosé,jose@x.com,200,novo\n",
        )
        .unwrap();
        let importer = importer(MemoryLeadStore::new());

        let result = importer.run_auto(&table).await.unwrap();
        assert_eq!(result.success, 2);
        assert_eq!(result.failed, 0);
        assert_eq!(result.duplicates, 0);
        assert!(result.errors.is_empty());

        let stored = importer.store.find_by_email("maria@x.com").unwrap();
        assert_eq!(stored.record.title, "Maria");
        assert_eq!(
            stored.record.get("value").and_then(|v| v.as_number()),
            Some(1500.0)
        );
        assert_eq!(stored.record.text("status"), Some("fechado_ganho"));
    }

    #[tokio::test]
    async fn test_last_row_wins_end_to_end() {
        // duas linhas com joao@x.com: persiste uma só, com value=200
        let table =
            parse_csv_str("Email,Valor\njoao@x.com,100\njoao@x.com,200\n").unwrap();
        let importer = importer(MemoryLeadStore::new());

        let result = importer
            .run(&table, &[mapping("Email", "email"), mapping("Valor", "value")])
            .await
            .unwrap();

        assert_eq!(result.success, 1);
        assert_eq!(result.duplicates, 1);
        assert_eq!(importer.store.len(), 1);
        let stored = importer.store.find_by_email("joao@x.com").unwrap();
        assert_eq!(stored.record.get("value").and_then(|v| v.as_number()), Some(200.0));
    }

    #[tokio::test]
    async fn test_existing_lead_is_updated_not_duplicated() {
        let store = MemoryLeadStore::new();
        store.seed("ana@x.com", CanonicalRecord::new(0));
        let importer = importer(store);

        let table = parse_csv_str("Email,Valor\nana@x.com,300\n").unwrap();
        let result = importer
            .run(&table, &[mapping("Email", "email"), mapping("Valor", "value")])
            .await
            .unwrap();

        assert_eq!(result.success, 1);
        assert_eq!(result.duplicates, 1);
        assert_eq!(importer.store.len(), 1);
        let stored = importer.store.find_by_email("ana@x.com").unwrap();
        assert_eq!(stored.record.get("value").and_then(|v| v.as_number()), Some(300.0));
    }

    #[tokio::test]
    async fn test_row_limit_rejected_before_any_write() {
        let mut csv = String::from("Email\n");
        for i in 0..5001 {
            csv.push_str(&format!("lead{}@x.com\n", i));
        }
        let table = parse_csv_str(&csv).unwrap();
        let importer = importer(MemoryLeadStore::new());

        let err = importer
            .run(&table, &[mapping("Email", "email")])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ImportError::RowLimitExceeded { max: 5000, got: 5001 }
        ));
        // zero escritas no banco
        assert!(importer.store.is_empty());
    }

    #[tokio::test]
    async fn test_empty_input_and_unmapped_columns_rejected() {
        let importer = importer(MemoryLeadStore::new());

        let empty = parse_csv_str("Email\n").unwrap();
        assert!(matches!(
            importer.run(&empty, &[mapping("Email", "email")]).await,
            Err(ImportError::EmptyInput)
        ));

        let table = parse_csv_str("Email\na@x.com\n").unwrap();
        let unmapped = [ColumnMapping {
            source_column: "Email".to_string(),
            target_field: None,
            confidence: MatchConfidence::Low,
            sample_value: String::new(),
        }];
        assert!(matches!(
            importer.run(&table, &unmapped).await,
            Err(ImportError::NoMappedColumns)
        ));
    }

    #[tokio::test]
    async fn test_partial_batch_failure_is_attributed_per_row() {
        // 100 linhas, lotes de 50; o segundo lote falha
        let mut csv = String::from("Email\n");
        for i in 0..100 {
            csv.push_str(&format!("lead{}@x.com\n", i));
        }
        let table = parse_csv_str(&csv).unwrap();
        let store = MemoryLeadStore::new();
        store.fail_on_call(1);
        let importer = importer(store);

        let result = importer
            .run(&table, &[mapping("Email", "email")])
            .await
            .unwrap();

        assert_eq!(result.success, 50);
        assert_eq!(result.failed, 50);
        assert_eq!(importer.store.len(), 50);
        assert_eq!(result.errors.len(), 50);
        // erros atribuídos às linhas do segundo lote (52..=101 do arquivo)
        assert!(result.errors.iter().all(|e| e.row >= 52 && e.row <= 101));
        assert!(result.errors[0].message.contains("lote 2"));
    }

    #[tokio::test]
    async fn test_identical_runs_produce_identical_counts() {
        let csv = "Email,Valor\na@x.com,1\nb@x.com,2\na@x.com,3\ninvalido,\n";
        let mappings = [mapping("Email", "email"), mapping("Valor", "value")];

        let mut summaries = Vec::new();
        for _ in 0..2 {
            let table = parse_csv_str(csv).unwrap();
            let importer = importer(MemoryLeadStore::new());
            let result = importer.run(&table, &mappings).await.unwrap();
            summaries.push((result.success, result.failed, result.duplicates, result.errors.len()));
        }
        assert_eq!(summaries[0], summaries[1]);
    }

    #[tokio::test]
    async fn test_blank_rows_counted_as_failed_with_reason() {
        let table = parse_csv_str("Email,Obs\na@x.com,\n,so obs\n").unwrap();
        let importer = importer(MemoryLeadStore::new());
        let result = importer
            .run(&table, &[mapping("Email", "email")])
            .await
            .unwrap();
        assert_eq!(result.success, 1);
        assert_eq!(result.failed, 1);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].row, 3);
    }
}

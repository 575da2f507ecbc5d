//! Fronteira de persistência: o driver de upsert em lote
//!
//! O store é o único componente que escreve no banco; o motor de
//! reconciliação nunca persiste nada. Duas implementações:
//! `PostgrestLeadStore` (Supabase/PostgREST via HTTP) e `MemoryLeadStore`
//! (testes e desenvolvimento local).

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::config::settings::StoreSettings;
use crate::models::CanonicalRecord;
use crate::utils::error::{ImportError, Result};

/// Contrato consumido pelo importador
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Consulta em massa `chave natural → id` para as chaves informadas
    /// (uma única chamada antes da reconciliação, nunca por linha)
    async fn fetch_existing_ids(&self, keys: &[String]) -> Result<HashMap<String, String>>;

    /// Insere/atualiza um lote; retorna os ids persistidos.
    /// Um `Err` marca o lote inteiro como falho, sem abortar a importação.
    async fn upsert_batch(&self, records: &[CanonicalRecord]) -> Result<Vec<String>>;
}

/// Store de leads via PostgREST (Supabase)
#[derive(Clone)]
pub struct PostgrestLeadStore {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    table: String,
    organization_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StoredRow {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl PostgrestLeadStore {
    /// Cria um novo store a partir das configurações
    ///
    /// # Timeouts
    ///
    /// - Total: 30s
    /// - Connect: 5s
    pub fn new(settings: &StoreSettings) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| {
                ImportError::ConfigError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            table: settings.table.clone(),
            organization_id: settings.organization_id.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn payload_for(&self, record: &CanonicalRecord) -> Result<Value> {
        let mut value = serde_json::to_value(record)?;
        if let Value::Object(object) = &mut value {
            if let Some(id) = &record.existing_id {
                object.insert("id".to_string(), Value::String(id.clone()));
            }
            if let Some(org) = &self.organization_id {
                object.insert("organization_id".to_string(), Value::String(org.clone()));
            }
        }
        Ok(value)
    }

    async fn error_from(response: reqwest::Response) -> ImportError {
        let status = response.status().as_u16();
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "corpo de resposta ilegível".to_string());
        ImportError::StoreError { status, message }
    }
}

#[async_trait]
impl LeadStore for PostgrestLeadStore {
    async fn fetch_existing_ids(&self, keys: &[String]) -> Result<HashMap<String, String>> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let quoted: Vec<String> = keys.iter().map(|k| format!("\"{}\"", k)).collect();
        let email_filter = format!("in.({})", quoted.join(","));

        let mut request = self
            .http_client
            .get(self.endpoint())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(&[("select", "id,email"), ("email", email_filter.as_str())]);
        if let Some(org) = &self.organization_id {
            request = request.query(&[("organization_id", format!("eq.{}", org))]);
        }

        tracing::debug!("Consultando {} chaves existentes em {}", keys.len(), self.table);

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let rows: Vec<StoredRow> = response.json().await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.email.map(|email| (email.to_lowercase(), row.id)))
            .collect())
    }

    async fn upsert_batch(&self, records: &[CanonicalRecord]) -> Result<Vec<String>> {
        let payload = records
            .iter()
            .map(|record| self.payload_for(record))
            .collect::<Result<Vec<_>>>()?;

        let response = self
            .http_client
            .post(self.endpoint())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            // merge-duplicates: linhas com id existente viram UPDATE
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .query(&[("select", "id")])
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let rows: Vec<StoredRow> = response.json().await?;
        Ok(rows.into_iter().map(|row| row.id).collect())
    }
}

/// Lead persistido pelo store em memória
#[derive(Debug, Clone)]
pub struct StoredLead {
    pub id: String,
    pub record: CanonicalRecord,
}

/// Store em memória para testes e desenvolvimento local
///
/// `fail_on_call(n)` força falha na n-ésima chamada de `upsert_batch`
/// (0-based), para exercitar o caminho de falha parcial de lote.
#[derive(Default)]
pub struct MemoryLeadStore {
    leads: Mutex<Vec<StoredLead>>,
    failing_calls: Mutex<Vec<usize>>,
    upsert_calls: AtomicUsize,
}

impl MemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pré-carrega um lead existente (retorna o id gerado)
    pub fn seed(&self, email: &str, record: CanonicalRecord) -> String {
        let id = Uuid::new_v4().to_string();
        let mut seeded = record;
        seeded.set(
            "email",
            crate::models::FieldValue::Text(email.to_lowercase()),
        );
        self.leads
            .lock()
            .expect("lock do store em memória")
            .push(StoredLead {
                id: id.clone(),
                record: seeded,
            });
        id
    }

    /// Agenda falha simulada para a chamada `call_index` de `upsert_batch`
    pub fn fail_on_call(&self, call_index: usize) {
        self.failing_calls
            .lock()
            .expect("lock do store em memória")
            .push(call_index);
    }

    pub fn len(&self) -> usize {
        self.leads.lock().expect("lock do store em memória").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cópia do lead indexado pela chave natural, se existir
    pub fn find_by_email(&self, email: &str) -> Option<StoredLead> {
        self.leads
            .lock()
            .expect("lock do store em memória")
            .iter()
            .find(|lead| lead.record.natural_key().as_deref() == Some(email))
            .cloned()
    }
}

#[async_trait]
impl LeadStore for MemoryLeadStore {
    async fn fetch_existing_ids(&self, keys: &[String]) -> Result<HashMap<String, String>> {
        let leads = self.leads.lock().expect("lock do store em memória");
        Ok(leads
            .iter()
            .filter_map(|lead| {
                let key = lead.record.natural_key()?;
                if keys.contains(&key) {
                    Some((key, lead.id.clone()))
                } else {
                    None
                }
            })
            .collect())
    }

    async fn upsert_batch(&self, records: &[CanonicalRecord]) -> Result<Vec<String>> {
        let call = self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        let should_fail = {
            let failing = self.failing_calls.lock().expect("lock do store em memória");
            failing.contains(&call)
        };
        if should_fail {
            return Err(ImportError::StoreError {
                status: 500,
                message: format!("falha simulada no lote {}", call + 1),
            });
        }

        let mut leads = self.leads.lock().expect("lock do store em memória");
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            match &record.existing_id {
                Some(id) => {
                    if let Some(stored) = leads.iter_mut().find(|l| &l.id == id) {
                        stored.record = record.clone();
                    }
                    ids.push(id.clone());
                }
                None => {
                    let id = Uuid::new_v4().to_string();
                    leads.push(StoredLead {
                        id: id.clone(),
                        record: record.clone(),
                    });
                    ids.push(id);
                }
            }
        }
        Ok(ids)
    }
}

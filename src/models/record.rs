//! Registro canônico produzido pela coerção de uma linha

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

/// Valor tipado de um campo canônico
///
/// Datas serializam como string ISO (`YYYY-MM-DD`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// Saída coercida de uma linha de entrada
///
/// Transiente: produzido linha a linha e consumido imediatamente pelo
/// motor de reconciliação. Sempre carrega um `title` (ver cadeia de
/// fallback no coercer).
#[derive(Debug, Clone, Serialize)]
pub struct CanonicalRecord {
    pub title: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, FieldValue>,
    /// Id do registro existente no store quando a chave natural casa
    /// (marca o registro como update em vez de insert)
    #[serde(skip)]
    pub existing_id: Option<String>,
    /// Número da linha no arquivo de origem (1 = cabeçalho)
    #[serde(skip)]
    pub source_row: usize,
}

impl CanonicalRecord {
    pub fn new(source_row: usize) -> Self {
        Self {
            title: String::new(),
            fields: BTreeMap::new(),
            existing_id: None,
            source_row,
        }
    }

    pub fn set(&mut self, field: &str, value: FieldValue) {
        self.fields.insert(field.to_string(), value);
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Texto não vazio de um campo, se presente
    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field)
            .and_then(FieldValue::as_text)
            .filter(|s| !s.is_empty())
    }

    /// Chave natural do registro: email válido já lowercased pelo coercer
    pub fn natural_key(&self) -> Option<String> {
        self.text("email").map(|s| s.to_string())
    }
}

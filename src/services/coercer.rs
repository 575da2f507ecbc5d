//! Coerção de células cruas para valores tipados
//!
//! Falha de coerção é silenciosa: o campo fica ausente no registro (o
//! reconciliador decide se isso é estrutural). Enums nunca rejeitam a
//! linha: valor desconhecido cai no default do campo.

use chrono::{Days, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::synonyms::{FieldKind, SynonymTable};
use crate::models::{CanonicalRecord, FieldValue};
use crate::utils::normalization::normalize;

/// Padrão permissivo `local@dominio.tld`
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("regex de email inválida"));

/// Epoch de datas seriais de planilha (1899-12-30, já com a correção do
/// falso bissexto de 1900)
const SERIAL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Maior serial aceito (31/12/9999)
const SERIAL_MAX: u64 = 2_958_465;

/// Converte uma célula crua para o tipo do campo
///
/// Retorna `None` quando a célula é vazia após trim ou falha a validação
/// específica do tipo.
pub fn coerce(raw: &str, kind: FieldKind, table: &SynonymTable) -> Option<FieldValue> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    match kind {
        FieldKind::Text => Some(FieldValue::Text(trimmed.to_string())),
        FieldKind::Money => parse_money(trimmed).map(FieldValue::Number),
        FieldKind::Email => parse_email(trimmed).map(FieldValue::Text),
        FieldKind::Phone => parse_phone(trimmed).map(FieldValue::Text),
        FieldKind::Date => parse_date(trimmed).map(FieldValue::Date),
        FieldKind::Document => parse_digits(trimmed).map(FieldValue::Text),
        FieldKind::Status | FieldKind::Priority | FieldKind::Source => {
            let spec = table.enum_spec(kind)?;
            Some(FieldValue::Text(spec.resolve(&normalize(trimmed))))
        }
    }
}

/// Valor monetário: mantém dígitos, vírgula e ponto; vírgula presente é
/// tratada como separador decimal (pontos viram separador de milhar)
pub fn parse_money(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let normalized = if cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else {
        cleaned
    };

    normalized.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Email válido é lowercased; inválido retorna `None` (o reconciliador
/// preserva o valor cru sob `email_raw`)
pub fn parse_email(raw: &str) -> Option<String> {
    if EMAIL_RE.is_match(raw) {
        Some(raw.to_lowercase())
    } else {
        None
    }
}

/// Telefone: somente dígitos, mínimo de 8
pub fn parse_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() >= 8 {
        Some(digits)
    } else {
        None
    }
}

/// Documento (CNPJ/CPF): somente dígitos, sem validar dígito verificador
pub fn parse_digits(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

/// Data em um dos formatos aceitos
///
/// - ISO `YYYY-MM-DD`
/// - Com barras: `DD/MM/YYYY`, `MM/DD/YYYY`, `YYYY/MM/DD` e variantes de
///   ano com 2 dígitos. Heurística de ambiguidade: assume `DD/MM` a menos
///   que o segmento do meio exceda 12 (aí vira `MM/DD`). Essa heurística é
///   sabidamente imperfeita entre locales; é preservada como está.
/// - Serial de planilha: dias desde 1899-12-30
///
/// Datas impossíveis (ex.: 30 de fevereiro) retornam `None`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();

    // Serial de planilha (número puro, parte fracionária de hora ignorada)
    if let Some(serial) = parse_serial(trimmed) {
        let (y, m, d) = SERIAL_EPOCH;
        return NaiveDate::from_ymd_opt(y, m, d)?.checked_add_days(Days::new(serial));
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }

    parse_slash_date(trimmed)
}

fn parse_serial(raw: &str) -> Option<u64> {
    let (int_part, frac_part) = match raw.split_once('.') {
        Some((i, f)) => (i, f),
        None => (raw, ""),
    };
    if int_part.is_empty() || !int_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if !frac_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let serial: u64 = int_part.parse().ok()?;
    if (1..=SERIAL_MAX).contains(&serial) {
        Some(serial)
    } else {
        None
    }
}

fn parse_slash_date(raw: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = raw.split('/').collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit())) {
        return None;
    }

    // YYYY/MM/DD
    if parts[0].len() == 4 {
        let year: i32 = parts[0].parse().ok()?;
        let month: u32 = parts[1].parse().ok()?;
        let day: u32 = parts[2].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if parts[2].len() != 4 && parts[2].len() != 2 {
        return None;
    }
    let year = expand_year(parts[2].parse().ok()?);
    let first: u32 = parts[0].parse().ok()?;
    let second: u32 = parts[1].parse().ok()?;

    // DD/MM por padrão; se o meio não pode ser mês, troca para MM/DD
    let (day, month) = if second > 12 { (second, first) } else { (first, second) };

    NaiveDate::from_ymd_opt(year, month, day)
}

fn expand_year(year: i32) -> i32 {
    if year < 100 {
        if year < 70 {
            2000 + year
        } else {
            1900 + year
        }
    } else {
        year
    }
}

/// Deriva o título/nome de exibição do registro
///
/// Ordem de fallback: `title` → `name` → `trade_name` → `legal_name` →
/// parte local do email → placeholder com o número da linha.
pub fn derive_title(record: &CanonicalRecord, row_number: usize) -> String {
    for candidate in ["title", "name", "trade_name", "legal_name"] {
        if let Some(text) = record.text(candidate) {
            return text.to_string();
        }
    }
    if let Some(email) = record.text("email") {
        if let Some(local) = email.split('@').next() {
            if !local.is_empty() {
                return local.to_string();
            }
        }
    }
    format!("Lead importado {}", row_number)
}

//! Decodificação de CSV para `ParsedTable`
//!
//! Fronteira de parse do pipeline: daqui para frente só circulam mapas
//! `cabeçalho → célula` de strings. Decodificação binária de XLSX fica a
//! cargo do chamador (fora de escopo).

use std::collections::{HashMap, HashSet};
use std::io::Read;

use crate::models::ParsedTable;
use crate::utils::error::Result;

/// Lê um CSV (UTF-8, com linha de cabeçalho) e produz uma `ParsedTable`
///
/// - Linhas completamente vazias são ignoradas
/// - Células são trimadas
/// - Cabeçalhos duplicados: a coluna mais à direita vence (a célula
///   posterior sobrescreve a anterior no mapa da linha)
pub fn parse_csv<R: Read>(reader: R) -> Result<ParsedTable> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let raw_headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    // Lista de cabeçalhos únicos, preservando a posição da primeira ocorrência
    let mut seen = HashSet::new();
    let headers: Vec<String> = raw_headers
        .iter()
        .filter(|h| !h.is_empty() && seen.insert(h.to_string()))
        .cloned()
        .collect();

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let mut row: HashMap<String, String> = HashMap::new();
        for (i, cell) in record.iter().enumerate() {
            let Some(header) = raw_headers.get(i) else {
                continue;
            };
            if header.is_empty() {
                continue;
            }
            row.insert(header.clone(), cell.trim().to_string());
        }
        rows.push(row);
    }

    tracing::debug!(
        "CSV decodificado: {} colunas, {} linhas",
        headers.len(),
        rows.len()
    );

    Ok(ParsedTable { headers, rows })
}

/// Conveniência para conteúdo já em memória
pub fn parse_csv_str(content: &str) -> Result<ParsedTable> {
    parse_csv(content.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let table = parse_csv_str("Nome,Email\nMaria, maria@x.com \nJosé,jose@x.com\n").unwrap();
        assert_eq!(table.headers, vec!["Nome", "Email"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0]["Email"], "maria@x.com");
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        let table = parse_csv_str("Nome\nMaria\n\n  \nJosé\n").unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_duplicate_header_later_column_wins() {
        let table = parse_csv_str("Telefone,Telefone\n111111111,222222222\n").unwrap();
        assert_eq!(table.headers, vec!["Telefone"]);
        assert_eq!(table.rows[0]["Telefone"], "222222222");
    }

    #[test]
    fn test_short_rows_tolerated() {
        let table = parse_csv_str("Nome,Email,Valor\nMaria,maria@x.com\n").unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0].get("Valor"), None);
    }

    #[test]
    fn test_empty_header_columns_ignored() {
        let table = parse_csv_str("Nome,,Email\nMaria,lixo,maria@x.com\n").unwrap();
        assert_eq!(table.headers, vec!["Nome", "Email"]);
        assert_eq!(table.rows[0].len(), 2);
    }
}

//! Normalização de strings para comparação de cabeçalhos e valores
//!
//! Toda comparação do pipeline (sinônimos de colunas, aliases de enums,
//! chaves naturais) passa primeiro por `normalize`, que reduz a string a
//! uma forma canônica `[a-z0-9_]`.

use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Normaliza uma string para comparação
///
/// - Decompõe via NFKD e remove marcas diacríticas (acentos)
/// - Converte para lowercase
/// - Colapsa cada sequência de caracteres fora de `[a-z0-9]` em um único `_`
/// - Remove `_` no início e no fim
///
/// A função é idempotente e nunca falha (string vazia retorna vazia).
///
/// # Exemplos
/// ```
/// use insightfy_lead_import::utils::normalization::normalize;
///
/// assert_eq!(normalize("Nome Fantasia"), "nome_fantasia");
/// assert_eq!(normalize("Razão Social"), "razao_social");
/// assert_eq!(normalize("  E-mail  "), "e_mail");
/// assert_eq!(normalize(""), "");
/// ```
pub fn normalize(input: &str) -> String {
    let folded = input
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();

    let mut out = String::with_capacity(folded.len());
    let mut pending_separator = false;
    for c in folded.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !out.is_empty() {
                out.push('_');
            }
            pending_separator = false;
            out.push(c);
        } else {
            pending_separator = true;
        }
    }
    out
}

/// Similaridade entre duas strings pelo coeficiente de Dice sobre bigramas
///
/// `2 * |interseção de bigramas| / (|bigramas(a)| + |bigramas(b)|)`
///
/// Strings idênticas retornam 1.0, inclusive as de menos de 2 caracteres.
/// Fora da igualdade exata, qualquer operando com menos de 2 caracteres
/// não tem bigramas e retorna 0.0.
///
/// # Exemplos
/// ```
/// use insightfy_lead_import::utils::normalization::similarity;
///
/// assert_eq!(similarity("telefone", "telefone"), 1.0);
/// assert!(similarity("telefone", "telefones") > 0.8);
/// assert_eq!(similarity("a", "a_b"), 0.0);
/// ```
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::sorensen_dice(a, b)
}

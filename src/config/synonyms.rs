//! Tabela de sinônimos de campos e aliases de enums
//!
//! A tabela é um valor imutável passado explicitamente para o matcher e o
//! coercer (sem estado global), o que permite testes determinísticos com
//! tabelas customizadas. A tabela padrão cobre os cabeçalhos mais comuns
//! de planilhas de leads em português e inglês.
//!
//! Deployments podem substituir a tabela via arquivo YAML apontado pela
//! variável de ambiente `SYNONYM_TABLE_PATH` (ver [`SynonymTable::load`]),
//! no mesmo formato das structs deste módulo.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::utils::error::{ImportError, Result};

/// Tipo de coerção aplicado aos valores de um campo canônico
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Texto livre, apenas trim
    Text,
    /// Valor monetário/numérico (vírgula como separador decimal)
    Money,
    /// Email validado e lowercased
    Email,
    /// Telefone, somente dígitos (mínimo 8)
    Phone,
    /// Data em formatos ISO, com barras ou serial de planilha
    Date,
    /// Documento (CNPJ/CPF), somente dígitos, sem validação de dígito verificador
    Document,
    /// Enum de status do funil
    Status,
    /// Enum de prioridade
    Priority,
    /// Enum de origem do lead
    Source,
}

/// Um campo canônico de destino e seus sinônimos conhecidos
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub synonyms: Vec<String>,
}

/// Valores canônicos, aliases e fallback de um campo enum
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumSpec {
    /// Valor usado quando a célula não corresponde a nenhum valor/alias.
    /// Valor desconhecido é entrada válida com default seguro, não erro.
    pub default: String,
    pub values: Vec<String>,
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

impl EnumSpec {
    /// Resolve um valor já normalizado para o canônico, caindo no default
    pub fn resolve(&self, normalized: &str) -> String {
        if let Some(canonical) = self.aliases.get(normalized) {
            return canonical.clone();
        }
        if self.values.iter().any(|v| v == normalized) {
            return normalized.to_string();
        }
        self.default.clone()
    }
}

/// Tabela completa: campos canônicos + enums de sistema
///
/// A ordem de declaração de `fields` é significativa: desempata matches
/// por similaridade com score idêntico de forma determinística.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynonymTable {
    pub fields: Vec<FieldSpec>,
    pub status: EnumSpec,
    pub priority: EnumSpec,
    pub source: EnumSpec,
}

impl SynonymTable {
    /// Busca a spec de um campo canônico pelo nome
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Spec do enum de sistema associado ao kind, se houver
    pub fn enum_spec(&self, kind: FieldKind) -> Option<&EnumSpec> {
        match kind {
            FieldKind::Status => Some(&self.status),
            FieldKind::Priority => Some(&self.priority),
            FieldKind::Source => Some(&self.source),
            _ => None,
        }
    }

    /// Tabela efetiva do deployment
    ///
    /// Quando `SYNONYM_TABLE_PATH` está definida, carrega o arquivo YAML
    /// apontado por ela; caso contrário usa a tabela padrão embutida.
    pub async fn load() -> Result<Self> {
        match std::env::var("SYNONYM_TABLE_PATH") {
            Ok(path) => Self::load_from_file(&path).await,
            Err(_) => Ok(Self::default()),
        }
    }

    /// Carrega uma tabela customizada a partir de YAML
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| ImportError::ConfigError(format!("Tabela de sinônimos inválida: {}", e)))
    }

    /// Carrega uma tabela customizada de um arquivo local
    pub async fn load_from_file(path: &str) -> Result<Self> {
        tracing::info!("📂 Carregando tabela de sinônimos de: {}", path);
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ImportError::ConfigError(format!("Erro ao ler arquivo {}: {}", path, e)))?;
        Self::from_yaml_str(&content)
    }
}

fn field(name: &str, kind: FieldKind, synonyms: &[&str]) -> FieldSpec {
    FieldSpec {
        name: name.to_string(),
        kind,
        synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
    }
}

fn aliases(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect()
}

impl Default for SynonymTable {
    fn default() -> Self {
        let fields = vec![
            field(
                "title",
                FieldKind::Text,
                &["titulo", "title", "assunto", "subject"],
            ),
            field(
                "name",
                FieldKind::Text,
                &[
                    "nome",
                    "name",
                    "cliente",
                    "lead",
                    "contato",
                    "contact",
                    "customer",
                    "nome_completo",
                ],
            ),
            field(
                "email",
                FieldKind::Email,
                &["email", "e_mail", "mail", "correio", "endereco_de_email"],
            ),
            field(
                "phone",
                FieldKind::Phone,
                &[
                    "telefone", "phone", "celular", "whatsapp", "fone", "tel", "mobile",
                ],
            ),
            field(
                "value",
                FieldKind::Money,
                &[
                    "valor",
                    "value",
                    "receita",
                    "faturamento",
                    "orcamento",
                    "budget",
                    "preco",
                    "price",
                ],
            ),
            field(
                "status",
                FieldKind::Status,
                &["status", "estagio", "etapa", "fase", "stage", "situacao"],
            ),
            field(
                "priority",
                FieldKind::Priority,
                &["prioridade", "priority", "urgencia"],
            ),
            field(
                "source",
                FieldKind::Source,
                &["origem", "source", "fonte", "canal"],
            ),
            field(
                "product_interest",
                FieldKind::Text,
                &[
                    "produto", "product", "interesse", "interest", "servico", "service",
                ],
            ),
            field(
                "notes",
                FieldKind::Text,
                &[
                    "notas",
                    "notes",
                    "observacoes",
                    "obs",
                    "comentarios",
                    "comments",
                    "descricao",
                    "description",
                    "detalhes",
                ],
            ),
            field(
                "trade_name",
                FieldKind::Text,
                &["nome_fantasia", "fantasia", "nome_comercial"],
            ),
            field(
                "legal_name",
                FieldKind::Text,
                &[
                    "razao_social",
                    "razaosocial",
                    "nome_empresarial",
                    "empresa",
                    "company",
                ],
            ),
            field(
                "document",
                FieldKind::Document,
                &["cnpj", "cpf", "cpf_cnpj", "cnpj_cpf", "documento"],
            ),
            field(
                "opened_at",
                FieldKind::Date,
                &[
                    "data_de_abertura",
                    "data_abertura",
                    "abertura",
                    "dt_abertura",
                ],
            ),
            field(
                "expected_close_date",
                FieldKind::Date,
                &[
                    "previsao_de_fechamento",
                    "data_prevista",
                    "expected_close",
                    "data_de_fechamento",
                ],
            ),
            field("city", FieldKind::Text, &["cidade", "municipio", "localidade"]),
            field("state", FieldKind::Text, &["estado", "uf", "unidade_federativa"]),
            field(
                "postal_code",
                FieldKind::Text,
                &["cep", "codigo_postal", "postal_code"],
            ),
        ];

        let status = EnumSpec {
            default: "novo_lead".to_string(),
            values: [
                "novo_lead",
                "qualificacao",
                "proposta",
                "negociacao",
                "fechado_ganho",
                "fechado_perdido",
                "follow_up",
                "aguardando_resposta",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            aliases: aliases(&[
                ("novo", "novo_lead"),
                ("new", "novo_lead"),
                ("qualificado", "qualificacao"),
                ("qualified", "qualificacao"),
                ("proposal", "proposta"),
                ("negotiation", "negociacao"),
                ("ganho", "fechado_ganho"),
                ("won", "fechado_ganho"),
                ("perdido", "fechado_perdido"),
                ("lost", "fechado_perdido"),
                ("follow", "follow_up"),
                ("aguardando", "aguardando_resposta"),
            ]),
        };

        let priority = EnumSpec {
            default: "medium".to_string(),
            values: ["low", "medium", "high", "urgent"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            aliases: aliases(&[
                ("baixa", "low"),
                ("media", "medium"),
                ("medio", "medium"),
                ("alta", "high"),
                ("urgente", "urgent"),
            ]),
        };

        let source = EnumSpec {
            default: "manual".to_string(),
            values: [
                "manual",
                "meta_ads",
                "google_ads",
                "whatsapp",
                "indicacao",
                "site",
                "telefone",
                "email",
                "evento",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            aliases: aliases(&[
                ("meta", "meta_ads"),
                ("facebook", "meta_ads"),
                ("instagram", "meta_ads"),
                ("google", "google_ads"),
                ("whats", "whatsapp"),
                ("referral", "indicacao"),
                ("referencia", "indicacao"),
                ("website", "site"),
                ("phone", "telefone"),
                ("event", "evento"),
            ]),
        };

        Self {
            fields,
            status,
            priority,
            source,
        }
    }
}

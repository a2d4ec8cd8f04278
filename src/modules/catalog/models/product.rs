use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Identity-document kinds a seller may accept at checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Brazilian individual taxpayer id (11 digits)
    Cpf,
    /// Brazilian company taxpayer id (14 digits)
    Cnpj,
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentKind::Cpf => write!(f, "cpf"),
            DocumentKind::Cnpj => write!(f, "cnpj"),
        }
    }
}

impl std::str::FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "cpf" => Ok(DocumentKind::Cpf),
            "cnpj" => Ok(DocumentKind::Cnpj),
            _ => Err(format!("Invalid document kind: {}", s)),
        }
    }
}

/// Sellable product owned by one seller
///
/// The payment block names the active processor and accepted documents; the upsell
/// block names the funnel's final success destination. Read-only at checkout time;
/// mutation happens through seller consoles outside this core.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: String,

    /// Owning seller
    pub seller_id: String,

    pub name: String,

    pub description: Option<String>,

    /// Active processor for this product ("stripe" or "mercadopago")
    pub processor_id: String,

    /// Comma-separated accepted document kinds, e.g. "cpf,cnpj"
    pub accepted_documents: String,

    /// Destination the buyer lands on once the funnel is exhausted or accepted
    pub success_url: String,

    #[serde(skip_deserializing)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(skip_deserializing)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Parsed accepted-document kinds, skipping unknown entries
    pub fn accepted_document_kinds(&self) -> Vec<DocumentKind> {
        self.accepted_documents
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect()
    }
}

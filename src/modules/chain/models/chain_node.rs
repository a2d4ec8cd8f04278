use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Kind of a post-purchase chain step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR(10)", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChainNodeKind {
    Upsell,
    Downsell,
}

impl std::fmt::Display for ChainNodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainNodeKind::Upsell => write!(f, "upsell"),
            ChainNodeKind::Downsell => write!(f, "downsell"),
        }
    }
}

/// One upsell or downsell step bound to a product
///
/// The chain is a singly-linked sequence ordered by `position`; advancing always
/// moves to a strictly greater position, so a declined node is never re-presented
/// within a session.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChainNode {
    pub id: String,

    pub product_id: String,

    pub kind: ChainNodeKind,

    /// Offer presented at this step
    pub offer_id: String,

    pub active: bool,

    /// Chain order; unique per product
    pub position: i32,

    #[serde(skip_deserializing)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(skip_deserializing)]
    pub updated_at: Option<DateTime<Utc>>,
}

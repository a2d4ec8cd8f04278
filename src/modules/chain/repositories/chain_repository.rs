use super::super::models::ChainNode;
use crate::core::Result;
use async_trait::async_trait;
use sqlx::MySqlPool;

/// Read access to a product's upsell/downsell chain
#[async_trait]
pub trait ChainRepository: Send + Sync {
    /// Locate the active node presenting `offer_id` within `product_id`'s chain
    async fn find_node(&self, product_id: &str, offer_id: &str) -> Result<Option<ChainNode>>;

    /// The next active node strictly after `position`, in chain order
    async fn next_active_node(&self, product_id: &str, position: i32)
        -> Result<Option<ChainNode>>;
}

/// MySQL-backed chain repository
pub struct SqlChainRepository {
    pool: MySqlPool,
}

impl SqlChainRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChainRepository for SqlChainRepository {
    async fn find_node(&self, product_id: &str, offer_id: &str) -> Result<Option<ChainNode>> {
        let node = sqlx::query_as::<_, ChainNode>(
            r#"
            SELECT id, product_id, kind, offer_id, active, position, created_at, updated_at
            FROM chain_nodes
            WHERE product_id = ? AND offer_id = ? AND active = TRUE
            "#,
        )
        .bind(product_id)
        .bind(offer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(node)
    }

    async fn next_active_node(
        &self,
        product_id: &str,
        position: i32,
    ) -> Result<Option<ChainNode>> {
        let node = sqlx::query_as::<_, ChainNode>(
            r#"
            SELECT id, product_id, kind, offer_id, active, position, created_at, updated_at
            FROM chain_nodes
            WHERE product_id = ? AND active = TRUE AND position > ?
            ORDER BY position ASC
            LIMIT 1
            "#,
        )
        .bind(product_id)
        .bind(position)
        .fetch_optional(&self.pool)
        .await?;

        Ok(node)
    }
}

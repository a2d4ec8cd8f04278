use super::super::models::{Offer, Product};
use crate::core::Result;
use async_trait::async_trait;
use sqlx::MySqlPool;

/// Read-only access to products and offers
///
/// The checkout path only ever reads; seller consoles own all mutation.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn find_product(&self, product_id: &str) -> Result<Option<Product>>;

    async fn find_offer(&self, offer_id: &str) -> Result<Option<Offer>>;
}

/// MySQL-backed catalog repository
pub struct SqlCatalogRepository {
    pool: MySqlPool,
}

impl SqlCatalogRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for SqlCatalogRepository {
    async fn find_product(&self, product_id: &str) -> Result<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT
                id, seller_id, name, description, processor_id,
                accepted_documents, success_url, created_at, updated_at
            FROM products
            WHERE id = ?
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    async fn find_offer(&self, offer_id: &str) -> Result<Option<Offer>> {
        let offer = sqlx::query_as::<_, Offer>(
            r#"
            SELECT
                id, product_id, price, currency, language, billing_type,
                cycle_length, cycle_unit, trial_days, active, created_at, updated_at
            FROM offers
            WHERE id = ?
            "#,
        )
        .bind(offer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(offer)
    }
}

use super::super::models::{Offer, Product};
use super::super::repositories::CatalogRepository;
use crate::core::{AppError, Result};
use std::sync::Arc;

/// An offer resolved together with its parent product's payment configuration
#[derive(Debug, Clone)]
pub struct ResolvedOffer {
    pub product: Product,
    pub offer: Offer,
}

/// Offer resolution for the checkout path
///
/// Every call re-reads the backing store so the latest committed price is always
/// the one charged.
pub struct CatalogService {
    repo: Arc<dyn CatalogRepository>,
}

impl CatalogService {
    pub fn new(repo: Arc<dyn CatalogRepository>) -> Self {
        Self { repo }
    }

    /// Resolve a (product, offer) reference into priced checkout data
    ///
    /// Fails with `NotFound` when either id is absent, the offer does not belong
    /// to the product, or the offer is inactive.
    pub async fn resolve_offer(&self, product_id: &str, offer_id: &str) -> Result<ResolvedOffer> {
        let product = self
            .repo
            .find_product(product_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Product '{}' not found", product_id)))?;

        let offer = self
            .repo
            .find_offer(offer_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Offer '{}' not found", offer_id)))?;

        if offer.product_id != product.id {
            return Err(AppError::not_found(format!(
                "Offer '{}' does not belong to product '{}'",
                offer_id, product_id
            )));
        }

        if !offer.active {
            return Err(AppError::not_found(format!(
                "Offer '{}' is inactive",
                offer_id
            )));
        }

        Ok(ResolvedOffer { product, offer })
    }

    /// Resolve a product by id
    pub async fn resolve_product(&self, product_id: &str) -> Result<Product> {
        self.repo
            .find_product(product_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Product '{}' not found", product_id)))
    }

    /// Resolve an offer by id alone, returning its parent product as well
    ///
    /// Chain steps reference offers directly; the parent product is recovered from
    /// the offer row.
    pub async fn resolve_chain_offer(&self, offer_id: &str) -> Result<ResolvedOffer> {
        let offer = self
            .repo
            .find_offer(offer_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Offer '{}' not found", offer_id)))?;

        if !offer.active {
            return Err(AppError::not_found(format!(
                "Offer '{}' is inactive",
                offer_id
            )));
        }

        let product = self
            .repo
            .find_product(&offer.product_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Product '{}' not found", offer.product_id))
            })?;

        Ok(ResolvedOffer { product, offer })
    }
}

use crate::core::Result;
use crate::modules::payments::models::Payment;
use async_trait::async_trait;
use tracing::info;

/// Product-access collaborator
///
/// Granting and revoking delivery access lives outside this core; the webhook
/// handler only needs the seam.
#[async_trait]
pub trait AccessGranter: Send + Sync {
    async fn grant(&self, payment: &Payment) -> Result<()>;

    async fn revoke(&self, payment: &Payment) -> Result<()>;
}

/// Default implementation that records intent in the log stream
pub struct LogAccessGranter;

#[async_trait]
impl AccessGranter for LogAccessGranter {
    async fn grant(&self, payment: &Payment) -> Result<()> {
        info!(
            payment_id = %payment.id,
            product_id = %payment.product_id,
            buyer_email = %payment.buyer_email,
            "Granting product access"
        );
        Ok(())
    }

    async fn revoke(&self, payment: &Payment) -> Result<()> {
        info!(
            payment_id = %payment.id,
            product_id = %payment.product_id,
            buyer_email = %payment.buyer_email,
            "Revoking product access"
        );
        Ok(())
    }
}

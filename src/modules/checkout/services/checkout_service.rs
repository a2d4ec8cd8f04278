use crate::core::{AppError, Result};
use crate::modules::catalog::models::DocumentKind;
use crate::modules::catalog::services::CatalogService;
use crate::modules::payments::models::{BuyerIdentity, Payment, PaymentStatus};
use crate::modules::payments::repositories::PaymentRepository;
use crate::modules::processors::services::{IntentRequest, ProcessorIntent, ProcessorRegistry};
use std::sync::Arc;
use tracing::{error, info};

/// Result of starting a checkout: the pending payment row plus whatever the buyer
/// needs to complete it (client secret or pix code)
#[derive(Debug, Clone, serde::Serialize)]
pub struct CheckoutSession {
    pub payment: Payment,
    pub intent: ProcessorIntent,
}

/// Buyer-facing purchase orchestration
///
/// Owns payment-row creation; completion is exclusively the webhook handler's
/// business. Nothing here ever moves a payment out of `pending` on buyer input.
pub struct CheckoutService {
    catalog: Arc<CatalogService>,
    payments: Arc<dyn PaymentRepository>,
    processors: Arc<ProcessorRegistry>,
}

impl CheckoutService {
    pub fn new(
        catalog: Arc<CatalogService>,
        payments: Arc<dyn PaymentRepository>,
        processors: Arc<ProcessorRegistry>,
    ) -> Self {
        Self {
            catalog,
            payments,
            processors,
        }
    }

    /// Start a checkout for (product, offer) with the given buyer identity
    ///
    /// Resolution, currency support, and buyer completeness are all checked before
    /// any remote call. On adapter failure the payment row is immediately marked
    /// `failed` so no `pending` row without a processor-side artifact survives.
    pub async fn start_checkout(
        &self,
        product_id: &str,
        offer_id: &str,
        buyer: BuyerIdentity,
    ) -> Result<CheckoutSession> {
        let resolved = self.catalog.resolve_offer(product_id, offer_id).await?;
        resolved.offer.validate()?;
        let processor = self.processors.get(&resolved.product.processor_id)?;

        // Fail fast, before the payment row and before any network round-trip
        if !processor.supports_currency(resolved.offer.currency) {
            return Err(AppError::UnsupportedCurrency(format!(
                "Processor '{}' does not support {}",
                processor.name(),
                resolved.offer.currency
            )));
        }

        processor.validate_buyer(&buyer)?;

        // Sellers choose which document kinds they accept; reject the rest before
        // the identity reaches the processor
        if let Some(digits) = buyer.normalized_tax_id().filter(|d| !d.is_empty()) {
            let kind = if digits.len() == 14 {
                DocumentKind::Cnpj
            } else {
                DocumentKind::Cpf
            };
            if !resolved.product.accepted_document_kinds().contains(&kind) {
                return Err(AppError::InvalidBuyerIdentity(format!(
                    "Documents of type {} are not accepted for this product",
                    kind
                )));
            }
        }

        let mut payment = Payment::new(
            resolved.product.id.clone(),
            resolved.offer.id.clone(),
            resolved.product.processor_id.clone(),
            resolved.offer.price,
            resolved.offer.currency,
            &buyer,
        )?;

        self.payments.create(&payment).await?;

        info!(
            payment_id = %payment.id,
            processor = %processor.name(),
            amount = %payment.amount,
            currency = %payment.currency,
            "Payment created, requesting processor intent"
        );

        let request = IntentRequest {
            reference: payment.id.clone(),
            amount: payment.amount,
            currency: payment.currency,
            description: resolved.product.name.clone(),
            buyer,
        };

        let intent = match processor.create_intent(request).await {
            Ok(intent) => intent,
            Err(e) => {
                error!(
                    payment_id = %payment.id,
                    processor = %processor.name(),
                    error = %e,
                    "Intent creation failed, marking payment failed"
                );
                self.payments
                    .transition_status(&payment.id, PaymentStatus::Pending, PaymentStatus::Failed)
                    .await?;
                return Err(e);
            }
        };

        self.payments
            .attach_intent(
                &payment.id,
                intent.processor_payment_id(),
                intent.expires_at(),
            )
            .await?;

        payment.processor_payment_id = Some(intent.processor_payment_id().to_string());
        payment.expires_at = intent.expires_at();

        Ok(CheckoutSession { payment, intent })
    }
}

use super::super::models::{ChainNode, ChainNodeKind};
use super::super::repositories::ChainRepository;
use crate::core::{AppError, Result};
use crate::modules::catalog::models::Offer;
use crate::modules::catalog::services::CatalogService;
use crate::modules::payments::models::{Payment, PaymentStatus};
use crate::modules::payments::repositories::PaymentRepository;
use crate::modules::processors::services::{IntentRequest, ProcessorIntent, ProcessorRegistry};
use std::sync::Arc;
use tracing::{info, warn};

/// One step of a post-purchase funnel, or its end
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChainStep {
    Offer {
        node: ChainNode,
        offer: Offer,
    },
    /// Chain exhausted (or accepted): send the buyer to the product's configured
    /// success destination
    Terminal { success_url: String },
}

/// Result of accepting a chain offer
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChainAcceptOutcome {
    Accepted {
        payment: Payment,
        intent: ProcessorIntent,
    },
    /// The original method could not be reused; treated as an automatic decline
    /// so a broken upsell never strands a buyer who already paid
    Skipped { next: ChainStep },
}

/// Post-purchase upsell/downsell funnel controller
///
/// Creates new payment rows for accepted steps but never mutates existing ones;
/// completion of follow-on payments is the webhook handler's business like any
/// other payment. Buyer identity and payment credentials are never re-collected.
pub struct ChainService {
    chain: Arc<dyn ChainRepository>,
    catalog: Arc<CatalogService>,
    payments: Arc<dyn PaymentRepository>,
    processors: Arc<ProcessorRegistry>,
}

impl ChainService {
    pub fn new(
        chain: Arc<dyn ChainRepository>,
        catalog: Arc<CatalogService>,
        payments: Arc<dyn PaymentRepository>,
        processors: Arc<ProcessorRegistry>,
    ) -> Self {
        Self {
            chain,
            catalog,
            payments,
            processors,
        }
    }

    /// Present the chain step at `offer_id` for the buyer who made
    /// `original_payment_id`
    pub async fn present(
        &self,
        kind: ChainNodeKind,
        offer_id: &str,
        original_payment_id: &str,
    ) -> Result<ChainStep> {
        let original = self.load_completed_payment(original_payment_id).await?;
        let node = self.load_node(&original.product_id, offer_id, kind).await?;
        let resolved = self.catalog.resolve_chain_offer(&node.offer_id).await?;

        Ok(ChainStep::Offer {
            node,
            offer: resolved.offer,
        })
    }

    /// Accept the chain step at `offer_id`, reusing the original payment method
    pub async fn accept(
        &self,
        kind: ChainNodeKind,
        offer_id: &str,
        original_payment_id: &str,
    ) -> Result<ChainAcceptOutcome> {
        let original = self.load_completed_payment(original_payment_id).await?;
        let node = self.load_node(&original.product_id, offer_id, kind).await?;
        let resolved = self.catalog.resolve_chain_offer(&node.offer_id).await?;

        let processor = self.processors.get(&original.processor_id)?;
        if !processor.supports_currency(resolved.offer.currency) {
            return Err(AppError::UnsupportedCurrency(format!(
                "Processor '{}' does not support {}",
                processor.name(),
                resolved.offer.currency
            )));
        }

        let method_ref = match &original.payment_method_ref {
            Some(method_ref) => method_ref.clone(),
            None => {
                // Completed payment without a stored token; nothing to reuse
                warn!(
                    original_payment_id = %original.id,
                    "No reusable payment method on original payment, auto-declining chain step"
                );
                return self.skip(&original, &node).await;
            }
        };

        let payment = Payment::new_follow_on(
            &original,
            resolved.offer.id.clone(),
            resolved.offer.price,
            resolved.offer.currency,
        )?;
        self.payments.create(&payment).await?;

        let request = IntentRequest {
            reference: payment.id.clone(),
            amount: payment.amount,
            currency: payment.currency,
            description: resolved.product.name.clone(),
            buyer: original.buyer_identity(),
        };

        match processor.create_follow_on_intent(request, &method_ref).await {
            Ok(intent) => {
                self.payments
                    .attach_intent(
                        &payment.id,
                        intent.processor_payment_id(),
                        intent.expires_at(),
                    )
                    .await?;

                info!(
                    payment_id = %payment.id,
                    original_payment_id = %original.id,
                    node_id = %node.id,
                    "Chain step accepted, follow-on intent created"
                );

                let mut payment = payment;
                payment.processor_payment_id =
                    Some(intent.processor_payment_id().to_string());
                payment.expires_at = intent.expires_at();

                Ok(ChainAcceptOutcome::Accepted { payment, intent })
            }
            Err(AppError::MethodNotReusable(reason)) => {
                warn!(
                    payment_id = %payment.id,
                    original_payment_id = %original.id,
                    reason = %reason,
                    "Original payment method not reusable, auto-declining chain step"
                );
                self.payments
                    .transition_status(&payment.id, PaymentStatus::Pending, PaymentStatus::Failed)
                    .await?;
                self.skip(&original, &node).await
            }
            Err(e) => {
                self.payments
                    .transition_status(&payment.id, PaymentStatus::Pending, PaymentStatus::Failed)
                    .await?;
                Err(e)
            }
        }
    }

    /// Decline the chain step at `offer_id` and advance past it
    pub async fn decline(
        &self,
        kind: ChainNodeKind,
        offer_id: &str,
        original_payment_id: &str,
    ) -> Result<ChainStep> {
        let original = self.load_completed_payment(original_payment_id).await?;
        let node = self.load_node(&original.product_id, offer_id, kind).await?;

        info!(
            original_payment_id = %original.id,
            node_id = %node.id,
            position = node.position,
            "Chain step declined, advancing"
        );

        self.step_after(&original, node.position).await
    }

    /// Step following `position`, or the terminal success destination
    async fn step_after(&self, original: &Payment, position: i32) -> Result<ChainStep> {
        let mut cursor = position;

        while let Some(next) = self
            .chain
            .next_active_node(&original.product_id, cursor)
            .await?
        {
            // A node pointing at a missing or inactive offer is skipped rather
            // than shown as a broken page
            match self.catalog.resolve_chain_offer(&next.offer_id).await {
                Ok(resolved) => {
                    return Ok(ChainStep::Offer {
                        node: next,
                        offer: resolved.offer,
                    })
                }
                Err(AppError::NotFound(_)) => {
                    warn!(
                        node_id = %next.id,
                        offer_id = %next.offer_id,
                        "Chain node references unavailable offer, skipping"
                    );
                    cursor = next.position;
                }
                Err(e) => return Err(e),
            }
        }

        let product = self.catalog.resolve_product(&original.product_id).await?;

        Ok(ChainStep::Terminal {
            success_url: product.success_url,
        })
    }

    async fn skip(&self, original: &Payment, node: &ChainNode) -> Result<ChainAcceptOutcome> {
        let next = self.step_after(original, node.position).await?;
        Ok(ChainAcceptOutcome::Skipped { next })
    }

    /// Chain steps hang off a completed primary payment; anything else is not a
    /// valid entry point
    async fn load_completed_payment(&self, payment_id: &str) -> Result<Payment> {
        let payment = self
            .payments
            .find_by_id(payment_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Payment '{}' not found", payment_id)))?;

        if !payment.is_completed() {
            return Err(AppError::validation(
                "Chain offers require a completed primary payment",
            ));
        }

        Ok(payment)
    }

    async fn load_node(
        &self,
        product_id: &str,
        offer_id: &str,
        kind: ChainNodeKind,
    ) -> Result<ChainNode> {
        let node = self
            .chain
            .find_node(product_id, offer_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!(
                    "No active chain node for offer '{}' on product '{}'",
                    offer_id, product_id
                ))
            })?;

        if node.kind != kind {
            return Err(AppError::not_found(format!(
                "Chain node for offer '{}' is not a {}",
                offer_id, kind
            )));
        }

        Ok(node)
    }
}

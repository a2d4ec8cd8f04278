use crate::core::Result;
use crate::modules::fulfillment::services::{AccessGranter, NotificationKind, Notifier};
use crate::modules::payments::models::{Payment, PaymentStatus};
use crate::modules::payments::repositories::PaymentRepository;
use crate::modules::processors::services::{EventStatus, ProcessorEvent};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Outcome of applying one normalized processor event
///
/// Everything except a storage failure is acknowledged to the processor;
/// redelivery must only happen for transient faults on our side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Transition applied by this delivery
    Applied {
        payment_id: String,
        status: PaymentStatus,
    },
    /// The payment already carries the event's status; side effects skipped
    Duplicate { payment_id: String },
    /// No payment matches the processor reference; processors retry blindly, so
    /// this is not an error to the caller
    UnknownPayment { processor_payment_id: String },
    /// The event asked for an edge the lifecycle does not allow
    InvalidTransition {
        payment_id: String,
        current: PaymentStatus,
    },
    /// Instant-transfer event arrived after the code expired; payment stays
    /// pending (abandoned, never force-failed)
    ExpiredCode { payment_id: String },
}

/// Sole mutator of payment status after creation
///
/// Both inbound streams (buyer actions, webhook deliveries) reconcile through the
/// conditional transition in the repository; this service never holds a lock across
/// its awaits.
pub struct WebhookService {
    payments: Arc<dyn PaymentRepository>,
    access: Arc<dyn AccessGranter>,
    notifier: Arc<dyn Notifier>,
}

impl WebhookService {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        access: Arc<dyn AccessGranter>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            payments,
            access,
            notifier,
        }
    }

    /// Apply a validated, normalized processor event to its payment
    ///
    /// Errors out only on storage failures; those surface as 5xx so the processor
    /// redelivers.
    pub async fn handle_event(&self, processor: &str, event: ProcessorEvent) -> Result<WebhookOutcome> {
        let payment = match self
            .payments
            .find_by_processor_ref(&event.processor_payment_id)
            .await?
        {
            Some(payment) => payment,
            None => {
                warn!(
                    processor = %processor,
                    processor_payment_id = %event.processor_payment_id,
                    "Webhook references unknown payment, dropping"
                );
                return Ok(WebhookOutcome::UnknownPayment {
                    processor_payment_id: event.processor_payment_id,
                });
            }
        };

        // Expiry only guards pending rows; a completed payment may still be
        // refunded long after its original code lapsed
        if payment.status == PaymentStatus::Pending && payment.is_expired_at(Utc::now()) {
            warn!(
                payment_id = %payment.id,
                "Webhook for expired payment code, leaving payment pending"
            );
            return Ok(WebhookOutcome::ExpiredCode {
                payment_id: payment.id,
            });
        }

        let target = match event.new_status {
            EventStatus::Succeeded => PaymentStatus::Completed,
            EventStatus::Failed => PaymentStatus::Failed,
            EventStatus::Refunded => PaymentStatus::Refunded,
        };

        if payment.status == target {
            info!(
                payment_id = %payment.id,
                status = %target,
                "Duplicate webhook delivery, acknowledging as no-op"
            );
            return Ok(WebhookOutcome::Duplicate {
                payment_id: payment.id,
            });
        }

        if !payment.status.can_transition(target) {
            warn!(
                payment_id = %payment.id,
                current = %payment.status,
                requested = %target,
                "Webhook requested invalid transition, dropping"
            );
            return Ok(WebhookOutcome::InvalidTransition {
                payment_id: payment.id,
                current: payment.status,
            });
        }

        let applied = self
            .payments
            .transition_status(&payment.id, payment.status, target)
            .await?;

        if !applied {
            // Another writer moved the row between our read and the update
            let current = self
                .payments
                .find_by_id(&payment.id)
                .await?
                .map(|p| p.status)
                .unwrap_or(payment.status);

            if current == target {
                return Ok(WebhookOutcome::Duplicate {
                    payment_id: payment.id,
                });
            }

            warn!(
                payment_id = %payment.id,
                current = %current,
                requested = %target,
                "Concurrent transition conflict, dropping"
            );
            return Ok(WebhookOutcome::InvalidTransition {
                payment_id: payment.id,
                current,
            });
        }

        info!(
            payment_id = %payment.id,
            from = %payment.status,
            to = %target,
            "Payment transition applied"
        );

        match target {
            PaymentStatus::Completed => {
                // The method token arrives with the success event; stored so chain
                // follow-ons can reuse it
                if let Some(method_ref) = &event.payment_method_ref {
                    self.payments.attach_method_ref(&payment.id, method_ref).await?;
                }
                self.run_completed_side_effects(&payment).await;
            }
            PaymentStatus::Refunded => {
                self.run_refunded_side_effects(&payment).await;
            }
            _ => {}
        }

        Ok(WebhookOutcome::Applied {
            payment_id: payment.id,
            status: target,
        })
    }

    /// Access grant and buyer notification, exactly once per completion
    ///
    /// The conditional transition above is the once-only gate; this runs only on
    /// the delivery that actually won it. Collaborator failures are logged and
    /// never fail the event.
    async fn run_completed_side_effects(&self, payment: &Payment) {
        if let Err(e) = self.access.grant(payment).await {
            error!(payment_id = %payment.id, error = %e, "Access grant failed");
        }

        let payload = serde_json::json!({
            "payment_id": payment.id,
            "product_id": payment.product_id,
            "offer_id": payment.offer_id,
            "amount": payment.amount,
            "currency": payment.currency,
        });
        if let Err(e) = self
            .notifier
            .notify(NotificationKind::PurchaseConfirmed, &payment.buyer_email, &payload)
            .await
        {
            error!(payment_id = %payment.id, error = %e, "Purchase notification failed");
        }
    }

    async fn run_refunded_side_effects(&self, payment: &Payment) {
        if let Err(e) = self.access.revoke(payment).await {
            error!(payment_id = %payment.id, error = %e, "Access revocation failed");
        }

        let payload = serde_json::json!({
            "payment_id": payment.id,
            "product_id": payment.product_id,
            "amount": payment.amount,
            "currency": payment.currency,
        });
        if let Err(e) = self
            .notifier
            .notify(NotificationKind::PaymentRefunded, &payment.buyer_email, &payload)
            .await
        {
            error!(payment_id = %payment.id, error = %e, "Refund notification failed");
        }
    }
}

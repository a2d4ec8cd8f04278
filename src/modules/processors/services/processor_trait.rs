use crate::core::{Currency, Result};
use crate::modules::payments::models::BuyerIdentity;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Uniform interface over interchangeable payment processors
///
/// Implementations translate their own error vocabulary into the shared `AppError`
/// taxonomy; upstream components never see processor-specific error shapes.
#[async_trait]
pub trait ProcessorAdapter: Send + Sync {
    /// Processor identifier as referenced by product payment configuration
    fn name(&self) -> &str;

    fn supported_currencies(&self) -> &[Currency];

    fn supports_currency(&self, currency: Currency) -> bool {
        self.supported_currencies().contains(&currency)
    }

    /// Check buyer-identity completeness for this processor before any remote call
    fn validate_buyer(&self, buyer: &BuyerIdentity) -> Result<()>;

    /// Create a processor-side payment intent for a fresh checkout
    async fn create_intent(&self, request: IntentRequest) -> Result<ProcessorIntent>;

    /// Create an intent that reuses an already-authorized payment method
    ///
    /// Must never require new buyer-entered payment data. Fails with
    /// `MethodNotReusable` when the original method cannot be charged again.
    async fn create_follow_on_intent(
        &self,
        request: IntentRequest,
        method_ref: &str,
    ) -> Result<ProcessorIntent>;

    /// Verify webhook authenticity; `Unauthorized` on any failure
    fn verify_webhook(&self, signature: &str, payload: &[u8]) -> Result<()>;

    /// Normalize a webhook body into the shared event shape
    ///
    /// Returns `None` for event types this platform does not act on; those are
    /// acknowledged to the processor as no-ops.
    async fn parse_event(&self, payload: &str) -> Result<Option<ProcessorEvent>>;
}

/// Processor-agnostic intent creation request
#[derive(Debug, Clone)]
pub struct IntentRequest {
    /// Our payment id, passed through as the processor-side external reference
    pub reference: String,
    pub amount: Decimal,
    pub currency: Currency,
    pub description: String,
    pub buyer: BuyerIdentity,
}

/// Processor-specific artifact representing one attempt to collect funds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProcessorIntent {
    /// Card flow: the buyer confirms client-side against the processor; raw card
    /// data never touches this platform
    Card {
        processor_payment_id: String,
        client_secret: String,
        public_key: String,
    },
    /// Instant-transfer flow: the buyer pays out-of-band before the code expires
    InstantTransfer {
        processor_payment_id: String,
        payment_code: String,
        payment_code_image: String,
        copy_paste: String,
        expires_at: DateTime<Utc>,
    },
}

impl ProcessorIntent {
    pub fn processor_payment_id(&self) -> &str {
        match self {
            ProcessorIntent::Card {
                processor_payment_id,
                ..
            }
            | ProcessorIntent::InstantTransfer {
                processor_payment_id,
                ..
            } => processor_payment_id,
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        match self {
            ProcessorIntent::Card { .. } => None,
            ProcessorIntent::InstantTransfer { expires_at, .. } => Some(*expires_at),
        }
    }
}

/// Status carried by a normalized processor event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Succeeded,
    Failed,
    Refunded,
}

/// Shared webhook event shape all processors funnel into
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorEvent {
    pub processor_payment_id: String,
    pub new_status: EventStatus,
    /// Reusable payment-method token, when the processor reports one
    pub payment_method_ref: Option<String>,
    pub raw_payload: serde_json::Value,
}

use super::buyer::BuyerIdentity;
use crate::core::{AppError, Currency, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Payment status lifecycle
///
/// `pending -> completed | failed`, then `completed -> refunded`. Terminal states
/// never transition again; the repository's conditional update enforces this at the
/// storage layer as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR(20)", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    /// Whether a transition from `self` to `to` is a valid edge of the lifecycle
    pub fn can_transition(self, to: PaymentStatus) -> bool {
        matches!(
            (self, to),
            (PaymentStatus::Pending, PaymentStatus::Completed)
                | (PaymentStatus::Pending, PaymentStatus::Failed)
                | (PaymentStatus::Completed, PaymentStatus::Refunded)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PaymentStatus::Failed | PaymentStatus::Refunded)
    }
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Completed => write!(f, "completed"),
            PaymentStatus::Failed => write!(f, "failed"),
            PaymentStatus::Refunded => write!(f, "refunded"),
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            _ => Err(format!("Invalid payment status: {}", s)),
        }
    }
}

/// Transactional record of one attempt to collect money
///
/// Created `pending` by the checkout orchestrator; mutated only through validated
/// webhook events. The buyer snapshot and offer identity are frozen into the row at
/// purchase time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: String,

    pub product_id: String,

    pub offer_id: String,

    /// Processor chosen at checkout ("stripe", "mercadopago")
    pub processor_id: String,

    /// Processor-side artifact id (payment intent / pix charge), set once the
    /// intent exists
    pub processor_payment_id: Option<String>,

    pub amount: Decimal,

    #[sqlx(try_from = "String")]
    pub currency: Currency,

    pub status: PaymentStatus,

    /// Processor-specific payment-method token; never raw card or bank data
    pub payment_method_ref: Option<String>,

    /// Originating payment id when this row is a chain follow-on
    pub origin_payment_id: Option<String>,

    pub buyer_email: String,

    pub buyer_name: String,

    pub buyer_phone: Option<String>,

    pub buyer_tax_id: Option<String>,

    /// Free-form snapshot of product/offer identity and buyer contact
    pub metadata: Option<serde_json::Value>,

    /// Instant-transfer code expiry; absent for card intents
    pub expires_at: Option<DateTime<Utc>>,

    #[serde(skip_deserializing)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(skip_deserializing)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Payment {
    /// Create a new pending payment for an offer
    ///
    /// The payment currency is taken from the offer, never from caller input, so
    /// the currency-equality invariant holds by construction.
    pub fn new(
        product_id: String,
        offer_id: String,
        processor_id: String,
        amount: Decimal,
        currency: Currency,
        buyer: &BuyerIdentity,
    ) -> Result<Self> {
        currency.validate_amount(amount).map_err(AppError::Validation)?;

        if product_id.trim().is_empty() || offer_id.trim().is_empty() {
            return Err(AppError::validation("Product and offer ids are required"));
        }

        if processor_id.trim().is_empty() {
            return Err(AppError::validation("Processor id is required"));
        }

        let metadata = serde_json::json!({
            "product_id": product_id,
            "offer_id": offer_id,
            "buyer_email": buyer.email,
            "buyer_name": buyer.name,
        });

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            product_id,
            offer_id,
            processor_id,
            processor_payment_id: None,
            amount,
            currency,
            status: PaymentStatus::Pending,
            payment_method_ref: None,
            origin_payment_id: None,
            buyer_email: buyer.email.clone(),
            buyer_name: buyer.name.clone(),
            buyer_phone: buyer.phone.clone(),
            buyer_tax_id: buyer.tax_id.clone(),
            metadata: Some(metadata),
            expires_at: None,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        })
    }

    /// Create a follow-on payment that reuses the buyer snapshot of `origin`
    pub fn new_follow_on(
        origin: &Payment,
        offer_id: String,
        amount: Decimal,
        currency: Currency,
    ) -> Result<Self> {
        let buyer = origin.buyer_identity();
        let mut payment = Payment::new(
            origin.product_id.clone(),
            offer_id,
            origin.processor_id.clone(),
            amount,
            currency,
            &buyer,
        )?;
        payment.origin_payment_id = Some(origin.id.clone());
        Ok(payment)
    }

    /// Buyer snapshot captured on this payment
    pub fn buyer_identity(&self) -> BuyerIdentity {
        BuyerIdentity {
            email: self.buyer_email.clone(),
            name: self.buyer_name.clone(),
            phone: self.buyer_phone.clone(),
            tax_id: self.buyer_tax_id.clone(),
        }
    }

    /// Whether the instant-transfer code on this payment has lapsed
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expires) if now > expires)
    }

    pub fn is_completed(&self) -> bool {
        self.status == PaymentStatus::Completed
    }
}

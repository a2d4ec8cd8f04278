use crate::core::{AppError, Currency, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Billing type for an offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR(20)", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BillingType {
    OneTime,
    Recurring,
}

impl std::fmt::Display for BillingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BillingType::OneTime => write!(f, "one_time"),
            BillingType::Recurring => write!(f, "recurring"),
        }
    }
}

/// Recurring-cycle unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR(10)", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CycleUnit {
    Day,
    Week,
    Month,
    Year,
}

/// A priced, currency-and-language-specific variant of a Product
///
/// Referenced immutably by id at checkout; the latest committed price is re-read on
/// every resolution so a stale in-memory price can never be charged.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Offer {
    pub id: String,

    pub product_id: String,

    pub price: Decimal,

    #[sqlx(try_from = "String")]
    pub currency: Currency,

    /// Display language for the checkout page (BCP 47 tag)
    pub language: String,

    pub billing_type: BillingType,

    /// Cycle length for recurring offers (e.g. 1 with unit month)
    pub cycle_length: Option<u32>,

    pub cycle_unit: Option<CycleUnit>,

    /// Trial length in days for recurring offers
    pub trial_days: Option<u32>,

    pub active: bool,

    #[serde(skip_deserializing)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(skip_deserializing)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Offer {
    /// Validate pricing and billing consistency
    pub fn validate(&self) -> Result<()> {
        self.currency
            .validate_amount(self.price)
            .map_err(AppError::Validation)?;

        if self.billing_type == BillingType::Recurring
            && (self.cycle_length.is_none() || self.cycle_unit.is_none())
        {
            return Err(AppError::validation(
                "Recurring offers require a cycle length and unit",
            ));
        }

        if self.billing_type == BillingType::OneTime && self.cycle_length.is_some() {
            return Err(AppError::validation(
                "One-time offers must not carry a billing cycle",
            ));
        }

        Ok(())
    }
}

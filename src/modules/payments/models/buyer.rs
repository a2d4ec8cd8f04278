use crate::core::{AppError, Result};
use serde::{Deserialize, Serialize};

/// Buyer identity captured once per checkout
///
/// Copied into the Payment row at purchase time; not a standalone entity. Guest
/// checkout is allowed, so there is no account reference here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerIdentity {
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    /// National tax identifier (CPF/CNPJ), required by the instant-transfer
    /// processor only
    pub tax_id: Option<String>,
}

impl BuyerIdentity {
    /// Baseline completeness every processor requires
    pub fn validate_basic(&self) -> Result<()> {
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') || email.starts_with('@') {
            return Err(AppError::InvalidBuyerIdentity(
                "A valid email address is required".to_string(),
            ));
        }

        if self.name.trim().is_empty() {
            return Err(AppError::InvalidBuyerIdentity(
                "Buyer name is required".to_string(),
            ));
        }

        Ok(())
    }

    /// Tax id with formatting punctuation stripped, when present
    pub fn normalized_tax_id(&self) -> Option<String> {
        self.tax_id.as_ref().map(|t| {
            t.chars().filter(|c| c.is_ascii_digit()).collect::<String>()
        })
    }

    /// Validate the tax identifier required by the instant-transfer processor
    ///
    /// Accepts CPF (11 digits) or CNPJ (14 digits) after stripping punctuation.
    pub fn validate_tax_id(&self) -> Result<String> {
        let digits = self.normalized_tax_id().ok_or_else(|| {
            AppError::InvalidBuyerIdentity("A CPF or CNPJ is required for pix payments".to_string())
        })?;

        match digits.len() {
            11 | 14 => Ok(digits),
            _ => Err(AppError::InvalidBuyerIdentity(format!(
                "Tax id must have 11 (CPF) or 14 (CNPJ) digits, got {}",
                digits.len()
            ))),
        }
    }
}

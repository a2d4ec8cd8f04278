use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};

/// Application-wide Result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Main application error type
///
/// Processor adapters translate their own error vocabulary into these variants so
/// upstream components never branch on processor-specific error shapes.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// Validation errors for business rules
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database operation errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found (product, offer, processor, payment)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Currency not supported by the selected processor
    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    /// Buyer identity missing or malformed for the selected processor
    #[error("Invalid buyer identity: {0}")]
    InvalidBuyerIdentity(String),

    /// Processor declined the payment attempt
    ///
    /// `public_reason` is a vetted, buyer-safe message; raw processor payloads are
    /// never surfaced verbatim.
    #[error("Payment rejected by processor")]
    ProcessorRejected { public_reason: Option<String> },

    /// Original payment method cannot be reused for a follow-on charge
    #[error("Payment method not reusable: {0}")]
    MethodNotReusable(String),

    /// Payment code or authorization past its expiry
    #[error("Expired: {0}")]
    Expired(String),

    /// Webhook signature or authenticity failure
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// HTTP client errors
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        let error_message = self.buyer_message();

        HttpResponse::build(status_code).json(serde_json::json!({
            "error": {
                "message": error_message,
                "code": status_code.as_u16(),
            }
        }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::UnsupportedCurrency(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidBuyerIdentity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ProcessorRejected { .. } => StatusCode::PAYMENT_REQUIRED,
            AppError::MethodNotReusable(_) => StatusCode::CONFLICT,
            AppError::Expired(_) => StatusCode::GONE,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,
            AppError::Json(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        AppError::NotFound(resource.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        AppError::Unauthorized(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    pub fn rejected(public_reason: Option<String>) -> Self {
        AppError::ProcessorRejected { public_reason }
    }

    /// Buyer-facing message for this error
    ///
    /// Checkout-blocking errors collapse to a generic "offer unavailable" message;
    /// rejections show the processor's vetted reason when one exists.
    pub fn buyer_message(&self) -> String {
        match self {
            AppError::NotFound(_) | AppError::UnsupportedCurrency(_) => {
                "This offer is currently unavailable".to_string()
            }
            AppError::InvalidBuyerIdentity(msg) => msg.clone(),
            AppError::ProcessorRejected { public_reason } => public_reason
                .clone()
                .unwrap_or_else(|| "Payment could not be completed".to_string()),
            AppError::Expired(_) => "This payment has expired".to_string(),
            AppError::Validation(msg) => msg.clone(),
            AppError::Unauthorized(msg) => msg.clone(),
            _ => "An internal error occurred".to_string(),
        }
    }
}

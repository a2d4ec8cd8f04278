use super::processor_trait::{
    EventStatus, IntentRequest, ProcessorAdapter, ProcessorEvent, ProcessorIntent,
};
use super::signature::{constant_time_eq, hmac_sha256_hex, parse_signature_header};
use crate::config::StripeConfig;
use crate::core::{AppError, Currency, Result};
use crate::modules::payments::models::BuyerIdentity;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Deserialize;

/// Seconds a webhook signature timestamp may lag before it is rejected as replayed
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

const SUPPORTED_CURRENCIES: [Currency; 3] = [Currency::BRL, Currency::USD, Currency::EUR];

/// Stripe card-network processor client
///
/// Creates client-confirmed payment intents; the buyer authorizes in the browser
/// against Stripe directly, so raw card data never reaches this platform.
/// API reference: https://docs.stripe.com/api/payment_intents
pub struct StripeProcessor {
    client: ClientWithMiddleware,
    secret_key: String,
    public_key: String,
    webhook_secret: String,
    base_url: String,
}

impl StripeProcessor {
    pub fn new(config: &StripeConfig) -> Self {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);
        let client = ClientBuilder::new(Client::new())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Self {
            client,
            secret_key: config.secret_key.clone(),
            public_key: config.public_key.clone(),
            webhook_secret: config.webhook_secret.clone(),
            base_url: config.base_url.clone(),
        }
    }

    async fn post_intent(&self, params: Vec<(&str, String)>) -> Result<StripeIntent> {
        let url = format!("{}/v1/payment_intents", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&params)
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_api_error(&body, false));
        }

        response
            .json::<StripeIntent>()
            .await
            .map_err(AppError::HttpClient)
    }
}

#[async_trait]
impl ProcessorAdapter for StripeProcessor {
    fn name(&self) -> &str {
        "stripe"
    }

    fn supported_currencies(&self) -> &[Currency] {
        &SUPPORTED_CURRENCIES
    }

    fn validate_buyer(&self, buyer: &BuyerIdentity) -> Result<()> {
        buyer.validate_basic()
    }

    async fn create_intent(&self, request: IntentRequest) -> Result<ProcessorIntent> {
        let minor_units = request
            .currency
            .to_minor_units(request.amount)
            .map_err(AppError::Validation)?;

        let params = vec![
            ("amount", minor_units.to_string()),
            ("currency", request.currency.code_lower()),
            ("description", request.description.clone()),
            ("receipt_email", request.buyer.email.clone()),
            ("metadata[reference]", request.reference.clone()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
        ];

        let intent = self.post_intent(params).await?;

        let client_secret = intent.client_secret.ok_or_else(|| {
            AppError::internal("Stripe returned a payment intent without a client secret")
        })?;

        Ok(ProcessorIntent::Card {
            processor_payment_id: intent.id,
            client_secret,
            public_key: self.public_key.clone(),
        })
    }

    async fn create_follow_on_intent(
        &self,
        request: IntentRequest,
        method_ref: &str,
    ) -> Result<ProcessorIntent> {
        let minor_units = request
            .currency
            .to_minor_units(request.amount)
            .map_err(AppError::Validation)?;

        // Off-session charge against the stored method token; confirmed
        // server-side so the buyer is never re-prompted.
        let params = vec![
            ("amount", minor_units.to_string()),
            ("currency", request.currency.code_lower()),
            ("description", request.description.clone()),
            ("payment_method", method_ref.to_string()),
            ("off_session", "true".to_string()),
            ("confirm", "true".to_string()),
            ("metadata[reference]", request.reference.clone()),
        ];

        let url = format!("{}/v1/payment_intents", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&params)
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_api_error(&body, true));
        }

        let intent = response
            .json::<StripeIntent>()
            .await
            .map_err(AppError::HttpClient)?;

        let client_secret = intent.client_secret.ok_or_else(|| {
            AppError::internal("Stripe returned a payment intent without a client secret")
        })?;

        Ok(ProcessorIntent::Card {
            processor_payment_id: intent.id,
            client_secret,
            public_key: self.public_key.clone(),
        })
    }

    fn verify_webhook(&self, signature: &str, payload: &[u8]) -> Result<()> {
        // Stripe-Signature: t=<unix>,v1=<hmac-sha256 of "<t>.<body>">
        let (timestamp, digest) = parse_signature_header(signature, "t", "v1")
            .ok_or_else(|| AppError::unauthorized("Malformed Stripe-Signature header"))?;

        let age = Utc::now().timestamp() - timestamp;
        if age.abs() > SIGNATURE_TOLERANCE_SECS {
            return Err(AppError::unauthorized(
                "Stripe webhook signature timestamp outside tolerance",
            ));
        }

        let mut signed_payload = timestamp.to_string().into_bytes();
        signed_payload.push(b'.');
        signed_payload.extend_from_slice(payload);

        let expected = hmac_sha256_hex(&self.webhook_secret, &signed_payload);
        if !constant_time_eq(&expected, &digest) {
            return Err(AppError::unauthorized("Invalid Stripe webhook signature"));
        }

        Ok(())
    }

    async fn parse_event(&self, payload: &str) -> Result<Option<ProcessorEvent>> {
        let event: serde_json::Value = serde_json::from_str(payload)?;
        let event_type = event["type"].as_str().unwrap_or_default().to_string();
        let object = &event["data"]["object"];

        let (intent_id, new_status) = match event_type.as_str() {
            "payment_intent.succeeded" => (object["id"].as_str(), EventStatus::Succeeded),
            "payment_intent.payment_failed" => (object["id"].as_str(), EventStatus::Failed),
            // Refund events reference the charge; the intent id rides along
            "charge.refunded" => (object["payment_intent"].as_str(), EventStatus::Refunded),
            _ => return Ok(None),
        };

        let processor_payment_id = intent_id
            .map(str::to_string)
            .ok_or_else(|| AppError::validation("Stripe event payload missing intent id"))?;

        let payment_method_ref = object["payment_method"].as_str().map(str::to_string);

        Ok(Some(ProcessorEvent {
            processor_payment_id,
            new_status,
            payment_method_ref,
            raw_payload: event,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct StripeIntent {
    id: String,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeApiError,
}

#[derive(Debug, Deserialize, Default)]
struct StripeApiError {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    decline_code: Option<String>,
}

fn map_transport_error(e: reqwest_middleware::Error) -> AppError {
    match e {
        reqwest_middleware::Error::Reqwest(e) => AppError::HttpClient(e),
        reqwest_middleware::Error::Middleware(e) => {
            AppError::internal(format!("Stripe request middleware failure: {}", e))
        }
    }
}

/// Map a Stripe error body into the shared taxonomy
///
/// `follow_on` charges additionally map reuse failures (expired or missing method,
/// re-authentication required) to `MethodNotReusable`.
fn map_api_error(body: &str, follow_on: bool) -> AppError {
    let parsed: StripeApiError = serde_json::from_str::<StripeErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_default();

    let code = parsed
        .code
        .as_deref()
        .or(parsed.decline_code.as_deref())
        .unwrap_or_default();

    if follow_on
        && matches!(
            code,
            "authentication_required" | "expired_card" | "resource_missing"
        )
    {
        return AppError::MethodNotReusable(format!("Stripe rejected stored method: {}", code));
    }

    match parsed.kind.as_str() {
        "card_error" => AppError::rejected(safe_decline_message(code)),
        "invalid_request_error" => {
            AppError::internal(format!("Stripe rejected the request: {}", code))
        }
        _ => AppError::internal(format!("Stripe API error: {}", parsed.kind)),
    }
}

/// Buyer-safe messages for a known subset of decline codes; anything else falls
/// back to the generic rejection message
fn safe_decline_message(code: &str) -> Option<String> {
    let message = match code {
        "insufficient_funds" => "Card has insufficient funds",
        "expired_card" => "Card has expired",
        "incorrect_cvc" => "Card security code is incorrect",
        "incorrect_number" => "Card number is incorrect",
        _ => return None,
    };
    Some(message.to_string())
}

use super::processor_trait::{
    EventStatus, IntentRequest, ProcessorAdapter, ProcessorEvent, ProcessorIntent,
};
use super::signature::{constant_time_eq, hmac_sha256_hex, parse_signature_header};
use crate::config::MercadoPagoConfig;
use crate::core::{AppError, Currency, Result};
use crate::modules::payments::models::BuyerIdentity;
use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use reqwest::{Client, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use serde_json::json;

const SIGNATURE_TOLERANCE_SECS: i64 = 300;

const SUPPORTED_CURRENCIES: [Currency; 1] = [Currency::BRL];

/// Mercado Pago pix instant-transfer processor client
///
/// Generates a scannable/copyable pix code with an explicit expiry; the buyer pays
/// out-of-band and confirmation arrives only through webhooks.
/// API reference: https://www.mercadopago.com.br/developers/en/reference/payments
pub struct PixProcessor {
    client: ClientWithMiddleware,
    access_token: String,
    webhook_secret: String,
    base_url: String,
    code_expiry: Duration,
}

impl PixProcessor {
    pub fn new(config: &MercadoPagoConfig) -> Self {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);
        let client = ClientBuilder::new(Client::new())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Self {
            client,
            access_token: config.access_token.clone(),
            webhook_secret: config.webhook_secret.clone(),
            base_url: config.base_url.clone(),
            code_expiry: Duration::minutes(config.code_expiry_minutes),
        }
    }

    async fn create_charge(
        &self,
        request: &IntentRequest,
        payer: serde_json::Value,
    ) -> Result<ProcessorIntent> {
        let amount = request.amount.to_f64().ok_or_else(|| {
            AppError::validation(format!("Amount {} not representable", request.amount))
        })?;
        let expires_at = Utc::now() + self.code_expiry;

        let body = json!({
            "transaction_amount": amount,
            "description": request.description,
            "payment_method_id": "pix",
            "external_reference": request.reference,
            "date_of_expiration": expires_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            "payer": payer,
        });

        let url = format!("{}/v1/payments", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .header("X-Idempotency-Key", &request.reference)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_charge_error(status));
        }

        let charge: PixCharge = response.json().await.map_err(AppError::HttpClient)?;

        let transaction_data = charge
            .point_of_interaction
            .and_then(|poi| poi.transaction_data)
            .ok_or_else(|| {
                AppError::internal("Mercado Pago returned a pix charge without transaction data")
            })?;

        let payment_code = transaction_data.qr_code.ok_or_else(|| {
            AppError::internal("Mercado Pago returned a pix charge without a payment code")
        })?;

        let expires_at = charge
            .date_of_expiration
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(expires_at);

        Ok(ProcessorIntent::InstantTransfer {
            processor_payment_id: charge.id.to_string(),
            copy_paste: payment_code.clone(),
            payment_code,
            payment_code_image: transaction_data.qr_code_base64.unwrap_or_default(),
            expires_at,
        })
    }

    async fn fetch_charge(&self, charge_id: &str) -> Result<Option<PixCharge>> {
        let url = format!("{}/v1/payments/{}", self.base_url, charge_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(map_transport_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(AppError::internal(format!(
                "Mercado Pago payment lookup failed with status {}",
                response.status()
            )));
        }

        let charge = response.json::<PixCharge>().await.map_err(AppError::HttpClient)?;
        Ok(Some(charge))
    }
}

#[async_trait]
impl ProcessorAdapter for PixProcessor {
    fn name(&self) -> &str {
        "mercadopago"
    }

    fn supported_currencies(&self) -> &[Currency] {
        &SUPPORTED_CURRENCIES
    }

    fn validate_buyer(&self, buyer: &BuyerIdentity) -> Result<()> {
        buyer.validate_basic()?;
        buyer.validate_tax_id()?;
        Ok(())
    }

    async fn create_intent(&self, request: IntentRequest) -> Result<ProcessorIntent> {
        let tax_id = request.buyer.validate_tax_id()?;
        let payer = payer_block(&request.buyer, &tax_id);
        self.create_charge(&request, payer).await
    }

    async fn create_follow_on_intent(
        &self,
        request: IntentRequest,
        method_ref: &str,
    ) -> Result<ProcessorIntent> {
        // Pix has no off-session charge primitive; reuse the payer identity of the
        // original charge to issue a fresh code without re-collecting buyer data.
        let original = self.fetch_charge(method_ref).await?.ok_or_else(|| {
            AppError::MethodNotReusable(format!("Original pix charge '{}' not found", method_ref))
        })?;

        if original.status.as_deref() != Some("approved") {
            return Err(AppError::MethodNotReusable(format!(
                "Original pix charge '{}' was never approved",
                method_ref
            )));
        }

        let payer = original.payer.map(|p| p.into_block()).ok_or_else(|| {
            AppError::MethodNotReusable(format!(
                "Original pix charge '{}' carries no payer identity",
                method_ref
            ))
        })?;

        self.create_charge(&request, payer).await
    }

    fn verify_webhook(&self, signature: &str, payload: &[u8]) -> Result<()> {
        // x-signature: ts=<unix>,v1=<hmac-sha256 of "id:<data.id>;ts:<ts>;">
        let (timestamp, digest) = parse_signature_header(signature, "ts", "v1")
            .ok_or_else(|| AppError::unauthorized("Malformed x-signature header"))?;

        let age = Utc::now().timestamp() - timestamp;
        if age.abs() > SIGNATURE_TOLERANCE_SECS {
            return Err(AppError::unauthorized(
                "Mercado Pago webhook signature timestamp outside tolerance",
            ));
        }

        let body: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|_| AppError::unauthorized("Unparseable Mercado Pago webhook body"))?;
        let data_id = extract_data_id(&body)
            .ok_or_else(|| AppError::unauthorized("Mercado Pago webhook body missing data id"))?;

        let manifest = format!("id:{};ts:{};", data_id, timestamp);
        let expected = hmac_sha256_hex(&self.webhook_secret, manifest.as_bytes());
        if !constant_time_eq(&expected, &digest) {
            return Err(AppError::unauthorized(
                "Invalid Mercado Pago webhook signature",
            ));
        }

        Ok(())
    }

    async fn parse_event(&self, payload: &str) -> Result<Option<ProcessorEvent>> {
        let body: serde_json::Value = serde_json::from_str(payload)?;

        let action = body["action"].as_str().unwrap_or_default();
        if !action.starts_with("payment.") {
            return Ok(None);
        }

        let charge_id = extract_data_id(&body)
            .ok_or_else(|| AppError::validation("Mercado Pago event missing data id"))?;

        // The delivery carries only the charge id; fetch the resource for status
        let charge = self.fetch_charge(&charge_id).await?.ok_or_else(|| {
            AppError::validation(format!("Mercado Pago charge '{}' not found", charge_id))
        })?;

        let new_status = match charge.status.as_deref().unwrap_or_default() {
            "approved" => EventStatus::Succeeded,
            "rejected" | "cancelled" => EventStatus::Failed,
            "refunded" | "charged_back" => EventStatus::Refunded,
            // pending / in_process carry no transition
            _ => return Ok(None),
        };

        Ok(Some(ProcessorEvent {
            processor_payment_id: charge_id.clone(),
            new_status,
            // The charge id itself is the reuse handle for pix follow-ons
            payment_method_ref: Some(charge_id),
            raw_payload: body,
        }))
    }
}

fn payer_block(buyer: &BuyerIdentity, tax_id: &str) -> serde_json::Value {
    let mut parts = buyer.name.split_whitespace();
    let first_name = parts.next().unwrap_or_default().to_string();
    let last_name = parts.collect::<Vec<_>>().join(" ");

    json!({
        "email": buyer.email,
        "first_name": first_name,
        "last_name": last_name,
        "identification": {
            "type": identification_type(tax_id),
            "number": tax_id,
        }
    })
}

fn identification_type(tax_id: &str) -> &'static str {
    if tax_id.len() == 14 {
        "CNPJ"
    } else {
        "CPF"
    }
}

fn extract_data_id(body: &serde_json::Value) -> Option<String> {
    let id = &body["data"]["id"];
    id.as_str()
        .map(str::to_string)
        .or_else(|| id.as_i64().map(|n| n.to_string()))
}

fn map_transport_error(e: reqwest_middleware::Error) -> AppError {
    match e {
        reqwest_middleware::Error::Reqwest(e) => AppError::HttpClient(e),
        reqwest_middleware::Error::Middleware(e) => {
            AppError::internal(format!("Mercado Pago request middleware failure: {}", e))
        }
    }
}

fn map_charge_error(status: StatusCode) -> AppError {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            // Generation refused; the raw body is never surfaced to the buyer
            AppError::rejected(None)
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            AppError::internal("Mercado Pago credentials rejected".to_string())
        }
        other => AppError::internal(format!("Mercado Pago API error: {}", other)),
    }
}

#[derive(Debug, Deserialize)]
struct PixCharge {
    id: serde_json::Number,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    date_of_expiration: Option<String>,
    #[serde(default)]
    point_of_interaction: Option<PointOfInteraction>,
    #[serde(default)]
    payer: Option<PixPayer>,
}

#[derive(Debug, Deserialize)]
struct PointOfInteraction {
    #[serde(default)]
    transaction_data: Option<TransactionData>,
}

#[derive(Debug, Deserialize)]
struct TransactionData {
    #[serde(default)]
    qr_code: Option<String>,
    #[serde(default)]
    qr_code_base64: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PixPayer {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    identification: Option<serde_json::Value>,
}

impl PixPayer {
    fn into_block(self) -> serde_json::Value {
        json!({
            "email": self.email,
            "first_name": self.first_name,
            "last_name": self.last_name,
            "identification": self.identification,
        })
    }
}

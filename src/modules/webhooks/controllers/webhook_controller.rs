use super::super::services::{WebhookOutcome, WebhookService};
use crate::core::{AppError, Result};
use crate::modules::processors::services::ProcessorRegistry;
use actix_web::{post, web, HttpRequest, HttpResponse};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Inbound processor webhook endpoints
///
/// One route per processor, each with its own signature scheme; all deliveries
/// funnel into the shared `handle_event` contract after normalization.
pub struct WebhookController {
    processors: Arc<ProcessorRegistry>,
    service: Arc<WebhookService>,
}

impl WebhookController {
    pub fn new(processors: Arc<ProcessorRegistry>, service: Arc<WebhookService>) -> Self {
        Self {
            processors,
            service,
        }
    }

    pub fn configure(
        cfg: &mut web::ServiceConfig,
        processors: Arc<ProcessorRegistry>,
        service: Arc<WebhookService>,
    ) {
        let controller = web::Data::new(Self::new(processors, service));

        cfg.service(
            web::scope("/webhooks")
                .app_data(controller)
                .service(receive_webhook),
        );
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WebhookResponse {
    Applied { payment_id: String },
    Duplicate { payment_id: String },
    Ignored,
    Conflict { payment_id: String },
    Expired { payment_id: String },
}

/// Receive a processor webhook delivery
///
/// `POST /webhooks/{processor}`. The body is kept as raw bytes because both
/// signature schemes MAC the exact payload. Authenticity failures return 4xx so a
/// poisoned payload is not redelivered forever; storage failures return 5xx so the
/// processor retries.
#[post("/{processor}")]
async fn receive_webhook(
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Bytes,
    controller: web::Data<WebhookController>,
) -> Result<HttpResponse> {
    let processor_id = path.into_inner();
    let processor = controller.processors.get(&processor_id)?;

    let signature = extract_signature(&req, &processor_id)?;
    processor.verify_webhook(&signature, &body)?;

    let payload = std::str::from_utf8(&body)
        .map_err(|_| AppError::validation("Webhook body is not valid UTF-8"))?;

    let event = match processor.parse_event(payload).await? {
        Some(event) => event,
        None => {
            info!(processor = %processor_id, "Webhook event type not actionable, acknowledging");
            return Ok(HttpResponse::Ok().json(WebhookResponse::Ignored));
        }
    };

    let outcome = controller.service.handle_event(&processor_id, event).await?;

    let response = match outcome {
        WebhookOutcome::Applied { payment_id, .. } => WebhookResponse::Applied { payment_id },
        WebhookOutcome::Duplicate { payment_id } => WebhookResponse::Duplicate { payment_id },
        WebhookOutcome::UnknownPayment { .. } => WebhookResponse::Ignored,
        WebhookOutcome::InvalidTransition { payment_id, .. } => {
            WebhookResponse::Conflict { payment_id }
        }
        WebhookOutcome::ExpiredCode { payment_id } => WebhookResponse::Expired { payment_id },
    };

    Ok(HttpResponse::Ok().json(response))
}

/// Extract the signature header for the given processor
fn extract_signature(req: &HttpRequest, processor_id: &str) -> Result<String> {
    let header_name = match processor_id {
        "stripe" => "Stripe-Signature",
        "mercadopago" => "x-signature",
        other => {
            return Err(AppError::validation(format!(
                "Unsupported webhook processor: {}",
                other
            )))
        }
    };

    req.headers()
        .get(header_name)
        .and_then(|h| h.to_str().ok())
        .map(String::from)
        .ok_or_else(|| {
            AppError::unauthorized(format!(
                "Missing {} header for {} webhook",
                header_name, processor_id
            ))
        })
}

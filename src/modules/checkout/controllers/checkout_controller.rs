use super::super::services::CheckoutService;
use crate::core::Result;
use crate::modules::payments::models::BuyerIdentity;
use actix_web::{post, web, HttpResponse};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// Checkout entry point
///
/// `POST /checkout/{product_id}/{offer_id}`, the stable URL shape buyers land on
/// from seller pages.
pub struct CheckoutController {
    service: Arc<CheckoutService>,
}

impl CheckoutController {
    pub fn new(service: Arc<CheckoutService>) -> Self {
        Self { service }
    }

    pub fn configure(cfg: &mut web::ServiceConfig, service: Arc<CheckoutService>) {
        let controller = web::Data::new(Self::new(service));

        cfg.service(
            web::scope("/checkout")
                .app_data(controller)
                .service(start_checkout),
        );
    }
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub tax_id: Option<String>,
}

impl From<CheckoutRequest> for BuyerIdentity {
    fn from(req: CheckoutRequest) -> Self {
        BuyerIdentity {
            email: req.email,
            name: req.name,
            phone: req.phone,
            tax_id: req.tax_id,
        }
    }
}

/// Start a checkout and return the pending payment plus intent data
///
/// The response carries everything the buyer-side page needs: a client secret for
/// card confirmation, or the pix code/image and its expiry.
#[post("/{product_id}/{offer_id}")]
async fn start_checkout(
    path: web::Path<(String, String)>,
    body: web::Json<CheckoutRequest>,
    controller: web::Data<CheckoutController>,
) -> Result<HttpResponse> {
    let (product_id, offer_id) = path.into_inner();

    info!(
        product_id = %product_id,
        offer_id = %offer_id,
        "Checkout requested"
    );

    let session = controller
        .service
        .start_checkout(&product_id, &offer_id, body.into_inner().into())
        .await?;

    Ok(HttpResponse::Created().json(session))
}

use super::super::models::ChainNodeKind;
use super::super::services::ChainService;
use crate::core::Result;
use actix_web::{get, post, web, HttpResponse};
use serde::Deserialize;
use std::sync::Arc;

/// Buyer-facing chain-step endpoints
///
/// URL shape is a stable external contract:
/// `/upsell/{offer_id}?pi={payment}` and `/downsell/{offer_id}?pi={payment}`.
/// The `pi` parameter locates the original payment whose method is reused.
pub struct ChainController {
    service: Arc<ChainService>,
}

impl ChainController {
    pub fn new(service: Arc<ChainService>) -> Self {
        Self { service }
    }

    pub fn configure(cfg: &mut web::ServiceConfig, service: Arc<ChainService>) {
        let controller = web::Data::new(Self::new(service));

        cfg.app_data(controller)
            .service(present_upsell)
            .service(accept_upsell)
            .service(decline_upsell)
            .service(present_downsell)
            .service(accept_downsell)
            .service(decline_downsell);
    }
}

#[derive(Debug, Deserialize)]
pub struct ChainQuery {
    /// Original payment reference
    pub pi: String,
}

#[get("/upsell/{offer_id}")]
async fn present_upsell(
    path: web::Path<String>,
    query: web::Query<ChainQuery>,
    controller: web::Data<ChainController>,
) -> Result<HttpResponse> {
    let step = controller
        .service
        .present(ChainNodeKind::Upsell, &path.into_inner(), &query.pi)
        .await?;
    Ok(HttpResponse::Ok().json(step))
}

#[post("/upsell/{offer_id}/accept")]
async fn accept_upsell(
    path: web::Path<String>,
    query: web::Query<ChainQuery>,
    controller: web::Data<ChainController>,
) -> Result<HttpResponse> {
    let outcome = controller
        .service
        .accept(ChainNodeKind::Upsell, &path.into_inner(), &query.pi)
        .await?;
    Ok(HttpResponse::Ok().json(outcome))
}

#[post("/upsell/{offer_id}/decline")]
async fn decline_upsell(
    path: web::Path<String>,
    query: web::Query<ChainQuery>,
    controller: web::Data<ChainController>,
) -> Result<HttpResponse> {
    let step = controller
        .service
        .decline(ChainNodeKind::Upsell, &path.into_inner(), &query.pi)
        .await?;
    Ok(HttpResponse::Ok().json(step))
}

#[get("/downsell/{offer_id}")]
async fn present_downsell(
    path: web::Path<String>,
    query: web::Query<ChainQuery>,
    controller: web::Data<ChainController>,
) -> Result<HttpResponse> {
    let step = controller
        .service
        .present(ChainNodeKind::Downsell, &path.into_inner(), &query.pi)
        .await?;
    Ok(HttpResponse::Ok().json(step))
}

#[post("/downsell/{offer_id}/accept")]
async fn accept_downsell(
    path: web::Path<String>,
    query: web::Query<ChainQuery>,
    controller: web::Data<ChainController>,
) -> Result<HttpResponse> {
    let outcome = controller
        .service
        .accept(ChainNodeKind::Downsell, &path.into_inner(), &query.pi)
        .await?;
    Ok(HttpResponse::Ok().json(outcome))
}

#[post("/downsell/{offer_id}/decline")]
async fn decline_downsell(
    path: web::Path<String>,
    query: web::Query<ChainQuery>,
    controller: web::Data<ChainController>,
) -> Result<HttpResponse> {
    let step = controller
        .service
        .decline(ChainNodeKind::Downsell, &path.into_inner(), &query.pi)
        .await?;
    Ok(HttpResponse::Ok().json(step))
}

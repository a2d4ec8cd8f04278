use actix_web::{web, App, HttpResponse, HttpServer};
use funnelpay::config::Config;
use funnelpay::modules::catalog::repositories::SqlCatalogRepository;
use funnelpay::modules::catalog::services::CatalogService;
use funnelpay::modules::chain::controllers::ChainController;
use funnelpay::modules::chain::repositories::SqlChainRepository;
use funnelpay::modules::chain::services::ChainService;
use funnelpay::modules::checkout::controllers::CheckoutController;
use funnelpay::modules::checkout::services::CheckoutService;
use funnelpay::modules::fulfillment::services::{LogAccessGranter, LogNotifier};
use funnelpay::modules::payments::repositories::SqlPaymentRepository;
use funnelpay::modules::processors::services::{PixProcessor, ProcessorRegistry, StripeProcessor};
use funnelpay::modules::webhooks::controllers::WebhookController;
use funnelpay::modules::webhooks::services::WebhookService;
use std::sync::Arc;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "funnelpay=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().expect("Failed to load configuration");
    config.validate().expect("Configuration validation failed");

    tracing::info!("Starting FunnelPay Checkout Platform");
    tracing::info!("Environment: {}", config.app.env);
    tracing::info!("Server binding to: {}", config.server.bind_address());

    // Create database connection pool
    let db_pool = config
        .database
        .create_pool()
        .await
        .expect("Failed to create database pool");

    tracing::info!(
        "Database pool initialized ({} connections)",
        config.database.pool_size
    );

    // Processor adapters are constructed once and injected everywhere
    let mut registry = ProcessorRegistry::new();
    registry.register(Arc::new(StripeProcessor::new(&config.stripe)));
    registry.register(Arc::new(PixProcessor::new(&config.mercadopago)));
    let processors = Arc::new(registry);

    tracing::info!(processors = ?processors.names(), "Processor registry initialized");

    let catalog = Arc::new(CatalogService::new(Arc::new(SqlCatalogRepository::new(
        db_pool.clone(),
    ))));
    let payments = Arc::new(SqlPaymentRepository::new(db_pool.clone()));
    let chain_repo = Arc::new(SqlChainRepository::new(db_pool.clone()));

    let checkout_service = Arc::new(CheckoutService::new(
        catalog.clone(),
        payments.clone(),
        processors.clone(),
    ));
    let webhook_service = Arc::new(WebhookService::new(
        payments.clone(),
        Arc::new(LogAccessGranter),
        Arc::new(LogNotifier),
    ));
    let chain_service = Arc::new(ChainService::new(
        chain_repo,
        catalog.clone(),
        payments.clone(),
        processors.clone(),
    ));

    // Start HTTP server
    let bind_address = config.server.bind_address();
    let workers = config.server.workers;
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(actix_cors::Cors::permissive())
            .configure(|cfg| {
                CheckoutController::configure(cfg, checkout_service.clone());
                WebhookController::configure(cfg, processors.clone(), webhook_service.clone());
                ChainController::configure(cfg, chain_service.clone());
            })
            .route("/health", web::get().to(health_check))
    })
    .workers(workers)
    .bind(&bind_address)?
    .run();

    tracing::info!("Server started at http://{}", bind_address);

    server.await
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "funnelpay"
    }))
}

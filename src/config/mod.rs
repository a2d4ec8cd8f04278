use crate::core::{AppError, Result};
use serde::Deserialize;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::env;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub stripe: StripeConfig,
    pub mercadopago: MercadoPagoConfig,
    pub checkout: CheckoutConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub log_level: String,
}

/// Card-network processor credentials
#[derive(Debug, Clone, Deserialize)]
pub struct StripeConfig {
    pub secret_key: String,
    pub public_key: String,
    pub webhook_secret: String,
    pub base_url: String,
}

/// Instant-transfer processor credentials
#[derive(Debug, Clone, Deserialize)]
pub struct MercadoPagoConfig {
    pub access_token: String,
    pub webhook_secret: String,
    pub base_url: String,
    /// Minutes before a generated pix code expires
    pub code_expiry_minutes: i64,
}

/// Buyer-facing URL configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutConfig {
    /// Host serving the checkout pages, e.g. `https://pay.example.com`
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = Config {
            app: AppConfig {
                env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            },
            database: DatabaseConfig::from_env()?,
            server: ServerConfig::from_env()?,
            stripe: StripeConfig {
                secret_key: env::var("STRIPE_SECRET_KEY")
                    .map_err(|_| AppError::Configuration("STRIPE_SECRET_KEY not set".to_string()))?,
                public_key: env::var("STRIPE_PUBLIC_KEY")
                    .map_err(|_| AppError::Configuration("STRIPE_PUBLIC_KEY not set".to_string()))?,
                webhook_secret: env::var("STRIPE_WEBHOOK_SECRET").map_err(|_| {
                    AppError::Configuration("STRIPE_WEBHOOK_SECRET not set".to_string())
                })?,
                base_url: env::var("STRIPE_BASE_URL")
                    .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
            },
            mercadopago: MercadoPagoConfig {
                access_token: env::var("MERCADOPAGO_ACCESS_TOKEN").map_err(|_| {
                    AppError::Configuration("MERCADOPAGO_ACCESS_TOKEN not set".to_string())
                })?,
                webhook_secret: env::var("MERCADOPAGO_WEBHOOK_SECRET").map_err(|_| {
                    AppError::Configuration("MERCADOPAGO_WEBHOOK_SECRET not set".to_string())
                })?,
                base_url: env::var("MERCADOPAGO_BASE_URL")
                    .unwrap_or_else(|_| "https://api.mercadopago.com".to_string()),
                code_expiry_minutes: env::var("PIX_CODE_EXPIRY_MINUTES")
                    .unwrap_or_else(|_| "15".to_string())
                    .parse()
                    .map_err(|_| {
                        AppError::Configuration("Invalid PIX_CODE_EXPIRY_MINUTES".to_string())
                    })?,
            },
            checkout: CheckoutConfig {
                base_url: env::var("CHECKOUT_BASE_URL")
                    .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            },
        };

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.mercadopago.code_expiry_minutes <= 0 {
            return Err(AppError::Configuration(
                "Pix code expiry must be greater than 0 minutes".to_string(),
            ));
        }

        if self.checkout.base_url.is_empty() {
            return Err(AppError::Configuration(
                "Checkout base URL must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self> {
        Ok(DatabaseConfig {
            url: env::var("DATABASE_URL")
                .map_err(|_| AppError::Configuration("DATABASE_URL not set".to_string()))?,
            pool_size: env::var("DATABASE_POOL_SIZE")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| AppError::Configuration("Invalid DATABASE_POOL_SIZE".to_string()))?,
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| {
                    AppError::Configuration("Invalid DATABASE_MAX_CONNECTIONS".to_string())
                })?,
        })
    }

    /// Create a MySQL connection pool
    pub async fn create_pool(&self) -> Result<MySqlPool> {
        MySqlPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.pool_size)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .test_before_acquire(true)
            .connect(&self.url)
            .await
            .map_err(AppError::Database)
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Ok(ServerConfig {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| AppError::Configuration("Invalid SERVER_PORT".to_string()))?,
            workers: num_cpus::get() * 2,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

//! Per-processor buyer-identity requirements: card checkout needs only contact
//! data, the pix flow additionally requires a valid CPF/CNPJ.

use funnelpay::config::{MercadoPagoConfig, StripeConfig};
use funnelpay::core::{AppError, Currency};
use funnelpay::modules::payments::models::BuyerIdentity;
use funnelpay::modules::processors::services::{PixProcessor, ProcessorAdapter, StripeProcessor};

fn stripe() -> StripeProcessor {
    StripeProcessor::new(&StripeConfig {
        secret_key: "sk_test".to_string(),
        public_key: "pk_test".to_string(),
        webhook_secret: "whsec_test".to_string(),
        base_url: "https://api.stripe.com".to_string(),
    })
}

fn pix() -> PixProcessor {
    PixProcessor::new(&MercadoPagoConfig {
        access_token: "APP_USR-test".to_string(),
        webhook_secret: "mp_secret".to_string(),
        base_url: "https://api.mercadopago.com".to_string(),
        code_expiry_minutes: 15,
    })
}

fn buyer(tax_id: Option<&str>) -> BuyerIdentity {
    BuyerIdentity {
        email: "ana@example.com".to_string(),
        name: "Ana Souza".to_string(),
        phone: None,
        tax_id: tax_id.map(str::to_string),
    }
}

#[test]
fn card_checkout_does_not_require_tax_id() {
    assert!(stripe().validate_buyer(&buyer(None)).is_ok());
}

#[test]
fn pix_checkout_requires_tax_id() {
    let result = pix().validate_buyer(&buyer(None));
    assert!(matches!(result, Err(AppError::InvalidBuyerIdentity(_))));

    assert!(pix().validate_buyer(&buyer(Some("529.982.247-25"))).is_ok());
    assert!(pix()
        .validate_buyer(&buyer(Some("11.222.333/0001-81")))
        .is_ok());
}

#[test]
fn pix_rejects_malformed_tax_id() {
    let result = pix().validate_buyer(&buyer(Some("12345")));
    assert!(matches!(result, Err(AppError::InvalidBuyerIdentity(_))));
}

#[test]
fn both_processors_reject_incomplete_contact_data() {
    let mut incomplete = buyer(Some("52998224725"));
    incomplete.email = "not-an-email".to_string();

    assert!(stripe().validate_buyer(&incomplete).is_err());
    assert!(pix().validate_buyer(&incomplete).is_err());
}

#[test]
fn supported_currency_sets_differ() {
    let stripe = stripe();
    let pix = pix();

    assert!(stripe.supports_currency(Currency::USD));
    assert!(stripe.supports_currency(Currency::EUR));
    assert!(stripe.supports_currency(Currency::BRL));

    assert!(pix.supports_currency(Currency::BRL));
    assert!(!pix.supports_currency(Currency::USD));
    assert!(!pix.supports_currency(Currency::EUR));
}

pub mod checkout_service;

pub use checkout_service::{CheckoutService, CheckoutSession};

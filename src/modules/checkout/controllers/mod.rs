pub mod checkout_controller;

pub use checkout_controller::CheckoutController;

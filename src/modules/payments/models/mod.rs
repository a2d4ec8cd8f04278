pub mod buyer;
pub mod payment;

pub use buyer::BuyerIdentity;
pub use payment::{Payment, PaymentStatus};
